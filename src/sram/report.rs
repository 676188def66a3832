use std::fmt;

use crate::hex::HexWord;

use super::window::{
	AddressWindow,
	ROW_LEN,
};

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ChecksumStatus {
	Verified,
	/// read back fine, but the data doesn't produce the expected checksum
	Mismatch { data: HexWord, actual: HexWord },
	ReadFailed(String),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ChecksumEntry {
	pub address: HexWord,
	pub expected: HexWord,
	pub status: ChecksumStatus,
}

impl ChecksumEntry {
	pub fn is_verified(&self) -> bool {
		self.status == ChecksumStatus::Verified
	}
}

impl fmt::Display for ChecksumEntry {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match &self.status {
			ChecksumStatus::Verified => {
				write!(f, "Checksum verified for address: {}", self.address)
			},
			ChecksumStatus::Mismatch { data, actual } => {
				write!(f, "Checksum verification failed for address: {} (data {}, checksum {}, expected {})",
					self.address, data, actual, self.expected
				)
			},
			ChecksumStatus::ReadFailed(e) => {
				write!(f, "Checksum verification failed for address: {} (read failed: {})", self.address, e)
			},
		}
	}
}

/// Outcome of comparing read-back data against the checksums of a program.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct VerifyReport {
	pub entries: Vec<ChecksumEntry>,
}

impl VerifyReport {
	pub fn passed(&self) -> bool {
		self.entries.iter().all(ChecksumEntry::is_verified)
	}

	pub fn failures(&self) -> impl Iterator<Item = &ChecksumEntry> {
		self.entries.iter().filter(|e| !e.is_verified())
	}
}

impl fmt::Display for VerifyReport {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		for entry in &self.entries {
			writeln!(f, "{}", entry)?;
		}
		Ok(())
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Cell {
	pub address: u16,
	pub data: HexWord,
	/// inside the range the caller asked for (not just part of the aligned window)
	pub requested: bool,
}

/// Memory contents of an aligned window, 8 addresses per row.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BulkReadReport {
	pub window: AddressWindow,
	pub cells: Vec<Cell>,
}

impl BulkReadReport {
	pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
		self.cells.chunks(ROW_LEN as usize)
	}

	pub fn requested(&self) -> impl Iterator<Item = &Cell> {
		self.cells.iter().filter(|c| c.requested)
	}
}

// requested values are marked with a trailing '*'
impl fmt::Display for BulkReadReport {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		for row in self.rows() {
			write!(f, "{:04x}", row[0].address)?;
			for cell in row {
				write!(f, " {}{}", cell.data, if cell.requested { '*' } else { ' ' })?;
			}
			writeln!(f)?;
		}
		Ok(())
	}
}
