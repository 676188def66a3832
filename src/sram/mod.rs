//! Memory board of the PB224: three 32K x 8 SRAMs side by side (24-bit
//! words), addressed through a 74HC595 cascade, written from a second 74HC595
//! cascade and read back through a 74HC165 cascade.
//!
//! Every operation is a blocking hardware transaction; the board has a single
//! owner and callers serialize access themselves.

use std::collections::BTreeMap;
use std::thread;

use crate::gpio::{
	Direction,
	HardwareError,
	Pin,
	Pulse,
	Timing,
	reliable_sleep,
};
use crate::hex::{
	HexWord,
	Record,
};

mod progress;
mod report;
mod shifter;
mod window;

pub use self::progress::{
	CountProgress,
	NoProgress,
	Progress,
};

pub use self::report::{
	BulkReadReport,
	Cell,
	ChecksumEntry,
	ChecksumStatus,
	VerifyReport,
};

pub use self::shifter::ShiftChain;

pub use self::window::{
	AddressWindow,
	ROW_LEN,
	lower_margin,
	upper_margin,
};

use self::shifter::require_output;

/// bits per memory word
pub const WORD_BITS: usize = 24;

/// notifier on/off transitions after a successful verification
const BLINKS: usize = 4;

/// address → checksum of the record written there
pub type ChecksumMap = BTreeMap<HexWord, HexWord>;

/// 74HC165 read-back cascade
pub struct ReadPins {
	/// SH/LD, active low parallel load
	pub latch: Pin,
	pub shift_clock: Pin,
	/// QH of the last stage
	pub serial_in: Pin,
}

pub struct WritePins {
	pub write_enable: Pin,
	/// rising edge writes the bus contents into the SRAM
	pub write_clock: Pin,
}

pub struct MemoryDriver {
	address: ShiftChain,
	data: ShiftChain,
	read: ReadPins,
	write: WritePins,
	notifier: Pin,
	timing: Timing,
}

fn join_shift(name: &str, handle: thread::ScopedJoinHandle<'_, crate::AResult<()>>) -> crate::AResult<()> {
	match handle.join() {
		Ok(r) => with_context!(("{} shift", name), r),
		Err(_) => bail!("{} shift thread panicked", name),
	}
}

impl MemoryDriver {
	pub fn new(
		address: ShiftChain,
		data: ShiftChain,
		read: ReadPins,
		write: WritePins,
		notifier: Pin,
		timing: Timing,
	) -> crate::AResult<MemoryDriver> {
		require_output(&read.latch, "read latch")?;
		require_output(&read.shift_clock, "read shift clock")?;
		if read.serial_in.direction() != Direction::Input {
			return Err(HardwareError::configuration(format!(
				"serial in (GPIO {}) must be an input", read.serial_in.line()
			)).into());
		}
		require_output(&write.write_enable, "write enable")?;
		require_output(&write.write_clock, "write clock")?;
		require_output(&notifier, "notifier")?;

		Ok(MemoryDriver {
			address,
			data,
			read,
			write,
			notifier,
			timing,
		})
	}

	pub fn timing(&self) -> Timing {
		self.timing
	}

	// address and data have to be stable on the buses at the same write strobe,
	// so both chains shift at the same time
	fn shift_address_and_data(&mut self, address: HexWord, data: HexWord) -> crate::AResult<()> {
		let address_chain = &mut self.address;
		let data_chain = &mut self.data;

		let (address_result, data_result) = thread::scope(|s| {
			let a = s.spawn(move || address_chain.shift(&address));
			let d = s.spawn(move || data_chain.shift(&data));
			// wait for both, even if one failed
			(join_shift("address", a), join_shift("data", d))
		});
		address_result?;
		data_result
	}

	fn write_inner(&mut self, address: HexWord, data: HexWord) -> crate::AResult<()> {
		self.shift_address_and_data(address, data)?;

		self.timing.settle();
		self.write.write_enable.set_level(true)?;
		self.timing.settle();
		self.write.write_clock.pulse(Pulse::High, self.timing.hold)?;
		self.timing.settle();
		self.write.write_enable.set_level(false)?;
		self.timing.settle();
		Ok(())
	}

	/// Not retried on failure; the memory contents are undefined afterwards.
	pub fn write_single_address(&mut self, address: &HexWord, data: &HexWord) -> crate::AResult<()> {
		match self.write_inner(*address, *data) {
			Ok(()) => {
				debug!("wrote {} to {}", data, address);
				Ok(())
			},
			Err(e) => {
				error!("writing {} to {} failed: {}", data, address, e);
				Err(e.context(format!("write {} to {}", data, address)).into())
			},
		}
	}

	fn read_inner(&mut self, address: HexWord) -> crate::AResult<HexWord> {
		// never write while reading
		self.write.write_enable.set_level(false)?;

		self.address.shift(&address)?;

		self.timing.settle();
		// parallel load of the memory output into the 74HC165 cascade
		self.read.latch.pulse(Pulse::Low, self.timing.hold)?;
		self.timing.settle();

		// the first bit is on the serial output right after the latch, the
		// remaining ones follow a clock edge each
		let mut bits = Vec::with_capacity(WORD_BITS);
		bits.push(self.read.serial_in.read_level()?);
		for _ in 1..WORD_BITS {
			self.read.shift_clock.pulse(Pulse::High, self.timing.hold)?;
			self.timing.settle();
			bits.push(self.read.serial_in.read_level()?);
			self.timing.settle();
		}

		HexWord::from_bits(bits)
	}

	pub fn read_single_address(&mut self, address: &HexWord) -> crate::AResult<HexWord> {
		match self.read_inner(*address) {
			Ok(data) => {
				debug!("read {} from {}", data, address);
				Ok(data)
			},
			Err(e) => {
				error!("reading {} failed: {}", address, e);
				Err(e.context(format!("read {}", address)).into())
			},
		}
	}

	/// Writes the data of every record; returns the expected checksum per address.
	///
	/// Stops at the first failed write.
	pub fn dump_program(&mut self, records: &[Record], progress: &mut dyn Progress) -> crate::AResult<ChecksumMap> {
		let mut checksums = ChecksumMap::new();

		progress.start(records.len());
		for record in records {
			let address = record.address();
			if let Err(e) = self.write_single_address(&address, &record.data()) {
				progress.finish();
				return Err(e);
			}
			checksums.insert(address, record.checksum());
			self.timing.settle();
			progress.advance(1);
		}
		progress.finish();

		info!("program dump of {} records done", records.len());
		Ok(checksums)
	}

	/// Reads back every address and recomputes the record checksum from
	/// `byte_count`, address, `record_type` and the data found.
	///
	/// Mismatches and failed reads only show up in the report. If everything
	/// matches the notifier blinks twice.
	pub fn verify_checksums(
		&mut self,
		checksums: &ChecksumMap,
		byte_count: &HexWord,
		record_type: &HexWord,
		progress: &mut dyn Progress,
	) -> VerifyReport {
		let mut report = VerifyReport::default();

		progress.start(checksums.len());
		for (address, expected) in checksums {
			let status = match self.read_single_address(address) {
				Err(e) => ChecksumStatus::ReadFailed(e.to_string()),
				Ok(data) => match HexWord::concat(&[*byte_count, *address, *record_type, data]) {
					Err(e) => ChecksumStatus::ReadFailed(e.to_string()),
					Ok(record) => {
						let actual = record.checksum();
						if actual == *expected {
							ChecksumStatus::Verified
						} else {
							ChecksumStatus::Mismatch { data, actual }
						}
					},
				},
			};
			report.entries.push(ChecksumEntry {
				address: *address,
				expected: *expected,
				status,
			});
			progress.advance(1);
		}
		progress.finish();

		if report.passed() {
			if let Err(e) = self.blink_notifier() {
				error!("checksum notifier failed: {}", e);
			}
		} else {
			warn!("checksum verification failed for {} of {} addresses",
				report.failures().count(), report.entries.len()
			);
		}

		info!("checksum verification done");
		report
	}

	// on/off/on/off, starting from off even if the line was configured high
	fn blink_notifier(&mut self) -> crate::AResult<()> {
		self.notifier.set_level(false)?;
		for i in 0..BLINKS {
			self.notifier.set_level(i % 2 == 0)?;
			reliable_sleep(self.timing.blink);
		}
		Ok(())
	}

	/// Reads the row aligned window around `lower..=upper`.
	pub fn bulk_read(&mut self, lower: &HexWord, upper: &HexWord, progress: &mut dyn Progress) -> crate::AResult<BulkReadReport> {
		ensure!(lower.to_decimal() <= 0xffff, "lower address {} out of range", lower);
		ensure!(upper.to_decimal() <= 0xffff, "upper address {} out of range", upper);
		let window = AddressWindow::covering(lower.to_decimal() as u16, upper.to_decimal() as u16)?;

		let mut cells = Vec::with_capacity(window.len());
		progress.start(window.len());
		for address in window.addresses() {
			let data = self.read_single_address(&HexWord::address(address))?;
			cells.push(Cell {
				address,
				data,
				requested: window.is_requested(address),
			});
			progress.advance(1);
		}
		progress.finish();

		info!("bulk read of {} done", window);
		Ok(BulkReadReport {
			window,
			cells,
		})
	}

	pub fn clear_address_register(&mut self) -> crate::AResult<()> {
		self.address.clear()
	}

	pub fn clear_data_register(&mut self) -> crate::AResult<()> {
		self.data.clear()
	}
}
