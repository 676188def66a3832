use std::fmt;
use std::str;

use super::HexWord;

/// ':' + byte count (2) + address (4) + type (2) + data (6) + checksum (2)
pub const RECORD_LEN: usize = 17;

const MARKER: u8 = b':';

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum RecordType {
	Data,
	EndOfFile,
	Other(u8),
}

impl From<u8> for RecordType {
	fn from(v: u8) -> Self {
		match v {
			0x00 => RecordType::Data,
			0x01 => RecordType::EndOfFile,
			v => RecordType::Other(v),
		}
	}
}

/// One line of a program file, with its fields at fixed offsets.
///
/// Only the 3-byte payload layout the memory board uses is accepted.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Record {
	raw: String,
	// byte count, address, type and data as one 7-byte word
	body: HexWord,
	checksum: HexWord,
}

impl Record {
	pub fn parse(line: &str) -> crate::AResult<Record> {
		let line = line.trim_end();
		let r = line.as_bytes();
		ensure!(line.is_ascii(), "record contains non-ASCII characters: {:?}", line);
		ensure!(!r.is_empty() && r[0] == MARKER, "record must start with ':': {:?}", line);
		ensure!(r.len() == RECORD_LEN,
			"record has {} characters, expected {}: {:?}", r.len(), RECORD_LEN, line
		);
		let (body, checksum) = with_context!(("invalid record {:?}", line), {
			let body = format!("0x{}", &line[1..15]).parse::<HexWord>()?;
			let checksum = format!("0x{}", &line[15..17]).parse::<HexWord>()?;
			Ok((body, checksum))
		})?;
		Ok(Record {
			raw: line.into(),
			body,
			checksum,
		})
	}

	// `digits` wide field starting `offset` digits into the body
	fn field(&self, offset: usize, digits: usize) -> HexWord {
		let shift = 4 * (self.body.digits() - offset - digits);
		let mask = (1u64 << (4 * digits)) - 1;
		HexWord {
			value: (self.body.to_decimal() >> shift) & mask,
			digits: digits as u8,
		}
	}

	pub fn raw(&self) -> &str {
		&self.raw
	}

	pub fn byte_count(&self) -> HexWord {
		self.field(0, 2)
	}

	pub fn address(&self) -> HexWord {
		self.field(2, 4)
	}

	pub fn record_type(&self) -> HexWord {
		self.field(6, 2)
	}

	pub fn kind(&self) -> RecordType {
		RecordType::from(self.record_type().to_decimal() as u8)
	}

	pub fn data(&self) -> HexWord {
		self.field(8, 6)
	}

	pub fn checksum(&self) -> HexWord {
		self.checksum
	}

	/// checksum computed over byte count, address, type and data
	pub fn computed_checksum(&self) -> HexWord {
		self.body.checksum()
	}

	pub fn is_consistent(&self) -> bool {
		self.computed_checksum() == self.checksum
	}
}

impl str::FromStr for Record {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Record::parse(s)
	}
}

impl fmt::Display for Record {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.raw)
	}
}

impl fmt::Debug for Record {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Record")
			.field("byte_count", &self.byte_count())
			.field("address", &self.address())
			.field("record_type", &self.record_type())
			.field("data", &self.data())
			.field("checksum", &self.checksum())
			.finish()
	}
}

#[cfg(test)]
mod test {
	use super::{
		Record,
		RecordType,
	};

	#[test]
	fn fields() {
		let r = Record::parse(":031003003400aadc").unwrap();
		assert_eq!(r.byte_count().to_string(), "0x03");
		assert_eq!(r.address().to_string(), "0x1003");
		assert_eq!(r.record_type().to_string(), "0x00");
		assert_eq!(r.kind(), RecordType::Data);
		assert_eq!(r.data().to_string(), "0x3400aa");
		assert_eq!(r.checksum().to_string(), "0xdc");
	}

	#[test]
	fn checksum_consistency() {
		// 03 + 10 + 03 + 00 + 34 + 00 + aa = 0xf4 -> 0x0c
		let good = Record::parse(":031003003400aa0c").unwrap();
		assert!(good.is_consistent());
		let upper = Record::parse(":031003003400AA0C").unwrap();
		assert!(upper.is_consistent());
		assert_eq!(upper.data(), good.data());
		let bad = Record::parse(":031003003400aadc").unwrap();
		assert!(!bad.is_consistent());
	}

	#[test]
	fn rejects_malformed() {
		assert!(Record::parse("031003003400aa0c").is_err());
		assert!(Record::parse(":031003003400aa0").is_err());
		assert!(Record::parse(":031003003400aa0c00").is_err());
		assert!(Record::parse(":03100300340Zaa0c").is_err());
		assert!(Record::parse("").is_err());
		// trailing CR of DOS line endings is fine
		assert!(Record::parse(":031003003400aa0c\r").is_ok());
	}
}
