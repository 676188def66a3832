//! Fixed-width hexadecimal words and the record checksum.

use std::fmt;
use std::str;

mod file;
mod record;

pub use self::file::parse_program;
pub use self::record::{
	RECORD_LEN,
	Record,
	RecordType,
};

// everything has to fit a u64
const MAX_DIGITS: usize = 16;

/// Address width of the memory board in hex digits.
pub const ADDRESS_DIGITS: usize = 4;

/// A value together with the number of hex digits it is written with.
///
/// The digit count is always even (whole bytes); it decides how many bits
/// are shifted out and how many bytes take part in the checksum.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HexWord {
	value: u64,
	digits: u8,
}

impl HexWord {
	pub fn new(value: u64, digits: usize) -> crate::AResult<HexWord> {
		ensure!(digits > 0 && digits % 2 == 0, "hex word needs an even number of digits, got {}", digits);
		ensure!(digits <= MAX_DIGITS, "hex word too wide: {} digits (max {})", digits, MAX_DIGITS);
		ensure!(digits == MAX_DIGITS || value >> (4 * digits) == 0,
			"value 0x{:x} doesn't fit into {} hex digits", value, digits
		);
		Ok(HexWord { value, digits: digits as u8 })
	}

	/// 16-bit address, always four digits
	pub fn address(value: u16) -> HexWord {
		HexWord { value: value as u64, digits: ADDRESS_DIGITS as u8 }
	}

	/// build a word from bits, most significant first; needs whole bytes
	pub fn from_bits<I>(bits: I) -> crate::AResult<HexWord>
	where
		I: IntoIterator<Item = bool>,
	{
		let mut value = 0u64;
		let mut count = 0usize;
		for bit in bits {
			ensure!(count < 4 * MAX_DIGITS, "too many bits for a hex word");
			value = (value << 1) | (bit as u64);
			count += 1;
		}
		ensure!(count % 8 == 0, "{} bits are not a whole number of bytes", count);
		HexWord::new(value, count / 4)
	}

	/// digits of all words written one after another
	pub fn concat(words: &[HexWord]) -> crate::AResult<HexWord> {
		let mut value = 0u64;
		let mut digits = 0usize;
		for w in words {
			digits += w.digits();
			ensure!(digits <= MAX_DIGITS, "concatenated hex word too wide: {} digits", digits);
			value = if w.digits() == MAX_DIGITS { w.value } else { (value << w.bit_length()) | w.value };
		}
		HexWord::new(value, digits)
	}

	pub fn to_decimal(&self) -> u64 {
		self.value
	}

	pub fn digits(&self) -> usize {
		self.digits as usize
	}

	pub fn byte_width(&self) -> usize {
		self.digits() / 2
	}

	pub fn bit_length(&self) -> u32 {
		4 * self.digits as u32
	}

	pub fn bit(&self, index: u32) -> bool {
		index < 64 && 0 != (self.value >> index) & 1
	}

	/// same value, re-padded to `digits`
	pub fn with_digits(&self, digits: usize) -> crate::AResult<HexWord> {
		HexWord::new(self.value, digits)
	}

	/// bytes, most significant first
	pub fn bytes(&self) -> Vec<u8> {
		(0..self.byte_width()).rev().map(|i| (self.value >> (8 * i)) as u8).collect()
	}

	pub fn to_binary_string(&self) -> String {
		format!("0b{:0width$b}", self.value, width = self.bit_length() as usize)
	}

	/// digits without the "0x" prefix
	pub fn to_digits(&self) -> String {
		format!("{:0width$x}", self.value, width = self.digits())
	}

	/// two's complement of the byte sum; appending it makes the sum zero (mod 256)
	pub fn checksum(&self) -> HexWord {
		let sum = self.bytes().iter().fold(0u8, |sum, b| sum.wrapping_add(*b));
		HexWord { value: sum.wrapping_neg() as u64, digits: 2 }
	}
}

impl fmt::Display for HexWord {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{}", self.to_digits())
	}
}

impl fmt::Debug for HexWord {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "HexWord({})", self)
	}
}

impl str::FromStr for HexWord {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let digits = if s.starts_with("0x") || s.starts_with("0X") {
			&s[2..]
		} else {
			bail!("hex word must start with 0x: {:?}", s);
		};
		ensure!(!digits.is_empty(), "hex word without digits: {:?}", s);
		ensure!(digits.bytes().all(|c| c.is_ascii_hexdigit()), "invalid hex digits in {:?}", s);
		ensure!(digits.len() % 2 == 0, "odd number of hex digits in {:?}", s);
		ensure!(digits.len() <= MAX_DIGITS, "hex word too wide: {:?}", s);
		let value = u64::from_str_radix(digits, 16)?;
		HexWord::new(value, digits.len())
	}
}

/// zero-padded 16-bit address
pub fn decimal_to_hex(value: u16) -> HexWord {
	HexWord::address(value)
}

/// "0b..." string to "0x..." with one digit per four bits (zero-padded)
pub fn binary_to_hex(bits: &str) -> crate::AResult<String> {
	let digits = if bits.starts_with("0b") {
		&bits[2..]
	} else {
		bail!("binary string must start with 0b: {:?}", bits);
	};
	ensure!(!digits.is_empty() && digits.len() <= 64, "invalid binary string length: {:?}", bits);
	let value = with_context!(("invalid binary string {:?}", bits),
		Ok(u64::from_str_radix(digits, 2)?)
	)?;
	Ok(format!("0x{:0width$x}", value, width = digits.len() / 4))
}

#[cfg(test)]
mod test {
	use super::{
		HexWord,
		binary_to_hex,
		decimal_to_hex,
	};

	fn hex(s: &str) -> HexWord {
		s.parse().unwrap_or_else(|e| panic!("{} failed to parse as HexWord: {}", s, e))
	}

	#[test]
	fn parse_and_format() {
		assert_eq!(hex("0x9e").to_decimal(), 158);
		assert_eq!(hex("0x9E").to_string(), "0x9e");
		assert_eq!(hex("0x0005").to_string(), "0x0005");
		assert_eq!(hex("0x0005").bit_length(), 16);
		assert_eq!(hex("0x3400aa").byte_width(), 3);
		assert_eq!(hex("0x02").to_binary_string(), "0b00000010");
		assert!("9e".parse::<HexWord>().is_err());
		assert!("0x".parse::<HexWord>().is_err());
		assert!("0xc10".parse::<HexWord>().is_err());
		assert!("0x0g".parse::<HexWord>().is_err());
		assert!("0x112233445566778899".parse::<HexWord>().is_err());
	}

	#[test]
	fn decimal_round_trip() {
		for s in &["0x00", "0xff", "0x0000", "0x1007", "0xffff", "0x3400aa", "0x03000000020023"] {
			let w = hex(s);
			let back = decimal_to_hex(w.to_decimal() as u16);
			if w.digits() == 4 {
				assert_eq!(back.to_string(), *s);
			}
			assert_eq!(HexWord::new(w.to_decimal(), w.digits()).unwrap().to_string(), *s);
		}
		assert_eq!(decimal_to_hex(5).to_string(), "0x0005");
	}

	#[test]
	fn checksum() {
		assert_eq!(hex("0x03000000020023").checksum().to_string(), "0xd8");
		assert_eq!(hex("0x00").checksum().to_string(), "0x00");
		assert_eq!(hex("0x01").checksum().to_string(), "0xff");

		// appending the checksum makes the byte sum zero
		let record = hex("0x031003003400aa");
		let full = HexWord::concat(&[record, record.checksum()]).unwrap();
		assert_eq!(full.checksum().to_decimal(), 0);
	}

	#[test]
	fn binary_conversions() {
		assert_eq!(binary_to_hex("0b101000011111").unwrap(), "0xa1f");
		assert_eq!(binary_to_hex("0b00000010").unwrap(), "0x02");
		assert!(binary_to_hex("101").is_err());
		assert!(binary_to_hex("0b102").is_err());

		let bits = [true, false, true, false, false, false, false, true];
		assert_eq!(HexWord::from_bits(bits.iter().cloned()).unwrap().to_string(), "0xa1");
		assert!(HexWord::from_bits(vec![true; 12]).is_err());
	}

	#[test]
	fn concat_keeps_leading_zeros() {
		let w = HexWord::concat(&[hex("0x03"), hex("0x0010"), hex("0x00"), hex("0x3400aa")]).unwrap();
		assert_eq!(w.to_string(), "0x030010003400aa");
	}
}
