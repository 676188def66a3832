use std::fmt;

use crate::hex::HexWord;

/// addresses per row of a bulk read
pub const ROW_LEN: u16 = 8;

/// largest multiple of 8 not above `address`
pub fn lower_margin(address: u16) -> u16 {
	address & !(ROW_LEN - 1)
}

/// smallest address not below `address` that ends a row (≡ 7 mod 8)
pub fn upper_margin(address: u16) -> u16 {
	address | (ROW_LEN - 1)
}

/// Row aligned range of addresses covering a requested range.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct AddressWindow {
	pub lower: u16,
	pub upper: u16,
	pub requested_lower: u16,
	pub requested_upper: u16,
}

impl AddressWindow {
	pub fn covering(lower: u16, upper: u16) -> crate::AResult<AddressWindow> {
		ensure!(lower <= upper, "lower address 0x{:04x} is above upper address 0x{:04x}", lower, upper);
		Ok(AddressWindow {
			lower: lower_margin(lower),
			upper: upper_margin(upper),
			requested_lower: lower,
			requested_upper: upper,
		})
	}

	pub fn len(&self) -> usize {
		(self.upper - self.lower) as usize + 1
	}

	pub fn addresses(&self) -> impl Iterator<Item = u16> {
		self.lower..=self.upper
	}

	pub fn is_requested(&self, address: u16) -> bool {
		self.requested_lower <= address && address <= self.requested_upper
	}
}

impl fmt::Display for AddressWindow {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}..={}", HexWord::address(self.lower), HexWord::address(self.upper))
	}
}

#[cfg(test)]
mod test {
	use super::{
		AddressWindow,
		lower_margin,
		upper_margin,
	};

	#[test]
	fn margins() {
		assert_eq!(lower_margin(0x0002), 0x0000);
		assert_eq!(lower_margin(0x0008), 0x0008);
		assert_eq!(upper_margin(0x0006), 0x0007);
		assert_eq!(upper_margin(0x0007), 0x0007);
		assert_eq!(upper_margin(0x0008), 0x000f);
		assert_eq!(upper_margin(0xffff), 0xffff);

		for a in (0u32..=0xffff).step_by(13).map(|a| a as u16) {
			let l = lower_margin(a);
			let u = upper_margin(a);
			assert!(l <= a && a <= u);
			assert_eq!(l % 8, 0);
			assert_eq!(u % 8, 7);
			assert!(a - l < 8 && u - a < 8);
		}
	}

	#[test]
	fn window() {
		let w = AddressWindow::covering(0x1001, 0x1007).unwrap();
		assert_eq!((w.lower, w.upper), (0x1000, 0x1007));
		assert_eq!(w.len(), 8);
		assert!(!w.is_requested(0x1000));
		assert!(w.is_requested(0x1001));
		assert_eq!(w.to_string(), "0x1000..=0x1007");

		let w = AddressWindow::covering(0x1001, 0x100b).unwrap();
		assert_eq!((w.lower, w.upper), (0x1000, 0x100f));
		assert_eq!(w.addresses().count(), 16);

		assert!(AddressWindow::covering(0x1008, 0x1007).is_err());
	}
}
