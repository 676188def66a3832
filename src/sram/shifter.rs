//! Cascaded 74HC595 serial-in / parallel-out registers.
//!
//! Pins: SER (serial data), SRCLK (shift clock), RCLK (register / output
//! clock), SRCLR (active-low clear). Bits go out LSB first, so after a full
//! word output 0 holds bit 0.

use crate::gpio::{
	Direction,
	HardwareError,
	Pin,
	Pulse,
	Timing,
};
use crate::hex::HexWord;

pub struct ShiftChain {
	serial: Pin,
	shift_clock: Pin,
	register_clock: Pin,
	clear: Pin,
	timing: Timing,
}

pub(crate) fn require_output(pin: &Pin, role: &str) -> crate::AResult<()> {
	if pin.direction() != Direction::Output {
		return Err(HardwareError::configuration(format!(
			"{} (GPIO {}) must be an output", role, pin.line()
		)).into());
	}
	Ok(())
}

impl ShiftChain {
	pub fn new(serial: Pin, shift_clock: Pin, register_clock: Pin, clear: Pin, timing: Timing) -> crate::AResult<ShiftChain> {
		require_output(&serial, "serial")?;
		require_output(&shift_clock, "shift clock")?;
		require_output(&register_clock, "register clock")?;
		require_output(&clear, "clear")?;
		Ok(ShiftChain {
			serial,
			shift_clock,
			register_clock,
			clear,
			timing,
		})
	}

	/// zero all stages; needed once before the first `shift`
	pub fn clear(&mut self) -> crate::AResult<()> {
		self.clear.pulse(Pulse::Low, self.timing.hold)
	}

	pub fn shift(&mut self, word: &HexWord) -> crate::AResult<()> {
		for i in 0..word.bit_length() {
			self.serial.set_level(word.bit(i))?;
			self.timing.settle();
			// bit enters the first stage on the rising edge
			self.shift_clock.pulse(Pulse::High, self.timing.hold)?;
		}

		self.timing.settle();
		// all stages to the outputs at once
		self.register_clock.pulse(Pulse::High, self.timing.hold)?;
		self.serial.set_level(false)
	}
}

#[cfg(test)]
mod test {
	use std::sync::Arc;

	use crate::gpio::{
		Gpio,
		HardwareError,
		Pin,
		PinMode,
		Timing,
		sim::{
			ShifterLines,
			SimGpio,
		},
	};
	use crate::hex::HexWord;
	use super::ShiftChain;

	const LINES: ShifterLines = ShifterLines { serial: 2, shift_clock: 3, register_clock: 4, clear: 14 };

	fn output(gpio: &Arc<Gpio>, line: u8, initial: bool) -> Pin {
		Pin::configure(gpio, line, PinMode::Output { initial }).unwrap()
	}

	fn chain(gpio: &Arc<Gpio>) -> ShiftChain {
		ShiftChain::new(
			output(gpio, LINES.serial, false),
			output(gpio, LINES.shift_clock, false),
			output(gpio, LINES.register_clock, false),
			output(gpio, LINES.clear, true),
			Timing::immediate(),
		).unwrap()
	}

	#[test]
	fn shift_presents_word_lsb_first() {
		let sim = Arc::new(SimGpio::new());
		let register = sim.attach_shift_register(LINES, 24);
		let gpio = Gpio::acquire(sim.clone());
		let mut chain = chain(&gpio);
		chain.clear().unwrap();

		let word: HexWord = "0x3400aa".parse().unwrap();
		chain.shift(&word).unwrap();
		let outputs = sim.parallel_outputs(register);
		for i in 0..24 {
			assert_eq!(0 != (outputs >> i) & 1, word.bit(i), "output {}", i);
		}
		assert_eq!(outputs, 0x3400aa);
		// one clock per bit, serial dropped afterwards
		assert_eq!(sim.transitions(LINES.shift_clock), 2 * 24);
		assert_eq!(sim.transitions(LINES.register_clock), 2);
		assert!(!sim.level(LINES.serial));
	}

	#[test]
	fn later_word_replaces_earlier() {
		let sim = Arc::new(SimGpio::new());
		let register = sim.attach_shift_register(LINES, 16);
		let gpio = Gpio::acquire(sim.clone());
		let mut chain = chain(&gpio);
		chain.clear().unwrap();
		chain.shift(&"0xffff".parse().unwrap()).unwrap();
		chain.shift(&"0x1001".parse().unwrap()).unwrap();
		assert_eq!(sim.parallel_outputs(register), 0x1001);
	}

	#[test]
	fn clear_pulses_low() {
		let sim = Arc::new(SimGpio::new());
		let gpio = Gpio::acquire(sim.clone());
		let mut chain = chain(&gpio);
		chain.clear().unwrap();
		assert_eq!(sim.transitions(LINES.clear), 2);
		assert!(sim.level(LINES.clear));
	}

	#[test]
	fn rejects_input_pins() {
		let gpio = Gpio::acquire(SimGpio::new());
		let e = ShiftChain::new(
			output(&gpio, LINES.serial, false),
			output(&gpio, LINES.shift_clock, false),
			Pin::configure(&gpio, LINES.register_clock, PinMode::Input).unwrap(),
			output(&gpio, LINES.clear, true),
			Timing::immediate(),
		).err().expect("input pin must be rejected");
		assert!(e.downcast_ref::<HardwareError>().map_or(false, |e| e.is_configuration()));
	}
}
