use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::{
	Direction,
	Gpio,
	HardwareError,
	PinMode,
	reliable_sleep,
};

/// Asserted level of a pulse; the line returns to the opposite level afterwards.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Pulse {
	High,
	/// active-low strobe (latch / clear)
	Low,
}

impl Pulse {
	fn asserted(self) -> bool {
		match self {
			Pulse::High => true,
			Pulse::Low => false,
		}
	}
}

/// One bound GPIO line.
///
/// The direction is fixed for the lifetime of the handle; the line is
/// released when the last handle for it is dropped.
pub struct Pin {
	gpio: Arc<Gpio>,
	line: u8,
	direction: Direction,
}

impl Pin {
	pub fn configure(gpio: &Arc<Gpio>, line: u8, mode: PinMode) -> crate::AResult<Pin> {
		let direction = mode.direction();
		let first = gpio.bind(line, direction)?;
		// from here on the handle owns the binding, dropping it on error unbinds
		let pin = Pin {
			gpio: gpio.clone(),
			line,
			direction,
		};
		if !first {
			// keeps driving whatever the line is at
			debug!("GPIO {}: another handle as {}", line, direction);
			return Ok(pin);
		}
		gpio.backend().set_mode(line, mode).map_err(|cause| HardwareError::Transport {
			line,
			operation: "configure",
			cause,
		})?;
		debug!("GPIO {}: bound as {:?}", line, mode);
		Ok(pin)
	}

	pub fn line(&self) -> u8 {
		self.line
	}

	pub fn direction(&self) -> Direction {
		self.direction
	}

	fn require(&self, direction: Direction, operation: &'static str) -> Result<(), HardwareError> {
		if self.direction != direction {
			return Err(HardwareError::Direction {
				line: self.line,
				direction: self.direction,
				operation,
			});
		}
		Ok(())
	}

	pub fn set_level(&mut self, level: bool) -> crate::AResult<()> {
		self.require(Direction::Output, "drive")?;
		self.gpio.backend().set_level(self.line, level).map_err(|cause| HardwareError::Transport {
			line: self.line,
			operation: "drive",
			cause,
		})?;
		Ok(())
	}

	pub fn read_level(&mut self) -> crate::AResult<bool> {
		self.require(Direction::Input, "sample")?;
		let level = self.gpio.backend().get_level(self.line).map_err(|cause| HardwareError::Transport {
			line: self.line,
			operation: "sample",
			cause,
		})?;
		Ok(level)
	}

	/// drive the asserted level, keep it for `hold`, then release to the opposite level
	pub fn pulse(&mut self, pulse: Pulse, hold: Duration) -> crate::AResult<()> {
		self.set_level(pulse.asserted())?;
		reliable_sleep(hold);
		self.set_level(!pulse.asserted())
	}
}

impl Drop for Pin {
	fn drop(&mut self) {
		self.gpio.unbind(self.line);
	}
}

impl fmt::Debug for Pin {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Pin")
			.field("line", &self.line)
			.field("direction", &self.direction)
			.finish()
	}
}

#[cfg(test)]
mod test {
	use std::sync::Arc;
	use std::time::Duration;

	use crate::gpio::{
		Direction,
		Gpio,
		HardwareError,
		PinMode,
		sim::SimGpio,
	};
	use super::{
		Pin,
		Pulse,
	};

	fn hardware_error(e: &failure::Error) -> &HardwareError {
		e.downcast_ref::<HardwareError>().expect("expected a HardwareError")
	}

	#[test]
	fn output_drives_initial_level() {
		let sim = Arc::new(SimGpio::new());
		let gpio = Gpio::acquire(sim.clone());
		let _pin = Pin::configure(&gpio, 4, PinMode::Output { initial: true }).unwrap();
		assert!(sim.level(4));
		assert_eq!(gpio.direction(4), Some(Direction::Output));
	}

	#[test]
	fn rejects_out_of_range_line() {
		let gpio = Gpio::acquire(SimGpio::new());
		let e = Pin::configure(&gpio, 28, PinMode::Input).unwrap_err();
		assert!(hardware_error(&e).is_configuration());
	}

	#[test]
	fn rejects_conflicting_direction() {
		let gpio = Gpio::acquire(SimGpio::new());
		let _out = Pin::configure(&gpio, 5, PinMode::Output { initial: false }).unwrap();
		let e = Pin::configure(&gpio, 5, PinMode::Input).unwrap_err();
		assert!(hardware_error(&e).is_configuration());
		// same direction is fine
		let _again = Pin::configure(&gpio, 5, PinMode::Output { initial: false }).unwrap();
	}

	#[test]
	fn second_handle_keeps_level() {
		let sim = Arc::new(SimGpio::new());
		let gpio = Gpio::acquire(sim.clone());
		let mut first = Pin::configure(&gpio, 12, PinMode::Output { initial: false }).unwrap();
		first.set_level(true).unwrap();
		let second = Pin::configure(&gpio, 12, PinMode::Output { initial: false }).unwrap();
		assert!(sim.level(12));
		assert_eq!(sim.transitions(12), 1);

		// line stays bound until the last handle is gone
		drop(first);
		assert_eq!(sim.mode(12), Some(PinMode::Output { initial: false }));
		drop(second);
		assert_eq!(sim.mode(12), None);
	}

	#[test]
	fn rebinding_after_drop() {
		let gpio = Gpio::acquire(SimGpio::new());
		let out = Pin::configure(&gpio, 6, PinMode::Output { initial: false }).unwrap();
		drop(out);
		assert_eq!(gpio.direction(6), None);
		let _input = Pin::configure(&gpio, 6, PinMode::Input).unwrap();
	}

	#[test]
	fn wrong_direction_access() {
		let gpio = Gpio::acquire(SimGpio::new());
		let mut input = Pin::configure(&gpio, 7, PinMode::Input).unwrap();
		let mut output = Pin::configure(&gpio, 8, PinMode::Output { initial: false }).unwrap();
		assert!(hardware_error(&input.set_level(true).unwrap_err()).is_direction());
		assert!(hardware_error(&output.read_level().unwrap_err()).is_direction());
	}

	#[test]
	fn pulse_returns_to_opposite_level() {
		let sim = Arc::new(SimGpio::new());
		let gpio = Gpio::acquire(sim.clone());
		let mut high = Pin::configure(&gpio, 9, PinMode::Output { initial: false }).unwrap();
		let mut low = Pin::configure(&gpio, 10, PinMode::Output { initial: true }).unwrap();
		high.pulse(Pulse::High, Duration::from_millis(0)).unwrap();
		low.pulse(Pulse::Low, Duration::from_millis(0)).unwrap();
		assert!(!sim.level(9));
		assert!(sim.level(10));
		assert_eq!(sim.transitions(9), 2);
		assert_eq!(sim.transitions(10), 2);
	}

	#[test]
	fn transport_failure_is_reported() {
		let sim = Arc::new(SimGpio::new());
		let gpio = Gpio::acquire(sim.clone());
		let mut input = Pin::configure(&gpio, 11, PinMode::Input).unwrap();
		sim.fail_line(11);
		assert!(hardware_error(&input.read_level().unwrap_err()).is_transport());
	}
}
