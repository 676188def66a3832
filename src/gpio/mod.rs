//! GPIO lines of the Raspberry Pi header (BCM numbering).
//!
//! A `Gpio` context owns the backend for the lifetime of the process; `Pin`
//! handles bind single lines through it and release them again when dropped.

use std::fmt;
use std::io;
use std::sync::{
	Arc,
	Mutex,
};

mod error;
mod linux;
mod pin;
pub mod sim;
mod timing;

pub use self::error::HardwareError;

pub use self::pin::{
	Pin,
	Pulse,
};

pub use self::timing::{
	Timing,
	reliable_sleep,
};

// OS-specific. for now linux only.
pub use self::linux::{
	GPIOMEM_DEVICE,
	open_gpiomem,
	open_sysfs,
};

/// number of usable lines; valid ids are `0..PIN_COUNT`
pub const PIN_COUNT: u8 = 28;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Direction {
	Input,
	Output,
}

impl fmt::Display for Direction {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Direction::Input => write!(f, "input"),
			Direction::Output => write!(f, "output"),
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PinMode {
	Input,
	/// output driven to `initial` as part of the binding
	Output { initial: bool },
}

impl PinMode {
	pub fn direction(&self) -> Direction {
		match self {
			PinMode::Input => Direction::Input,
			PinMode::Output { .. } => Direction::Output,
		}
	}
}

/// Raw access to the GPIO lines.
///
/// Lines are driven from two threads at once while shifting address and
/// data, so implementations must be usable through a shared reference.
pub trait GpioBackend: Send + Sync {
	fn set_mode(&self, line: u8, mode: PinMode) -> io::Result<()>;
	fn set_level(&self, line: u8, level: bool) -> io::Result<()>;
	fn get_level(&self, line: u8) -> io::Result<bool>;

	// return line to a safe state (input); called when the last handle is gone
	fn release(&self, line: u8) -> io::Result<()>;
}

impl<B: ?Sized + GpioBackend> GpioBackend for Arc<B> {
	fn set_mode(&self, line: u8, mode: PinMode) -> io::Result<()> {
		B::set_mode(self, line, mode)
	}
	fn set_level(&self, line: u8, level: bool) -> io::Result<()> {
		B::set_level(self, line, level)
	}
	fn get_level(&self, line: u8) -> io::Result<bool> {
		B::get_level(self, line)
	}
	fn release(&self, line: u8) -> io::Result<()> {
		B::release(self, line)
	}
}

#[derive(Clone, Copy, Debug)]
struct Binding {
	direction: Direction,
	handles: usize,
}

/// Hardware context: exclusive owner of the GPIO backend.
pub struct Gpio {
	backend: Box<dyn GpioBackend>,
	bound: Mutex<[Option<Binding>; PIN_COUNT as usize]>,
}

impl fmt::Debug for Gpio {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Gpio")
			.field("bound", &self.bound)
			.finish()
	}
}

impl Gpio {
	pub fn acquire<B: GpioBackend + 'static>(backend: B) -> Arc<Gpio> {
		Arc::new(Gpio {
			backend: Box::new(backend),
			bound: Mutex::new([None; PIN_COUNT as usize]),
		})
	}

	pub(crate) fn backend(&self) -> &dyn GpioBackend {
		&*self.backend
	}

	pub fn direction(&self, line: u8) -> Option<Direction> {
		let bound = self.bound.lock().unwrap_or_else(|e| e.into_inner());
		bound.get(line as usize).and_then(|b| b.map(|b| b.direction))
	}

	// registers a handle for `line`; returns whether the line was unbound before
	fn bind(&self, line: u8, direction: Direction) -> Result<bool, HardwareError> {
		if line >= PIN_COUNT {
			return Err(HardwareError::configuration(format!(
				"pin {} out of range (0..={})", line, PIN_COUNT - 1
			)));
		}
		let mut bound = self.bound.lock().unwrap_or_else(|e| e.into_inner());
		let index = line as usize;
		match bound[index] {
			Some(binding) if binding.direction != direction => {
				Err(HardwareError::configuration(format!(
					"pin {} already bound as {}, can't bind as {}", line, binding.direction, direction
				)))
			},
			Some(binding) => {
				bound[index] = Some(Binding { handles: binding.handles + 1, ..binding });
				Ok(false)
			},
			None => {
				bound[index] = Some(Binding { direction, handles: 1 });
				Ok(true)
			},
		}
	}

	fn unbind(&self, line: u8) {
		let mut bound = self.bound.lock().unwrap_or_else(|e| e.into_inner());
		let index = line as usize;
		let last = match bound[index] {
			Some(binding) if binding.handles > 1 => {
				bound[index] = Some(Binding { handles: binding.handles - 1, ..binding });
				false
			},
			Some(_) => {
				bound[index] = None;
				true
			},
			None => false,
		};
		if last {
			drop(bound);
			if let Err(e) = self.backend.release(line) {
				warn!("GPIO {}: failed to release line: {}", line, e);
			}
		}
	}
}
