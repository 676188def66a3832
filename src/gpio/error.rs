use std::io;

use super::Direction;

#[derive(Debug, Fail)]
pub enum HardwareError {
	/// invalid line id, direction or initial level while binding; aborts setup
	#[fail(display = "invalid pin configuration: {}", _0)]
	Configuration(String),

	/// operation on a line bound with the wrong direction; a programming error
	#[fail(display = "GPIO {}: cannot {} a line bound as {}", line, operation, direction)]
	Direction {
		line: u8,
		direction: Direction,
		operation: &'static str,
	},

	/// the backend failed to drive or sample a line
	#[fail(display = "GPIO {}: {} failed: {}", line, operation, cause)]
	Transport {
		line: u8,
		operation: &'static str,
		#[fail(cause)]
		cause: io::Error,
	},
}

impl HardwareError {
	pub fn configuration<S: Into<String>>(msg: S) -> Self {
		HardwareError::Configuration(msg.into())
	}

	pub fn is_configuration(&self) -> bool {
		match self {
			HardwareError::Configuration(_) => true,
			_ => false,
		}
	}

	pub fn is_direction(&self) -> bool {
		match self {
			HardwareError::Direction { .. } => true,
			_ => false,
		}
	}

	pub fn is_transport(&self) -> bool {
		match self {
			HardwareError::Transport { .. } => true,
			_ => false,
		}
	}
}
