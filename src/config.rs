//! Pin profile of the memory board, read from a TOML file.
//!
//! ```toml
//! [gpio]
//! backend = "gpiomem"
//!
//! [data_shifter]
//! serial = { pin = 17 }
//! shift_clock = { pin = 27 }
//! register_clock = { pin = 22 }
//! clear = { pin = 23, initial = 1 }
//! # [address_shifter] likewise
//!
//! [reader]
//! latch = { pin = 24, initial = 1 }
//! shift_clock = { pin = 25 }
//! serial_in = { pin = 12, direction = "input" }
//!
//! [writer]
//! write_enable = { pin = 16 }
//! write_clock = { pin = 20 }
//!
//! [notifier]
//! notify = { pin = 21 }
//! ```

use std::fs;
use std::path::{
	Path,
	PathBuf,
};
use std::sync::Arc;

use serde::Deserialize;

use crate::gpio::{
	self,
	Direction,
	Gpio,
	HardwareError,
	Pin,
	PinMode,
	Timing,
};
use crate::sram::{
	MemoryDriver,
	ReadPins,
	ShiftChain,
	WritePins,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
	Gpiomem,
	Sysfs,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GpioConfig {
	#[serde(default = "default_backend")]
	pub backend: BackendKind,
	#[serde(default = "default_device")]
	pub device: PathBuf,
	/// kernel GPIO number of header line 0 (sysfs only)
	#[serde(default)]
	pub chip_base: u32,
}

fn default_backend() -> BackendKind {
	BackendKind::Gpiomem
}

fn default_device() -> PathBuf {
	PathBuf::from(gpio::GPIOMEM_DEVICE)
}

impl Default for GpioConfig {
	fn default() -> Self {
		GpioConfig {
			backend: default_backend(),
			device: default_device(),
			chip_base: 0,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinDirection {
	Input,
	Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PinConfig {
	pub pin: u8,
	/// defaults to the direction of the role
	pub direction: Option<PinDirection>,
	/// 0 or 1, outputs only
	pub initial: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ShifterConfig {
	pub serial: PinConfig,
	pub shift_clock: PinConfig,
	pub register_clock: PinConfig,
	pub clear: PinConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ReaderConfig {
	pub latch: PinConfig,
	pub shift_clock: PinConfig,
	pub serial_in: PinConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WriterConfig {
	pub write_enable: PinConfig,
	pub write_clock: PinConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NotifierConfig {
	pub notify: PinConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PinProfile {
	#[serde(default)]
	pub gpio: GpioConfig,
	pub data_shifter: ShifterConfig,
	pub address_shifter: ShifterConfig,
	pub reader: ReaderConfig,
	pub writer: WriterConfig,
	pub notifier: NotifierConfig,
}

impl PinConfig {
	fn mode(&self, role: &str, expected: Direction) -> Result<PinMode, HardwareError> {
		let direction = match self.direction {
			None => expected,
			Some(PinDirection::Input) => Direction::Input,
			Some(PinDirection::Output) => Direction::Output,
		};
		if direction != expected {
			return Err(HardwareError::configuration(format!(
				"{} (pin {}) has to be an {}", role, self.pin, expected
			)));
		}
		match (direction, self.initial) {
			(Direction::Input, None) => Ok(PinMode::Input),
			(Direction::Input, Some(_)) => Err(HardwareError::configuration(format!(
				"{} (pin {}) is an input and can't have an initial level", role, self.pin
			))),
			(Direction::Output, None) | (Direction::Output, Some(0)) => Ok(PinMode::Output { initial: false }),
			(Direction::Output, Some(1)) => Ok(PinMode::Output { initial: true }),
			(Direction::Output, Some(v)) => Err(HardwareError::configuration(format!(
				"{} (pin {}): initial level must be 0 or 1, got {}", role, self.pin, v
			))),
		}
	}

	fn bind(&self, gpio: &Arc<Gpio>, role: &str, expected: Direction) -> crate::AResult<Pin> {
		let mode = self.mode(role, expected)?;
		with_context!(("{}", role), Pin::configure(gpio, self.pin, mode))
	}

	fn output(&self, gpio: &Arc<Gpio>, role: &str) -> crate::AResult<Pin> {
		self.bind(gpio, role, Direction::Output)
	}
}

impl ShifterConfig {
	fn bind(&self, gpio: &Arc<Gpio>, name: &str, timing: Timing) -> crate::AResult<ShiftChain> {
		ShiftChain::new(
			self.serial.output(gpio, &format!("{} serial", name))?,
			self.shift_clock.output(gpio, &format!("{} shift clock", name))?,
			self.register_clock.output(gpio, &format!("{} register clock", name))?,
			self.clear.output(gpio, &format!("{} clear", name))?,
			timing,
		)
	}
}

impl PinProfile {
	pub fn from_toml(content: &str) -> crate::AResult<PinProfile> {
		let profile: PinProfile = toml::from_str(content)
			.map_err(|e| HardwareError::configuration(format!("invalid pin profile: {}", e)))?;
		Ok(profile)
	}

	pub fn load<P: AsRef<Path>>(path: P) -> crate::AResult<PinProfile> {
		let path = path.as_ref();
		with_context!(("couldn't load pin profile {}", path.display()), {
			let content = fs::read_to_string(path)?;
			PinProfile::from_toml(&content)
		})
	}

	/// Acquire the configured backend.
	pub fn open_gpio(&self) -> crate::AResult<Arc<Gpio>> {
		let gpio = match self.gpio.backend {
			BackendKind::Gpiomem => {
				let device = &self.gpio.device;
				with_context!(("couldn't map {}", device.display()), {
					Ok(Gpio::acquire(gpio::open_gpiomem(device)?))
				})?
			},
			BackendKind::Sysfs => {
				with_context!("couldn't open sysfs GPIO interface", {
					Ok(Gpio::acquire(gpio::open_sysfs(self.gpio.chip_base)?))
				})?
			},
		};
		Ok(gpio)
	}

	/// Binds every pin and clears both shift chains.
	pub fn bind(&self, gpio: &Arc<Gpio>, timing: Timing) -> crate::AResult<MemoryDriver> {
		let data = self.data_shifter.bind(gpio, "data", timing)?;
		let address = self.address_shifter.bind(gpio, "address", timing)?;

		let read = ReadPins {
			latch: self.reader.latch.output(gpio, "read latch")?,
			shift_clock: self.reader.shift_clock.output(gpio, "read shift clock")?,
			serial_in: self.reader.serial_in.bind(gpio, "serial in", Direction::Input)?,
		};
		let write = WritePins {
			write_enable: self.writer.write_enable.output(gpio, "write enable")?,
			write_clock: self.writer.write_clock.output(gpio, "write clock")?,
		};
		let notifier = self.notifier.notify.output(gpio, "notifier")?;

		let mut driver = MemoryDriver::new(address, data, read, write, notifier, timing)?;
		driver.clear_data_register()?;
		driver.clear_address_register()?;
		Ok(driver)
	}
}
