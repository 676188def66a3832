use std::io;
use std::path::Path;

mod mapped;
mod sysfs;

use crate::gpio::GpioBackend;

pub const GPIOMEM_DEVICE: &str = "/dev/gpiomem";

// the mapping doesn't borrow `device`
pub fn open_gpiomem<P: AsRef<Path>>(device: P) -> io::Result<impl GpioBackend + 'static> {
	mapped::inner_open(device.as_ref())
}

pub fn open_sysfs(chip_base: u32) -> io::Result<impl GpioBackend + 'static> {
	sysfs::inner_open("/sys/class/gpio", chip_base)
}
