/* BCM283x GPIO register block, as exposed by /dev/gpiomem */

use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::{
	FromRawFd,
};
use std::path::Path;
use std::ptr;
use std::sync::Mutex;

use libc::{
	MAP_SHARED,
	O_CLOEXEC,
	O_RDWR,
	O_SYNC,
	PROT_READ,
	PROT_WRITE,
	c_void,
	mmap,
	munmap,
	open,
};

use crate::gpio::{
	GpioBackend,
	PIN_COUNT,
	PinMode,
};

const BLOCK_LEN: usize = 4096;

const GPFSEL0: usize = 0x00; // function select, 3 bits per line, 10 lines per register
const GPSET0: usize = 0x1c; // write 1 to drive high
const GPCLR0: usize = 0x28; // write 1 to drive low
const GPLEV0: usize = 0x34; // sampled levels

const FSEL_INPUT: u32 = 0b000;
const FSEL_OUTPUT: u32 = 0b001;

#[derive(Debug)]
pub struct Mapped {
	ptr: ptr::NonNull<u8>, // u8 instead of void for easier offset operations
	len: usize,
	// function select is read-modify-write; level registers are not
	fsel_lock: Mutex<()>,
	// keeps the device open while mapped
	_file: fs::File,
}

// SET/CLR/LEV accesses are single word writes/reads on device memory
unsafe impl Send for Mapped {}
unsafe impl Sync for Mapped {}

impl Drop for Mapped {
	fn drop(&mut self) {
		unsafe {
			let res = munmap(
				self.ptr.as_ptr() as *mut c_void,
				self.len,
			);
			if 0 != res {
				panic!("munmap failed: {}", io::Error::last_os_error());
			}
		}
	}
}

impl Mapped {
	fn read_dword(&self, offset: usize) -> u32 {
		assert!(offset & 3 == 0);
		assert!(offset + 3 < self.len);
		u32::from_le(unsafe { ptr::read_volatile(self.ptr.as_ptr().add(offset) as *const u32) })
	}

	fn write_dword(&self, offset: usize, data: u32) {
		assert!(offset & 3 == 0);
		assert!(offset + 3 < self.len);
		unsafe { ptr::write_volatile(self.ptr.as_ptr().add(offset) as *mut u32, data.to_le()) }
	}

	fn set_function(&self, line: u8, function: u32) {
		let offset = GPFSEL0 + 4 * (line as usize / 10);
		let shift = 3 * (line as u32 % 10);
		let _guard = self.fsel_lock.lock().unwrap_or_else(|e| e.into_inner());
		let fsel = self.read_dword(offset);
		self.write_dword(offset, (fsel & !(0b111 << shift)) | (function << shift));
	}

	fn drive(&self, line: u8, level: bool) {
		let register = if level { GPSET0 } else { GPCLR0 };
		self.write_dword(register, 1u32 << line);
	}
}

fn check_line(line: u8) -> io::Result<()> {
	if line >= PIN_COUNT {
		return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("no GPIO line {}", line)));
	}
	Ok(())
}

impl GpioBackend for Mapped {
	fn set_mode(&self, line: u8, mode: PinMode) -> io::Result<()> {
		check_line(line)?;
		match mode {
			PinMode::Input => self.set_function(line, FSEL_INPUT),
			PinMode::Output { initial } => {
				// latch the level first so the line comes up at it
				self.drive(line, initial);
				self.set_function(line, FSEL_OUTPUT);
			},
		}
		Ok(())
	}

	fn set_level(&self, line: u8, level: bool) -> io::Result<()> {
		check_line(line)?;
		self.drive(line, level);
		Ok(())
	}

	fn get_level(&self, line: u8) -> io::Result<bool> {
		check_line(line)?;
		Ok(0 != self.read_dword(GPLEV0) & (1u32 << line))
	}

	fn release(&self, line: u8) -> io::Result<()> {
		check_line(line)?;
		self.set_function(line, FSEL_INPUT);
		Ok(())
	}
}

// TODO: exclusive open / file locking?
pub fn inner_open(path: &Path) -> io::Result<Mapped> {
	let open_flags = O_RDWR | O_CLOEXEC | O_SYNC;
	let mmap_prot_flags = PROT_WRITE | PROT_READ;

	let path = CString::new(path.as_os_str().as_bytes())?;

	let fd = unsafe { open(path.as_ptr(), open_flags) };
	if -1 == fd {
		return Err(io::Error::last_os_error());
	}
	// now get fd managed to prevent resource leak
	let f = unsafe { fs::File::from_raw_fd(fd) };

	// character device: size isn't in the metadata
	let area = unsafe {
		mmap(
			ptr::null_mut(),
			BLOCK_LEN,
			mmap_prot_flags,
			MAP_SHARED,
			fd,
			0,
		)
	};

	if area == libc::MAP_FAILED {
		return Err(io::Error::last_os_error());
	}
	match ptr::NonNull::new(area as *mut u8) {
		None => panic!("mmap shouldn't return NULL ever"),
		Some(area) => Ok(Mapped{
			ptr: area,
			len: BLOCK_LEN,
			fsel_lock: Mutex::new(()),
			_file: f,
		}),
	}
}
