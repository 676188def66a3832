use std::collections::HashMap;
use std::fs;
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{
	Path,
	PathBuf,
};
use std::sync::{
	Mutex,
	MutexGuard,
};

use crate::gpio::{
	GpioBackend,
	PIN_COUNT,
	PinMode,
};

pub struct Sysfs {
	root: PathBuf,
	// kernel number of header line 0
	chip_base: u32,
	values: Mutex<HashMap<u8, fs::File>>,
}

fn write_exact_at(file: &fs::File, buf: &[u8], offset: u64) -> io::Result<()> {
	// writing should push all data in one step (in this case)
	let l = file.write_at(buf, offset)?;
	if l != buf.len() {
		Err(io::Error::new(io::ErrorKind::Other, "failed to write whole buffer"))
	} else {
		Ok(())
	}
}

fn write_attribute(path: &Path, value: &str) -> io::Result<()> {
	let f = fs::OpenOptions::new().write(true).open(path)?;
	write_exact_at(&f, value.as_bytes(), 0)
}

impl Sysfs {
	fn gpio_name(&self, line: u8) -> String {
		format!("gpio{}", self.chip_base + line as u32)
	}

	fn line_dir(&self, line: u8) -> PathBuf {
		self.root.join(self.gpio_name(line))
	}

	fn lock(&self) -> MutexGuard<HashMap<u8, fs::File>> {
		self.values.lock().unwrap_or_else(|e| e.into_inner())
	}

	fn export(&self, line: u8) -> io::Result<()> {
		if self.line_dir(line).exists() {
			return Ok(());
		}
		let number = (self.chip_base + line as u32).to_string();
		write_attribute(&self.root.join("export"), &number)
	}

	fn with_value<F, R>(&self, line: u8, f: F) -> io::Result<R>
	where
		F: FnOnce(&fs::File) -> io::Result<R>,
	{
		let values = self.lock();
		match values.get(&line) {
			Some(file) => f(file),
			None => Err(io::Error::new(io::ErrorKind::NotFound, format!("{} not configured", self.gpio_name(line)))),
		}
	}
}

fn check_line(line: u8) -> io::Result<()> {
	if line >= PIN_COUNT {
		return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("no GPIO line {}", line)));
	}
	Ok(())
}

impl GpioBackend for Sysfs {
	fn set_mode(&self, line: u8, mode: PinMode) -> io::Result<()> {
		check_line(line)?;
		self.export(line)?;
		let dir = self.line_dir(line);
		// "high"/"low" switch to output and set the level in one step
		let direction = match mode {
			PinMode::Input => "in",
			PinMode::Output { initial: true } => "high",
			PinMode::Output { initial: false } => "low",
		};
		write_attribute(&dir.join("direction"), direction)?;

		let value = fs::OpenOptions::new()
			.read(true)
			.write(mode != PinMode::Input)
			.open(dir.join("value"))?;
		self.lock().insert(line, value);
		Ok(())
	}

	fn set_level(&self, line: u8, level: bool) -> io::Result<()> {
		let data: &[u8] = if level { b"1" } else { b"0" };
		self.with_value(line, |f| write_exact_at(f, data, 0))
	}

	fn get_level(&self, line: u8) -> io::Result<bool> {
		self.with_value(line, |f| {
			let mut buf = [0u8; 1];
			let l = f.read_at(&mut buf, 0)?;
			match (l, buf[0]) {
				(1, b'0') => Ok(false),
				(1, b'1') => Ok(true),
				_ => Err(io::Error::new(io::ErrorKind::InvalidData, "unexpected GPIO value")),
			}
		})
	}

	fn release(&self, line: u8) -> io::Result<()> {
		check_line(line)?;
		self.lock().remove(&line);
		write_attribute(&self.line_dir(line).join("direction"), "in")?;
		let number = (self.chip_base + line as u32).to_string();
		write_attribute(&self.root.join("unexport"), &number)
	}
}

pub fn inner_open<P: AsRef<Path>>(root: P, chip_base: u32) -> io::Result<Sysfs> {
	let root = root.as_ref().to_path_buf();
	// fail early if the kernel has no sysfs GPIO interface
	fs::metadata(root.join("export"))?;

	Ok(Sysfs {
		root,
		chip_base,
		values: Mutex::new(HashMap::new()),
	})
}

#[cfg(test)]
mod test {
	use std::fs;
	use std::path::PathBuf;

	use crate::gpio::{
		GpioBackend,
		PinMode,
	};

	// fake sysfs tree with already exported lines
	fn fake_root(name: &str, lines: &[u32]) -> PathBuf {
		let root = std::env::temp_dir().join(format!("pb224-sysfs-{}-{}", name, std::process::id()));
		let _ = fs::remove_dir_all(&root);
		fs::create_dir_all(&root).unwrap();
		fs::write(root.join("export"), b"").unwrap();
		fs::write(root.join("unexport"), b"").unwrap();
		for line in lines {
			let dir = root.join(format!("gpio{}", line));
			fs::create_dir_all(&dir).unwrap();
			fs::write(dir.join("direction"), b"in").unwrap();
			fs::write(dir.join("value"), b"0").unwrap();
		}
		root
	}

	#[test]
	fn output_writes_direction_and_value() {
		let root = fake_root("output", &[512 + 4]);
		let sysfs = super::inner_open(&root, 512).unwrap();
		sysfs.set_mode(4, PinMode::Output { initial: true }).unwrap();
		assert_eq!(fs::read(root.join("gpio516/direction")).unwrap(), b"high");
		sysfs.set_level(4, true).unwrap();
		assert_eq!(fs::read(root.join("gpio516/value")).unwrap(), b"1");
		assert!(sysfs.get_level(4).unwrap());
		sysfs.set_level(4, false).unwrap();
		assert!(!sysfs.get_level(4).unwrap());

		sysfs.release(4).unwrap();
		assert_eq!(fs::read(root.join("unexport")).unwrap(), b"516");
		assert!(sysfs.get_level(4).is_err());
		let _ = fs::remove_dir_all(&root);
	}

	#[test]
	fn unconfigured_line_fails() {
		let root = fake_root("unconfigured", &[]);
		let sysfs = super::inner_open(&root, 0).unwrap();
		assert!(sysfs.set_level(3, true).is_err());
		let _ = fs::remove_dir_all(&root);
	}
}
