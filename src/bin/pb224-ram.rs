#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate pb224_ram;
use pb224_ram::*;

use std::fs;
use std::process::exit;

use failure::ResultExt;

use pb224_ram::config::PinProfile;
use pb224_ram::gpio::Timing;
use pb224_ram::hex::{
	ADDRESS_DIGITS,
	HexWord,
};
use pb224_ram::sram::{
	MemoryDriver,
	Progress,
	WORD_BITS,
};

const DEFAULT_CONFIG: &str = "/etc/pb224-ram.toml";

/// Logs every 10% of a batch operation.
struct LogProgress {
	what: &'static str,
	total: usize,
	done: usize,
	reported: usize,
}

impl LogProgress {
	fn new(what: &'static str) -> Self {
		LogProgress {
			what,
			total: 0,
			done: 0,
			reported: 0,
		}
	}
}

impl Progress for LogProgress {
	fn start(&mut self, total: usize) {
		self.total = total;
		self.done = 0;
		self.reported = 0;
		info!("{}: {} addresses", self.what, total);
	}

	fn advance(&mut self, units: usize) {
		self.done += units;
		if self.total == 0 {
			return;
		}
		let percent = self.done * 100 / self.total;
		if percent >= self.reported + 10 {
			self.reported = percent - percent % 10;
			info!("{}: {}% ({}/{})", self.what, self.reported, self.done, self.total);
		}
	}
}

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid parameter {}: {}", name, e);
		e.context(msg).into()
	})
}

fn get_address(matches: &clap::ArgMatches, name: &str) -> AResult<HexWord> {
	let address: HexWord = get_param(matches, name)?;
	Ok(address.with_digits(ADDRESS_DIGITS).with_context(|e| format!("invalid parameter {}: {}", name, e))?)
}

fn open_driver(matches: &clap::ArgMatches) -> AResult<MemoryDriver> {
	let path = matches.value_of("config").unwrap_or(DEFAULT_CONFIG);
	let profile = PinProfile::load(path)?;
	let gpio = profile.open_gpio()?;
	profile.bind(&gpio, Timing::default())
}

/// Returns the exit code.
fn main_app() -> AResult<i32> {
	let matches = clap_app!(@app (app_from_crate!())
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(setting: clap::AppSettings::SubcommandRequiredElseHelp)
		(@arg config: -c --config +takes_value +global "Pin profile (TOML, default /etc/pb224-ram.toml)")
		(@subcommand write =>
			(about: "Write a single memory word")
			(@arg address: +required "Address (e.g. 0x1000)")
			(@arg data: +required "Data word (e.g. 0x3400aa)")
		)
		(@subcommand read =>
			(about: "Read a single memory word")
			(@arg address: +required "Address (e.g. 0x1000)")
		)
		(@subcommand load =>
			(about: "Write a program file into memory and verify the checksums")
			(@arg hexfile: +required "Program file (one record per line)")
			(@arg no_verify: --("no-verify") "Skip reading back the written data")
		)
		(@subcommand dump =>
			(about: "Read all rows covering an address range")
			(@arg lower: +required "Lower address")
			(@arg upper: +required "Upper address")
		)
		(@subcommand clear =>
			(about: "Clear address and data registers")
		)
	).get_matches();

	match matches.subcommand() {
		("write", Some(m)) => {
			let address = get_address(m, "address")?;
			let data: HexWord = get_param(m, "data")?;
			let data = data.with_digits(WORD_BITS / 4).with_context(|e| format!("invalid parameter data: {}", e))?;
			let mut driver = open_driver(m)?;
			driver.write_single_address(&address, &data)?;
			println!("{}: {}", address, data);
		},
		("read", Some(m)) => {
			let address = get_address(m, "address")?;
			let mut driver = open_driver(m)?;
			let data = driver.read_single_address(&address)?;
			println!("{}: {}", address, data);
		},
		("load", Some(m)) => {
			let path = m.value_of("hexfile").unwrap_or_default();
			let text = fs::read_to_string(path).with_context(|e| format!("couldn't read program {}: {}", path, e))?;
			let records = hex::parse_program(&text).with_context(|e| format!("couldn't load program {}: {}", path, e))?;
			let first = match records.first() {
				Some(r) => r.clone(),
				None => bail!("program {} contains no data records", path),
			};

			let mut driver = open_driver(m)?;
			let checksums = driver.dump_program(&records, &mut LogProgress::new("write"))?;
			if m.is_present("no_verify") {
				return Ok(0);
			}
			let report = driver.verify_checksums(
				&checksums,
				&first.byte_count(),
				&first.record_type(),
				&mut LogProgress::new("verify"),
			);
			print!("{}", report);
			if !report.passed() {
				error!("{} of {} addresses failed verification", report.failures().count(), report.entries.len());
				return Ok(2);
			}
		},
		("dump", Some(m)) => {
			let lower = get_address(m, "lower")?;
			let upper = get_address(m, "upper")?;
			let mut driver = open_driver(m)?;
			let report = driver.bulk_read(&lower, &upper, &mut LogProgress::new("read"))?;
			print!("{}", report);
		},
		("clear", Some(m)) => {
			// binding the profile clears both chains
			let _driver = open_driver(m)?;
			info!("address and data registers cleared");
		},
		_ => unreachable!(),
	}

	Ok(0)
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	match main_app() {
		Ok(0) => (),
		Ok(code) => exit(code),
		Err(e) => {
			error!("Error: {}", e);
			exit(1);
		},
	}
}
