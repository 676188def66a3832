//! Simulated board for running the driver without hardware.
//!
//! Models the wiring of the memory board: 74HC595 cascades on the address and
//! data bus, the SRAM write strobe, and the 74HC165 cascade on the read path.
//! Every change of an output line is counted per line.

use std::collections::{
	BTreeMap,
	HashSet,
};
use std::io;
use std::sync::{
	Mutex,
	MutexGuard,
};

use super::{
	GpioBackend,
	PIN_COUNT,
	PinMode,
};

const WORD_BITS: u32 = 24;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ShifterLines {
	pub serial: u8,
	pub shift_clock: u8,
	pub register_clock: u8,
	pub clear: u8,
}

/// Line assignment of the simulated memory board.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BoardLines {
	pub address: ShifterLines,
	pub data: ShifterLines,
	pub latch: u8,
	pub read_clock: u8,
	pub serial_in: u8,
	pub write_enable: u8,
	pub write_clock: u8,
	pub notifier: u8,
}

impl Default for BoardLines {
	fn default() -> Self {
		BoardLines {
			data: ShifterLines { serial: 17, shift_clock: 27, register_clock: 22, clear: 23 },
			address: ShifterLines { serial: 5, shift_clock: 6, register_clock: 13, clear: 19 },
			latch: 24,
			read_clock: 25,
			serial_in: 12,
			write_enable: 16,
			write_clock: 20,
			notifier: 21,
		}
	}
}

// 74HC595 cascade; stage 0 is the output that ends up with the first shifted bit
#[derive(Debug)]
struct ShiftRegister {
	lines: ShifterLines,
	width: u32,
	stages: u64,
	outputs: u64,
}

impl ShiftRegister {
	fn mask(&self) -> u64 {
		if self.width >= 64 { !0 } else { (1u64 << self.width) - 1 }
	}

	fn edge(&mut self, line: u8, level: bool, levels: &[bool]) {
		if line == self.lines.shift_clock && level {
			let serial = levels[self.lines.serial as usize] as u64;
			self.stages = ((self.stages >> 1) | (serial << (self.width - 1))) & self.mask();
		}
		if line == self.lines.register_clock && level {
			self.outputs = self.stages;
		}
		if line == self.lines.clear && !level {
			self.stages = 0;
		}
	}
}

#[derive(Debug)]
struct Memory {
	address: usize,
	data: usize,
	latch: u8,
	read_clock: u8,
	serial_out: u8,
	write_enable: u8,
	write_clock: u8,
	cells: BTreeMap<u64, u32>,
	piso: u32,
}

impl Memory {
	fn edge(&mut self, line: u8, level: bool, levels: &[bool], registers: &[ShiftRegister]) {
		let address = registers[self.address].outputs;
		if line == self.write_clock && level && levels[self.write_enable as usize] {
			let data = registers[self.data].outputs as u32;
			self.cells.insert(address, data);
		}
		if line == self.latch && !level {
			self.piso = self.cells.get(&address).cloned().unwrap_or(0);
		}
		if line == self.read_clock && level && levels[self.latch as usize] {
			self.piso = (self.piso << 1) & ((1 << WORD_BITS) - 1);
		}
	}

	fn serial_out(&self) -> bool {
		0 != self.piso & (1 << (WORD_BITS - 1))
	}
}

#[derive(Debug)]
struct State {
	modes: [Option<PinMode>; PIN_COUNT as usize],
	levels: [bool; PIN_COUNT as usize],
	transitions: [usize; PIN_COUNT as usize],
	// every level change in the order it was driven
	edges: Vec<(u8, bool)>,
	failing: HashSet<u8>,
	registers: Vec<ShiftRegister>,
	memory: Option<Memory>,
}

impl State {
	fn check(&self, line: u8) -> io::Result<()> {
		if line >= PIN_COUNT {
			return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("no such line {}", line)));
		}
		if self.failing.contains(&line) {
			return Err(io::Error::new(io::ErrorKind::Other, "simulated line failure"));
		}
		Ok(())
	}

	fn drive(&mut self, line: u8, level: bool) {
		if self.levels[line as usize] == level {
			return;
		}
		self.levels[line as usize] = level;
		self.transitions[line as usize] += 1;
		self.edges.push((line, level));

		for register in self.registers.iter_mut() {
			register.edge(line, level, &self.levels);
		}
		if let Some(memory) = self.memory.as_mut() {
			memory.edge(line, level, &self.levels, &self.registers);
		}
	}

	fn sample(&self, line: u8) -> bool {
		match &self.memory {
			Some(memory) if memory.serial_out == line => memory.serial_out(),
			_ => self.levels[line as usize],
		}
	}
}

#[derive(Debug)]
pub struct SimGpio {
	state: Mutex<State>,
}

impl SimGpio {
	/// bare lines without any attached chips
	pub fn new() -> Self {
		SimGpio {
			state: Mutex::new(State {
				modes: [None; PIN_COUNT as usize],
				levels: [false; PIN_COUNT as usize],
				transitions: [0; PIN_COUNT as usize],
				edges: Vec::new(),
				failing: HashSet::new(),
				registers: Vec::new(),
				memory: None,
			}),
		}
	}

	/// full memory board: 16-bit address bus, 24-bit data bus, SRAM and read-back cascade
	pub fn board(lines: &BoardLines) -> Self {
		let sim = SimGpio::new();
		let address = sim.attach_shift_register(lines.address, 16);
		let data = sim.attach_shift_register(lines.data, WORD_BITS);
		sim.lock().memory = Some(Memory {
			address,
			data,
			latch: lines.latch,
			read_clock: lines.read_clock,
			serial_out: lines.serial_in,
			write_enable: lines.write_enable,
			write_clock: lines.write_clock,
			cells: BTreeMap::new(),
			piso: 0,
		});
		sim
	}

	fn lock(&self) -> MutexGuard<State> {
		self.state.lock().unwrap_or_else(|e| e.into_inner())
	}

	/// returns the index to query the parallel outputs with
	pub fn attach_shift_register(&self, lines: ShifterLines, width: u32) -> usize {
		assert!(width > 0 && width <= 64);
		let mut state = self.lock();
		state.registers.push(ShiftRegister {
			lines,
			width,
			stages: 0,
			outputs: 0,
		});
		state.registers.len() - 1
	}

	/// parallel outputs of a shift register; bit `i` is output `i`
	pub fn parallel_outputs(&self, register: usize) -> u64 {
		self.lock().registers[register].outputs
	}

	pub fn memory(&self, address: u64) -> Option<u32> {
		self.lock().memory.as_ref().and_then(|m| m.cells.get(&address).cloned())
	}

	pub fn poke(&self, address: u64, data: u32) {
		if let Some(memory) = self.lock().memory.as_mut() {
			memory.cells.insert(address, data & ((1 << WORD_BITS) - 1));
		}
	}

	pub fn level(&self, line: u8) -> bool {
		self.lock().levels[line as usize]
	}

	pub fn mode(&self, line: u8) -> Option<PinMode> {
		self.lock().modes[line as usize]
	}

	/// level changes driven on `line` since it was configured
	pub fn transitions(&self, line: u8) -> usize {
		self.lock().transitions[line as usize]
	}

	/// all level changes on outputs so far, in order, as `(line, new level)`
	pub fn edges(&self) -> Vec<(u8, bool)> {
		self.lock().edges.clone()
	}

	/// set the level an input line samples as
	pub fn set_input(&self, line: u8, level: bool) {
		self.lock().levels[line as usize] = level;
	}

	/// make every access to `line` fail from now on
	pub fn fail_line(&self, line: u8) {
		self.lock().failing.insert(line);
	}
}

impl Default for SimGpio {
	fn default() -> Self {
		SimGpio::new()
	}
}

impl GpioBackend for SimGpio {
	fn set_mode(&self, line: u8, mode: PinMode) -> io::Result<()> {
		let mut state = self.lock();
		state.check(line)?;
		state.modes[line as usize] = Some(mode);
		state.transitions[line as usize] = 0;
		if let PinMode::Output { initial } = mode {
			state.levels[line as usize] = initial;
		}
		Ok(())
	}

	fn set_level(&self, line: u8, level: bool) -> io::Result<()> {
		let mut state = self.lock();
		state.check(line)?;
		state.drive(line, level);
		Ok(())
	}

	fn get_level(&self, line: u8) -> io::Result<bool> {
		let state = self.lock();
		state.check(line)?;
		Ok(state.sample(line))
	}

	fn release(&self, line: u8) -> io::Result<()> {
		let mut state = self.lock();
		state.check(line)?;
		state.modes[line as usize] = None;
		Ok(())
	}
}
