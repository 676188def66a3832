/// Observer for long running batch operations; one unit per address or record.
pub trait Progress {
	fn start(&mut self, _total: usize) {}
	fn advance(&mut self, units: usize);
	fn finish(&mut self) {}
}

/// Ignores all progress.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
	fn advance(&mut self, _units: usize) {}
}

/// Counts units; handy to check how much work an operation did.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct CountProgress {
	pub total: usize,
	pub done: usize,
	pub finished: bool,
}

impl Progress for CountProgress {
	fn start(&mut self, total: usize) {
		self.total = total;
		self.done = 0;
		self.finished = false;
	}

	fn advance(&mut self, units: usize) {
		self.done += units;
	}

	fn finish(&mut self) {
		self.finished = true;
	}
}
