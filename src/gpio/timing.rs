use std::thread;
use std::time::{
	Duration,
	Instant,
};

// the shift registers have no common clock; every edge needs this much time to settle
const SETTLE: Duration = Duration::from_millis(50);
const HOLD: Duration = Duration::from_millis(50);
const BLINK: Duration = Duration::from_millis(500);

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Timing {
	/// wait between two transitions on the bus
	pub settle: Duration,
	/// how long a pulse stays asserted
	pub hold: Duration,
	/// on/off period of the notifier after a successful verification
	pub blink: Duration,
}

impl Timing {
	/// no delays at all; only useful against the simulated board
	pub fn immediate() -> Self {
		Timing {
			settle: Duration::from_millis(0),
			hold: Duration::from_millis(0),
			blink: Duration::from_millis(0),
		}
	}

	pub fn settle(&self) {
		reliable_sleep(self.settle);
	}
}

impl Default for Timing {
	fn default() -> Self {
		Timing {
			settle: SETTLE,
			hold: HOLD,
			blink: BLINK,
		}
	}
}
