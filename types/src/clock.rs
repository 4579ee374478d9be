//! Time source abstraction.
//!
//! Production code uses [`SystemClock`]; tests swap in the nullable clock
//! from `poi-nullables`, which only advances when told to.

use crate::Timestamp;

/// Anything that can tell the engine what time it is.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
