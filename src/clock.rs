//! Monotonic time source for animation frames.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Monotonic time since an arbitrary process-wide epoch.
fn monotonic_time() -> Duration {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed()
}

/// Shareable lazy clock.
///
/// The clock will fetch the time once and then retain it until explicitly
/// cleared with [`Clock::clear`], so every read within a single frame
/// callback observes the same timestamp.
///
/// Clones share the underlying time; a clock created through
/// [`Clock::with_time`] never fetches on its own, which makes frame timing
/// fully deterministic in tests.
#[derive(Debug, Default, Clone)]
pub struct Clock {
    inner: Rc<RefCell<LazyClock>>,
}

#[derive(Debug, Default)]
struct LazyClock {
    time: Option<Duration>,
}

impl Clock {
    /// Creates a clock that lazily reads monotonic time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock pinned at the given time.
    pub fn with_time(time: Duration) -> Self {
        Self {
            inner: Rc::new(RefCell::new(LazyClock { time: Some(time) })),
        }
    }

    /// Returns the current time.
    pub fn now(&self) -> Duration {
        let mut inner = self.inner.borrow_mut();
        *inner.time.get_or_insert_with(monotonic_time)
    }

    /// Sets the stored time.
    pub fn set(&mut self, time: Duration) {
        self.inner.borrow_mut().time = Some(time);
    }

    /// Moves the stored time forward.
    pub fn advance(&mut self, delta: Duration) {
        let now = self.now();
        self.set(now + delta);
    }

    /// Clears the stored time so it's re-fetched again next.
    pub fn clear(&mut self) {
        self.inner.borrow_mut().time = None;
    }
}

impl PartialEq for Clock {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Clock {}
