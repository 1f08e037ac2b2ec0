//! Frame scheduling: the seam to the host's display loop, and the driver
//! object that keeps a session scheduled until it settles.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::clock::Clock;
use crate::config::{ConfigError, SpringDesc};
use crate::session::{MotionEvent, Session};
use crate::value::Value;

/// A callback to run once before the next display repaint.
pub type FrameCallback = Box<dyn FnOnce()>;

/// Identifies a pending frame callback so it can be revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Host-provided scheduling primitive.
///
/// The host invokes each scheduled callback exactly once, before the next
/// display repaint, unless it was cancelled first. Callbacks for one driver
/// never overlap: a new frame is only scheduled after the previous callback
/// finishes.
pub trait FrameScheduler {
    fn schedule(&self, callback: FrameCallback) -> FrameHandle;
    fn cancel(&self, handle: FrameHandle);
}

/// A scheduler fired by hand.
///
/// Useful in tests and in embedders that own their frame loop: collect
/// callbacks here and run [`fire`](Self::fire) once per display frame.
#[derive(Default, Clone)]
pub struct ManualScheduler {
    inner: Rc<RefCell<ManualInner>>,
}

#[derive(Default)]
struct ManualInner {
    next_handle: u64,
    pending: Vec<(FrameHandle, FrameCallback)>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callbacks waiting to run.
    pub fn pending(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Runs the oldest pending callback. Returns false when none are
    /// pending. A callback may schedule a new frame while running; that
    /// frame waits for the next `fire`.
    pub fn fire(&self) -> bool {
        let callback = {
            let mut inner = self.inner.borrow_mut();
            if inner.pending.is_empty() {
                return false;
            }
            inner.pending.remove(0).1
        };
        callback();
        true
    }
}

impl FrameScheduler for ManualScheduler {
    fn schedule(&self, callback: FrameCallback) -> FrameHandle {
        let mut inner = self.inner.borrow_mut();
        let handle = FrameHandle(inner.next_handle);
        inner.next_handle += 1;
        inner.pending.push((handle, callback));
        handle
    }

    fn cancel(&self, handle: FrameHandle) {
        let mut inner = self.inner.borrow_mut();
        inner.pending.retain(|(h, _)| *h != handle);
    }
}

/// Owns a [`Session`] and keeps it scheduled against a [`FrameScheduler`]
/// until the animation settles.
///
/// Each frame callback runs one [`Session::frame`], forwards the emitted
/// events to the sink installed with [`on_event`](Self::on_event), and
/// schedules the next frame only if the session still wants one, so no
/// backlog of callbacks can build up. Dropping the driver cancels its
/// pending callback; a frame never runs against destroyed state.
///
/// The clock is read once per callback; the embedder is responsible for
/// keeping it fresh (for a lazy [`Clock`], by clearing it once per display
/// frame before dispatching callbacks).
pub struct Motion {
    inner: Rc<RefCell<Inner>>,
}

struct Inner {
    session: Session,
    clock: Clock,
    scheduler: Rc<dyn FrameScheduler>,
    pending: Option<FrameHandle>,
    sink: Option<Box<dyn FnMut(MotionEvent)>>,
}

impl Motion {
    /// Creates a driver at rest at `target` and schedules its first frame.
    pub fn new(
        target: Value,
        spring: impl Into<SpringDesc>,
        scheduler: Rc<dyn FrameScheduler>,
        clock: Clock,
    ) -> Self {
        let now = clock.now();
        let inner = Rc::new(RefCell::new(Inner {
            session: Session::new(target, spring, now),
            clock,
            scheduler,
            pending: None,
            sink: None,
        }));
        Self::ensure_scheduled(&inner);
        Self { inner }
    }

    /// Installs the event sink consuming Start/End/Restart notifications.
    pub fn on_event(&self, sink: impl FnMut(MotionEvent) + 'static) {
        self.inner.borrow_mut().sink = Some(Box::new(sink));
    }

    /// Points the animation at a new target and makes sure a frame is
    /// scheduled.
    pub fn set_target(&self, target: Value) {
        {
            let mut inner = self.inner.borrow_mut();
            let now = inner.clock.now();
            inner.session.on_target_changed(target, now);
        }
        Self::ensure_scheduled(&self.inner);
    }

    /// Replaces the spring selection, failing fast on invalid input.
    pub fn set_spring(&self, spring: impl Into<SpringDesc>) -> Result<(), ConfigError> {
        self.inner.borrow_mut().session.set_spring(spring)
    }

    /// The interpolated values as of the last completed frame.
    pub fn value(&self) -> Value {
        self.inner.borrow().session.current().clone()
    }

    /// The interpolated velocities as of the last completed frame.
    pub fn velocities(&self) -> Value {
        self.inner.borrow().session.velocities().clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.borrow().session.is_running()
    }

    fn ensure_scheduled(inner_rc: &Rc<RefCell<Inner>>) {
        let mut inner = inner_rc.borrow_mut();
        if inner.pending.is_some() {
            return;
        }

        let weak: Weak<RefCell<Inner>> = Rc::downgrade(inner_rc);
        let handle = inner.scheduler.schedule(Box::new(move || {
            // The owner may have been torn down between scheduling and
            // dispatch even without a cancel; never touch dead state.
            if let Some(inner_rc) = weak.upgrade() {
                Self::run_frame(&inner_rc);
            }
        }));
        inner.pending = Some(handle);
    }

    fn run_frame(inner_rc: &Rc<RefCell<Inner>>) {
        let mut inner = inner_rc.borrow_mut();
        inner.pending = None;

        let now = inner.clock.now();
        let events = match inner.session.frame(now) {
            Ok(events) => events,
            Err(err) => {
                // Contract violation (e.g. a preset deleted while in use);
                // stop driving rather than spinning on the error.
                warn!("animation frame failed: {err}");
                return;
            }
        };
        let running = inner.session.is_running();

        // The sink may call back into this driver; release the borrow and
        // keep the sink out of `inner` while it runs.
        let mut sink = inner.sink.take();
        drop(inner);

        if let Some(sink) = &mut sink {
            for event in events {
                sink(event);
            }
        }

        {
            let mut inner = inner_rc.borrow_mut();
            if inner.sink.is_none() {
                inner.sink = sink;
            }
        }

        if running {
            Self::ensure_scheduled(inner_rc);
        }
    }
}

impl Drop for Motion {
    fn drop(&mut self) {
        let mut inner = self.inner.borrow_mut();
        if let Some(handle) = inner.pending.take() {
            inner.scheduler.cancel(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::NO_WOBBLE;

    const FRAME: Duration = Duration::from_nanos(16_666_667);

    fn harness() -> (Rc<ManualScheduler>, Clock) {
        (
            Rc::new(ManualScheduler::new()),
            Clock::with_time(Duration::from_secs(1)),
        )
    }

    #[test]
    fn settled_motion_stops_scheduling() {
        let (scheduler, clock) = harness();
        let motion = Motion::new(Value::Number(3.), NO_WOBBLE, scheduler.clone(), clock);

        // The initial frame observes a settled session and does not
        // reschedule.
        assert_eq!(scheduler.pending(), 1);
        assert!(scheduler.fire());
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(motion.value(), Value::Number(3.));
    }

    #[test]
    fn drives_to_target_and_stops() {
        let (scheduler, mut clock) = harness();
        let motion = Motion::new(
            Value::Number(0.),
            NO_WOBBLE,
            scheduler.clone(),
            clock.clone(),
        );

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink_events = events.clone();
        motion.on_event(move |event| sink_events.borrow_mut().push(event));

        // Settle the initial frame, then launch an excursion.
        scheduler.fire();
        motion.set_target(Value::Number(10.));
        assert_eq!(scheduler.pending(), 1);

        let mut frames = 0;
        loop {
            clock.advance(FRAME);
            if !scheduler.fire() {
                break;
            }
            frames += 1;
            assert!(frames < 1000, "animation failed to settle");
        }

        assert_eq!(motion.value(), Value::Number(10.));
        assert!(!motion.is_running());

        let events = events.borrow();
        assert_eq!(events.first(), Some(&MotionEvent::Start));
        assert_eq!(events.last(), Some(&MotionEvent::End));
        let ends = events.iter().filter(|e| **e == MotionEvent::End).count();
        assert_eq!(ends, 1);
    }

    #[test]
    fn restart_keeps_the_loop_alive() {
        let (scheduler, mut clock) = harness();
        let motion = Motion::new(
            Value::Number(0.),
            NO_WOBBLE,
            scheduler.clone(),
            clock.clone(),
        );
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink_events = events.clone();
        motion.on_event(move |event| sink_events.borrow_mut().push(event));

        scheduler.fire();
        motion.set_target(Value::Number(10.));
        clock.advance(FRAME);
        scheduler.fire();

        // A long suspension: the frame only emits Restart but stays
        // scheduled.
        clock.advance(Duration::from_secs(5));
        scheduler.fire();
        assert!(events.borrow().contains(&MotionEvent::Restart));
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn drop_cancels_pending_frame() {
        let (scheduler, clock) = harness();
        let motion = Motion::new(Value::Number(0.), NO_WOBBLE, scheduler.clone(), clock);
        motion.set_target(Value::Number(10.));
        assert_eq!(scheduler.pending(), 1);

        drop(motion);
        assert_eq!(scheduler.pending(), 0);
        // Nothing left to run.
        assert!(!scheduler.fire());
    }

    #[test]
    fn cancelled_handle_does_not_fire() {
        let scheduler = ManualScheduler::new();
        let ran = Rc::new(RefCell::new(false));

        let flag = ran.clone();
        let first = scheduler.schedule(Box::new(move || *flag.borrow_mut() = true));
        let flag = ran.clone();
        let _second = scheduler.schedule(Box::new(move || *flag.borrow_mut() = true));

        scheduler.cancel(first);
        assert_eq!(scheduler.pending(), 1);
        scheduler.fire();
        assert!(*ran.borrow());
    }
}
