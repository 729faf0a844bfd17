//! Re-armable one-shot timers.
//!
//! The engine owns two of these: the scheduler tick and the transaction
//! timeout. Both are re-armed with a fresh delay on every use rather than
//! left free-running, so the tick can honor the variable next-update delay
//! and the timeout can restart per retry.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Callback invoked when a timer fires.
pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

/// A single-purpose re-armable one-shot timer.
///
/// `arm` replaces any previously armed deadline. `cancel` is idempotent and
/// safe to call after the timer has fired or was never armed.
pub trait Timer: Send + Sync {
    /// Arms (or re-arms) the timer to fire once after `after`.
    fn arm(&self, after: Duration);

    /// Disarms the timer if armed.
    fn cancel(&self);
}

/// Creates the timers the engine needs.
///
/// Production code uses [`ThreadTimers`]; tests use [`ManualTimers`] to
/// drive firings against simulated time.
pub trait TimerFactory {
    /// Creates a timer that invokes `on_fire` whenever it expires.
    fn create(&self, label: &str, on_fire: TimerCallback) -> Arc<dyn Timer>;
}

struct TimerState {
    deadline: Option<Instant>,
    shutdown: bool,
}

struct TimerShared {
    state: Mutex<TimerState>,
    wakeup: Condvar,
    on_fire: TimerCallback,
}

/// A timer backed by a dedicated thread.
///
/// The callback runs on the timer thread with no timer-internal lock held,
/// so it is free to take the engine lock and to re-arm or cancel this timer.
pub struct ThreadTimer {
    shared: Arc<TimerShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadTimer {
    /// Spawns the timer thread.
    pub fn new(label: &str, on_fire: TimerCallback) -> Self {
        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState {
                deadline: None,
                shutdown: false,
            }),
            wakeup: Condvar::new(),
            on_fire,
        });

        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name(format!("timer-{label}"))
            .spawn(move || run_timer(&worker_shared))
            .ok();

        Self {
            shared,
            worker: Mutex::new(worker),
        }
    }
}

fn run_timer(shared: &TimerShared) {
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            return;
        }
        match state.deadline {
            None => {
                shared.wakeup.wait(&mut state);
            }
            Some(deadline) => {
                if Instant::now() >= deadline {
                    state.deadline = None;
                    drop(state);
                    (shared.on_fire)();
                    state = shared.state.lock();
                } else {
                    shared.wakeup.wait_until(&mut state, deadline);
                }
            }
        }
    }
}

impl Timer for ThreadTimer {
    fn arm(&self, after: Duration) {
        let mut state = self.shared.state.lock();
        state.deadline = Some(Instant::now() + after);
        self.shared.wakeup.notify_one();
    }

    fn cancel(&self) {
        let mut state = self.shared.state.lock();
        state.deadline = None;
        self.shared.wakeup.notify_one();
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            self.shared.wakeup.notify_one();
        }
        if let Some(worker) = self.worker.lock().take() {
            // Joining from the timer's own callback would deadlock.
            if worker.thread().id() != std::thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

/// Factory for [`ThreadTimer`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadTimers;

impl TimerFactory for ThreadTimers {
    fn create(&self, label: &str, on_fire: TimerCallback) -> Arc<dyn Timer> {
        Arc::new(ThreadTimer::new(label, on_fire))
    }
}

/// A timer fired by hand, for tests with simulated time.
pub struct ManualTimer {
    on_fire: TimerCallback,
    armed: Mutex<Option<Duration>>,
    history: Mutex<Vec<Duration>>,
}

impl ManualTimer {
    fn new(on_fire: TimerCallback) -> Self {
        Self {
            on_fire,
            armed: Mutex::new(None),
            history: Mutex::new(Vec::new()),
        }
    }

    /// The currently armed delay, if any.
    pub fn armed(&self) -> Option<Duration> {
        *self.armed.lock()
    }

    /// Every delay this timer has ever been armed with, oldest first.
    pub fn arm_history(&self) -> Vec<Duration> {
        self.history.lock().clone()
    }

    /// Fires the timer if it is armed. Returns whether it fired.
    pub fn fire(&self) -> bool {
        if self.armed.lock().take().is_none() {
            return false;
        }
        (self.on_fire)();
        true
    }
}

impl Timer for ManualTimer {
    fn arm(&self, after: Duration) {
        *self.armed.lock() = Some(after);
        self.history.lock().push(after);
    }

    fn cancel(&self) {
        *self.armed.lock() = None;
    }
}

/// Factory that hands out [`ManualTimer`]s and keeps them addressable by
/// label so a test can fire them.
#[derive(Default)]
pub struct ManualTimers {
    timers: Mutex<Vec<(String, Arc<ManualTimer>)>>,
}

impl ManualTimers {
    /// Creates an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the timer created under `label`, if any.
    pub fn get(&self, label: &str) -> Option<Arc<ManualTimer>> {
        self.timers
            .lock()
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, timer)| Arc::clone(timer))
    }
}

impl TimerFactory for ManualTimers {
    fn create(&self, label: &str, on_fire: TimerCallback) -> Arc<dyn Timer> {
        let timer = Arc::new(ManualTimer::new(on_fire));
        self.timers
            .lock()
            .push((label.to_string(), Arc::clone(&timer)));
        timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[test]
    fn thread_timer_fires_once() {
        let (tx, rx) = mpsc::channel();
        let timer = ThreadTimer::new(
            "test",
            Arc::new(move || {
                let _ = tx.send(());
            }),
        );

        timer.arm(Duration::from_millis(5));
        rx.recv_timeout(Duration::from_secs(1)).unwrap();

        // One-shot: no second firing without re-arming.
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn thread_timer_cancel_is_idempotent() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&fired);
        let timer = ThreadTimer::new(
            "test",
            Arc::new(move || {
                counted.fetch_add(1, Ordering::SeqCst);
            }),
        );

        timer.cancel();
        timer.arm(Duration::from_secs(60));
        timer.cancel();
        timer.cancel();

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn thread_timer_rearm_replaces_deadline() {
        let (tx, rx) = mpsc::channel();
        let timer = ThreadTimer::new(
            "test",
            Arc::new(move || {
                let _ = tx.send(Instant::now());
            }),
        );

        timer.arm(Duration::from_secs(60));
        timer.arm(Duration::from_millis(5));
        rx.recv_timeout(Duration::from_secs(1)).unwrap();
    }

    #[test]
    fn manual_timer_drives_by_hand() {
        let fired = Arc::new(AtomicUsize::new(0));
        let factory = ManualTimers::new();

        let counted = Arc::clone(&fired);
        let timer = factory.create(
            "tick",
            Arc::new(move || {
                counted.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let handle = factory.get("tick").unwrap();
        assert!(!handle.fire(), "unarmed timer must not fire");

        timer.arm(Duration::from_millis(100));
        assert_eq!(handle.armed(), Some(Duration::from_millis(100)));
        assert!(handle.fire());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(handle.armed(), None);

        timer.arm(Duration::from_millis(250));
        timer.cancel();
        assert!(!handle.fire());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(
            handle.arm_history(),
            vec![Duration::from_millis(100), Duration::from_millis(250)]
        );
    }
}
