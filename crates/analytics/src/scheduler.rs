use std::fmt;
use std::time::Duration;
use tokio::runtime::Handle;

/// Work to run once a delay has elapsed.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Arms delayed callbacks that can be cancelled before they run.
pub trait Scheduler: Send + Sync {
    /// Runs `callback` after `delay`.
    ///
    /// Returns `None` when no timer could be armed (e.g. there is no async runtime);
    /// in that case the callback is dropped without running.
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> Option<TimerHandle>;
}

/// Cancels an armed timer. Dropping the handle leaves the timer running.
pub struct TimerHandle {
    cancel: Box<dyn FnOnce() + Send + 'static>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Box::new(cancel),
        }
    }

    /// Prevents the callback from running if it has not started yet.
    pub fn cancel(self) {
        (self.cancel)()
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TimerHandle")
    }
}

/// Arms timers as sleeping tasks on the current tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> Option<TimerHandle> {
        let runtime = Handle::try_current().ok()?;
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        let abort = task.abort_handle();
        Some(TimerHandle::new(move || abort.abort()))
    }
}
