use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Instant;

/// Cancellation signal shared between the sampler and whoever stops it.
///
/// Unlike a plain sleep, [`wait_until`][Self::wait_until] returns as soon
/// as [`cancel`][Self::cancel] is called from any thread.
#[derive(Clone, Debug, Default)]
pub struct Cancel(Arc<(Mutex<bool>, Condvar)>);

impl Cancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (cancelled, cvar) = &*self.0;
        // The lock is never held across a panic, poison carries no meaning here.
        *cancelled.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        let (cancelled, _) = &*self.0;
        *cancelled.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until `deadline` or cancellation, whichever comes first.
    /// Returns whether the signal was cancelled.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let (cancelled, cvar) = &*self.0;
        let mut guard = cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if *guard {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = match cvar.wait_timeout(guard, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}
