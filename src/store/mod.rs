
use std::sync::Arc;

use tracing::{debug, warn};

use crate::bind::{AttachedCounter, Binder};
use crate::error::{Error, Result};

/// Cumulative values of the attached counters, one slot per counter.
///
/// Values are maintained by the kernel and fetched from its per-event
/// counters on every [`read`][Self::read], there is no write or reset API:
/// a fresh count needs a fresh attach.
pub struct SampleStore<B: Binder> {
    binder: Arc<B>,
    counters: Vec<AttachedCounter<B::Handle>>,
    detached: bool,
}

impl<B: Binder> SampleStore<B> {
    pub(crate) fn new(binder: Arc<B>, counters: Vec<AttachedCounter<B::Handle>>) -> Self {
        Self {
            binder,
            counters,
            detached: false,
        }
    }

    /// The attached counters in slot order.
    pub fn counters(&self) -> &[AttachedCounter<B::Handle>] {
        &self.counters
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn read(&self, slot: usize) -> Result<u64> {
        let Some(counter) = self.counters.get(slot) else {
            return Err(Error::Read {
                label: format!("#{}", slot),
                source: std::io::Error::other("no such slot"),
            });
        };
        self.binder
            .read(&counter.handle)
            .map_err(|source| Error::Read {
                label: counter.definition().label().to_owned(),
                source,
            })
    }

    /// Detaches every counter in reverse attach order.
    ///
    /// Failures do not stop the teardown, they are returned as
    /// [`Shutdown`][Error::Shutdown] errors. Calls after the first one
    /// return nothing.
    pub(crate) fn detach_all(&mut self) -> Vec<Error> {
        if std::mem::replace(&mut self.detached, true) {
            return vec![];
        }

        let mut errors = vec![];
        for counter in self.counters.iter_mut().rev() {
            let label = counter.definition().label().to_owned();
            match self.binder.detach(&mut counter.handle) {
                Ok(()) => debug!(counter = %label, slot = counter.slot(), "detached"),
                Err(source) => {
                    warn!(counter = %label, error = %source, "detach failed");
                    errors.push(Error::Shutdown { label, source });
                }
            }
        }
        errors
    }
}

impl<B: Binder> Drop for SampleStore<B> {
    fn drop(&mut self) {
        // Failures are already logged and there is nobody left to report to.
        let _ = self.detach_all();
    }
}
