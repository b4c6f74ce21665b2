#[cfg(test)]
pub(crate) mod mock;

mod perf;

use std::io;

pub use perf::*;
use tracing::{debug, warn};

use crate::config::Proc;
use crate::counter::CounterDefinition;
use crate::error::Result;

/// Binds counter definitions to a target process.
///
/// This is the only place that talks to the kernel counter subsystem,
/// [`PerfBinder`] is the `perf_event_open` implementation.
pub trait Binder: Send + Sync + 'static {
    /// Kernel resources of one attached counter.
    type Handle: Send + 'static;

    /// Starts counting `def` on every thread of `target`.
    ///
    /// Fails with [`Permission`][crate::Error::Permission] if the caller
    /// may not observe the target, or [`Attach`][crate::Error::Attach]
    /// for any other rejection.
    fn attach(&self, target: Proc, def: &CounterDefinition) -> Result<Self::Handle>;

    /// Current cumulative value of the counter.
    fn read(&self, handle: &Self::Handle) -> io::Result<u64>;

    /// Releases the kernel resources behind `handle`.
    ///
    /// Must be idempotent: detaching a handle twice is a no-op the second time.
    fn detach(&self, handle: &mut Self::Handle) -> io::Result<()>;
}

/// A counter bound to the target, owned by the session that attached it.
#[derive(Debug)]
pub struct AttachedCounter<H> {
    definition: CounterDefinition,
    pub(crate) handle: H,
    slot: usize,
}

impl<H> AttachedCounter<H> {
    pub fn definition(&self) -> &CounterDefinition {
        &self.definition
    }

    /// Index of the counter in its [`SampleStore`][crate::store::SampleStore].
    pub fn slot(&self) -> usize {
        self.slot
    }
}

/// Attaches every definition in order, all or nothing.
///
/// On the first failure, handles obtained so far are detached in reverse
/// order and the failure is returned as is.
pub fn attach_all<B>(
    binder: &B,
    target: Proc,
    definitions: &[CounterDefinition],
) -> Result<Vec<AttachedCounter<B::Handle>>>
where
    B: Binder + ?Sized,
{
    let mut attached: Vec<AttachedCounter<B::Handle>> = Vec::with_capacity(definitions.len());

    for (slot, def) in definitions.iter().enumerate() {
        match binder.attach(target, def) {
            Ok(handle) => {
                debug!(counter = def.label(), slot, pid = %target, "attached");
                attached.push(AttachedCounter {
                    definition: def.clone(),
                    handle,
                    slot,
                });
            }
            Err(e) => {
                warn!(
                    counter = def.label(),
                    pid = %target,
                    error = %e,
                    rollback = attached.len(),
                    "attach failed",
                );
                for mut it in attached.into_iter().rev() {
                    if let Err(e) = binder.detach(&mut it.handle) {
                        warn!(counter = it.definition.label(), error = %e, "rollback detach failed");
                    }
                }
                return Err(e);
            }
        }
    }

    Ok(attached)
}
