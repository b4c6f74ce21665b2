
mod cancel;
mod record;
mod sink;

use std::error::Error as _;
use std::time::{Duration, Instant, SystemTime};

pub use cancel::*;
pub use record::*;
pub use sink::*;
use tracing::{debug, warn};

use crate::bind::Binder;
use crate::config::Opts;
use crate::event::hw::Hardware;
use crate::store::SampleStore;

/// Fixed-interval polling loop over a [`SampleStore`].
///
/// The first sample is taken one interval after the loop starts, and the
/// following ones stay aligned on that cadence regardless of how long a
/// tick takes. Ticks missed because the sink was slow are skipped, not
/// replayed in a burst.
#[derive(Clone, Debug)]
pub struct Sampler {
    interval: Duration,
    max_samples: Option<u64>,
}

impl Sampler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_samples: None,
        }
    }

    pub fn from_opts(opts: &Opts) -> Self {
        Self {
            interval: opts.interval,
            max_samples: opts.max_samples,
        }
    }

    pub fn with_max_samples(mut self, max_samples: u64) -> Self {
        self.max_samples = Some(max_samples);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reads every slot once and derives the metrics.
    ///
    /// A counter that fails to read is reported as [`Value::ReadError`]
    /// in this sample only.
    pub fn tick<B: Binder>(&self, store: &SampleStore<B>, seq: u64) -> Sample {
        let timestamp = SystemTime::now();

        let readings: Vec<_> = store
            .counters()
            .iter()
            .map(|counter| {
                let label = counter.definition().label().to_owned();
                let value = match store.read(counter.slot()) {
                    Ok(count) => Value::Raw(count),
                    Err(e) => {
                        warn!(counter = %label, seq, error = %e, "read failed");
                        let reason = e.source().map_or_else(|| e.to_string(), |it| it.to_string());
                        Value::ReadError(reason)
                    }
                };
                Reading { label, value }
            })
            .collect();

        // Matched on the event, labels are free-form.
        let count_of = |event| {
            let slot = store
                .counters()
                .iter()
                .position(|it| it.definition().counts(event))?;
            readings[slot].value.raw()
        };
        let cpi = Cpi::from_counts(count_of(Hardware::CpuCycle), count_of(Hardware::Instr));

        Sample {
            seq,
            timestamp,
            readings,
            cpi,
        }
    }

    /// Samples until cancelled, until `max_samples` is reached, or until
    /// the sink stops accepting samples. Returns the number of samples emitted.
    ///
    /// Cancellation is checked right before reading and before every wait,
    /// and interrupts the wait itself, so the loop exits within one interval.
    pub fn run<B, S>(&self, store: &SampleStore<B>, sink: &mut S, cancel: &Cancel) -> u64
    where
        B: Binder,
        S: Sink + ?Sized,
    {
        let mut deadline = Instant::now() + self.interval;
        let mut seq = 0;

        loop {
            // Before sleeping, and while asleep.
            if cancel.wait_until(deadline) {
                debug!(samples = seq, "sampler cancelled");
                break;
            }
            // Before reading, a cancel landing right at the deadline still wins.
            if cancel.is_cancelled() {
                debug!(samples = seq, "sampler cancelled");
                break;
            }

            let sample = self.tick(store, seq);
            seq += 1;

            if sink.emit(sample).is_break() {
                debug!(samples = seq, "sink closed");
                break;
            }
            if self.max_samples.is_some_and(|max| seq >= max) {
                debug!(samples = seq, "sample limit reached");
                break;
            }

            deadline += self.interval;
            let now = Instant::now();
            while deadline <= now {
                deadline += self.interval;
            }
        }

        seq
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::from_opts(&Opts::default())
    }
}
