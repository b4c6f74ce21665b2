use std::time::Duration;

use crate::error::{Error, Result};

pub(crate) mod attr;
mod target;

pub use target::*;

/// Session options.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Opts {
    /// Time between two samples.
    ///
    /// Defaults to one second, zero is rejected when the session opens.
    pub interval: Duration,

    /// Stop sampling after this many samples have been emitted.
    ///
    /// `None` (the default) keeps sampling until the session is stopped.
    pub max_samples: Option<u64>,

    /// Exclude events with privilege levels.
    pub exclude: Exclude,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_samples: None,
            exclude: Exclude::default(),
        }
    }
}

impl Opts {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::InvalidInterval(self.interval));
        }
        Ok(())
    }
}

/// Privilege levels to leave out of the counts.
///
/// Unprivileged users usually need [`kernel`][Self::kernel] set when
/// `/proc/sys/kernel/perf_event_paranoid` is 2 or higher.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Exclude {
    /// Kernel space.
    pub kernel: bool,

    /// Hypervisor.
    pub hv: bool,
}
