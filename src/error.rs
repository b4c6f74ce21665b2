use std::io;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown counter kind: type {ty}, code {code:#x}")]
    UnknownCounterKind { ty: u32, code: u64 },

    #[error("invalid counter label: {label:?}")]
    InvalidLabel { label: String },

    #[error("duplicate counter `{label}`")]
    DuplicateCounter { label: String },

    #[error("invalid sampling interval: {0:?}")]
    InvalidInterval(Duration),

    #[error("insufficient privilege to observe `{label}` on pid {pid}")]
    Permission {
        label: String,
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("kernel rejected `{label}` on pid {pid}")]
    Attach {
        label: String,
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("failed to read `{label}`")]
    Read {
        label: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to detach `{label}`")]
    Shutdown {
        label: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to start the sampler thread")]
    Spawn(#[source] io::Error),

    #[error("session is closed")]
    Closed,

    #[error("session is already open")]
    AlreadyOpen,
}

impl Error {
    /// Whether the error comes from the counter set itself rather than the kernel.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownCounterKind { .. }
                | Self::InvalidLabel { .. }
                | Self::DuplicateCounter { .. }
                | Self::InvalidInterval(_)
        )
    }

    // https://man7.org/linux/man-pages/man2/perf_event_open.2.html#ERRORS
    pub(crate) fn from_attach(label: &str, pid: u32, source: io::Error) -> Self {
        let label = label.to_owned();
        match source.raw_os_error() {
            Some(libc::EACCES | libc::EPERM) => Self::Permission { label, pid, source },
            _ => Self::Attach { label, pid, source },
        }
    }
}
