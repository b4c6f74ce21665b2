
mod registry;

use std::fmt;

pub use registry::*;

use crate::error::{Error, Result};
use crate::event::hw::Hardware;
use crate::event::sw::Software;
use crate::ffi::bindings as b;

/// Event source of a counter, the `perf_event_attr.type` of the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Kind {
    /// Generic CPU PMU events, see [`Hardware`].
    Hardware,
    /// Kernel software events, see [`Software`].
    Software,
}

impl Kind {
    pub fn from_raw(ty: u32) -> Option<Self> {
        match ty {
            b::PERF_TYPE_HARDWARE => Some(Self::Hardware),
            b::PERF_TYPE_SOFTWARE => Some(Self::Software),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> u32 {
        match self {
            Self::Hardware => b::PERF_TYPE_HARDWARE,
            Self::Software => b::PERF_TYPE_SOFTWARE,
        }
    }

    /// Whether `code` is an event selector the kernel defines for this kind.
    pub fn knows(&self, code: u64) -> bool {
        match self {
            Self::Hardware => Hardware::from_code(code).is_some(),
            Self::Software => Software::from_code(code).is_some(),
        }
    }
}

/// A counter to attach: what to count and the label it is reported under.
///
/// Definitions are immutable, build a new one to change any part.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CounterDefinition {
    kind: Kind,
    code: u64,
    label: String,
}

impl CounterDefinition {
    pub fn new(kind: Kind, code: u64, label: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            label: label.into(),
        }
    }

    /// Builds a definition from the raw `type` and `config` values of a
    /// `perf_event_attr`, e.g. as typed on a command line.
    pub fn from_raw(ty: u32, code: u64, label: impl Into<String>) -> Result<Self> {
        let kind = Kind::from_raw(ty).ok_or(Error::UnknownCounterKind { ty, code })?;
        Ok(Self::new(kind, code, label))
    }

    pub fn hardware(event: Hardware) -> Self {
        Self::new(Kind::Hardware, event.code(), event.name())
    }

    pub fn software(event: Software) -> Self {
        Self::new(Kind::Software, event.code(), event.name())
    }

    /// Looks a generic event up by the name `perf list` gives it, e.g.
    /// `"cache-misses"` or `"page-faults"`.
    pub fn from_name(name: &str) -> Option<Self> {
        let hw = Hardware::ALL.iter().find(|it| it.name() == name);
        let sw = Software::ALL.iter().find(|it| it.name() == name);
        match (hw, sw) {
            (Some(&it), _) => Some(Self::hardware(it)),
            (_, Some(&it)) => Some(Self::software(it)),
            _ => None,
        }
    }

    /// Same event, reported under another label.
    pub fn with_label(self, label: impl Into<String>) -> Self {
        Self::new(self.kind, self.code, label)
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn code(&self) -> u64 {
        self.code
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn counts(&self, event: Hardware) -> bool {
        self.kind == Kind::Hardware && self.code == event.code()
    }
}

impl From<Hardware> for CounterDefinition {
    fn from(event: Hardware) -> Self {
        Self::hardware(event)
    }
}

impl From<Software> for CounterDefinition {
    fn from(event: Software) -> Self {
        Self::software(event)
    }
}

impl fmt::Display for CounterDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            Kind::Hardware => "hw",
            Kind::Software => "sw",
        };
        write!(f, "{} ({}:{:#x})", self.label, kind, self.code)
    }
}
