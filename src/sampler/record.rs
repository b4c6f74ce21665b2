use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// One timestamped snapshot of every attached counter.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    /// Position in the stream, starting from 0.
    pub seq: u64,
    pub timestamp: SystemTime,
    /// Counter readings in slot order.
    pub readings: Vec<Reading>,
    pub cpi: Cpi,
}

impl Sample {
    /// Value of the counter reported under `label`.
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.readings
            .iter()
            .find(|it| it.label == label)
            .map(|it| &it.value)
    }

    /// Whether every counter was read successfully.
    pub fn is_complete(&self) -> bool {
        self.readings.iter().all(|it| it.value.raw().is_some())
    }
}

/// Persisted form, one sample per line:
/// `<unix seconds>.<millis> <label>=<value> ... cpi=<value>`, where a
/// failed read is `ERR` and an unavailable CPI is `NA`.
impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let since_epoch = self.timestamp.duration_since(UNIX_EPOCH).unwrap_or_default();
        write!(
            f,
            "{}.{:03}",
            since_epoch.as_secs(),
            since_epoch.subsec_millis()
        )?;
        for Reading { label, value } in &self.readings {
            write!(f, " {}={}", label, value)?;
        }
        write!(f, " cpi={}", self.cpi)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    pub label: String,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Cumulative count since attach.
    Raw(u64),
    /// The counter could not be read for this sample only.
    ReadError(String),
}

impl Value {
    pub fn raw(&self) -> Option<u64> {
        match self {
            Self::Raw(count) => Some(*count),
            Self::ReadError(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(count) => write!(f, "{}", count),
            Self::ReadError(_) => f.write_str("ERR"),
        }
    }
}

/// Cycles per instruction.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cpi {
    Value(f64),
    /// Cycles or instructions missing, unreadable or still zero.
    Unavailable,
}

impl Cpi {
    pub fn from_counts(cycles: Option<u64>, instrs: Option<u64>) -> Self {
        match (cycles, instrs) {
            (Some(cycles), Some(instrs)) if cycles > 0 && instrs > 0 => {
                Self::Value(cycles as f64 / instrs as f64)
            }
            _ => Self::Unavailable,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(cpi) => Some(*cpi),
            Self::Unavailable => None,
        }
    }
}

impl fmt::Display for Cpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(cpi) => write!(f, "{:.3}", cpi),
            Self::Unavailable => f.write_str("NA"),
        }
    }
}
