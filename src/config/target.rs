use std::fmt;

/// Target process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Proc(pub u32);

impl Proc {
    /// The calling process.
    pub const CURRENT: Proc = Proc(0);

    /// Resolves [`CURRENT`][Self::CURRENT] to the real pid so that
    /// `/proc/<pid>` lookups work.
    pub fn pid(&self) -> u32 {
        match self.0 {
            0 => std::process::id(),
            pid => pid,
        }
    }
}

impl From<u32> for Proc {
    fn from(pid: u32) -> Self {
        Proc(pid)
    }
}

impl fmt::Display for Proc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pid())
    }
}
