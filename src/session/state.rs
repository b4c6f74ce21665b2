use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a [`Session`][super::Session].
///
/// `Idle -> Attaching -> Running -> Detaching -> Closed`, a failed open
/// goes back from `Attaching` to `Idle`. `Closed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    Idle,
    Attaching,
    Running,
    Detaching,
    Closed,
}

impl State {
    fn from_u8(val: u8) -> Self {
        match val {
            0 => Self::Idle,
            1 => Self::Attaching,
            2 => Self::Running,
            3 => Self::Detaching,
            _ => Self::Closed,
        }
    }
}

#[derive(Debug)]
pub(super) struct AtomicState(AtomicU8);

impl AtomicState {
    pub fn new(state: State) -> Self {
        Self(AtomicU8::new(state as _))
    }

    pub fn load(&self) -> State {
        State::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: State) {
        self.0.store(state as _, Ordering::Release);
    }

    /// Moves from `from` to `to` if and only if the current state is `from`.
    pub fn transition(&self, from: State, to: State) -> bool {
        self.0
            .compare_exchange(from as _, to as _, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
