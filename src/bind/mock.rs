use std::collections::{HashMap, HashSet};
use std::io::{self, ErrorKind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use super::Binder;
use crate::config::Proc;
use crate::counter::CounterDefinition;
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Attach(String),
    Detach(String),
}

#[derive(Debug)]
pub struct MockHandle {
    label: String,
    reads: AtomicU64,
    live: bool,
}

/// Scriptable binder that records every kernel-facing call.
///
/// The value of a counter at its n-th read (from 0) is `rate * (n + 1)`.
#[derive(Clone, Default)]
pub struct MockBinder {
    calls: Arc<Mutex<Vec<Call>>>,
    // 1-based index of the attach call to reject, with its errno.
    fail_attach: Option<(usize, i32)>,
    fail_read: HashSet<(String, u64)>,
    fail_detach: HashSet<String>,
    rates: HashMap<String, u64>,
    // Attach of this label meets the barrier, then lingers before going on.
    gate: Option<(String, Arc<Barrier>)>,
}

impl MockBinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_attach(mut self, nth: usize, errno: i32) -> Self {
        self.fail_attach = Some((nth, errno));
        self
    }

    pub fn fail_read(mut self, label: &str, nth: u64) -> Self {
        self.fail_read.insert((label.to_owned(), nth));
        self
    }

    pub fn fail_detach(mut self, label: &str) -> Self {
        self.fail_detach.insert(label.to_owned());
        self
    }

    pub fn rate(mut self, label: &str, rate: u64) -> Self {
        self.rates.insert(label.to_owned(), rate);
        self
    }

    /// Holds the attach of `label` until `barrier` is met, then keeps it
    /// in flight a little longer so the other side acts mid-attach.
    pub fn gate(mut self, label: &str, barrier: Arc<Barrier>) -> Self {
        self.gate = Some((label.to_owned(), barrier));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn attaches(&self) -> usize {
        let calls = self.calls.lock().unwrap();
        calls.iter().filter(|it| matches!(it, Call::Attach(_))).count()
    }

    pub fn detaches(&self) -> usize {
        let calls = self.calls.lock().unwrap();
        calls.iter().filter(|it| matches!(it, Call::Detach(_))).count()
    }

    /// Labels detached so far, in detach order.
    pub fn detached(&self) -> Vec<String> {
        let calls = self.calls.lock().unwrap();
        calls
            .iter()
            .filter_map(|it| match it {
                Call::Detach(label) => Some(label.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Binder for MockBinder {
    type Handle = MockHandle;

    fn attach(&self, target: Proc, def: &CounterDefinition) -> Result<MockHandle> {
        if let Some((label, barrier)) = &self.gate {
            if label == def.label() {
                barrier.wait();
                thread::sleep(Duration::from_millis(20));
            }
        }

        let mut calls = self.calls.lock().unwrap();
        let nth = calls.iter().filter(|it| matches!(it, Call::Attach(_))).count() + 1;
        if let Some((at, errno)) = self.fail_attach {
            if nth == at {
                let source = io::Error::from_raw_os_error(errno);
                return Err(Error::from_attach(def.label(), target.pid(), source));
            }
        }
        calls.push(Call::Attach(def.label().to_owned()));

        Ok(MockHandle {
            label: def.label().to_owned(),
            reads: AtomicU64::new(0),
            live: true,
        })
    }

    fn read(&self, handle: &MockHandle) -> io::Result<u64> {
        if !handle.live {
            return Err(io::Error::new(ErrorKind::NotConnected, "counter is detached"));
        }
        let nth = handle.reads.fetch_add(1, Ordering::Relaxed);
        if self.fail_read.contains(&(handle.label.clone(), nth)) {
            return Err(io::Error::from_raw_os_error(libc::EINTR));
        }
        let rate = self.rates.get(&handle.label).copied().unwrap_or(100);
        Ok(rate * (nth + 1))
    }

    fn detach(&self, handle: &mut MockHandle) -> io::Result<()> {
        if !handle.live {
            return Ok(());
        }
        handle.live = false;
        self.calls
            .lock()
            .unwrap()
            .push(Call::Detach(handle.label.clone()));

        match self.fail_detach.contains(&handle.label) {
            true => Err(io::Error::from_raw_os_error(libc::EBADF)),
            false => Ok(()),
        }
    }
}
