use std::fs::{self, File};
use std::io::{self, ErrorKind};

use crate::bind::Binder;
use crate::config::attr::from;
use crate::config::{Exclude, Proc};
use crate::counter::CounterDefinition;
use crate::error::{Error, Result};
use crate::ffi::{bindings as b, syscall};

/// Kernel binder backed by the `perf_event_open` system call.
#[derive(Clone, Debug, Default)]
pub struct PerfBinder {
    exclude: Exclude,
}

impl PerfBinder {
    pub fn new(exclude: Exclude) -> Self {
        Self { exclude }
    }
}

/// Per-thread counter fds of one attached definition.
///
/// Dropping the handle closes the fds, which releases the counters even if
/// [`Binder::detach`] is never reached.
#[derive(Debug)]
pub struct PerfHandle {
    perfs: Vec<File>,
}

impl PerfHandle {
    /// Number of threads the counter is bound to, 0 once detached.
    pub fn threads(&self) -> usize {
        self.perfs.len()
    }
}

impl Binder for PerfBinder {
    type Handle = PerfHandle;

    fn attach(&self, target: Proc, def: &CounterDefinition) -> Result<PerfHandle> {
        let pid = target.pid();
        let attr = from(def, &self.exclude);
        let tids = threads(pid).map_err(|e| Error::from_attach(def.label(), pid, e))?;

        let mut perfs = Vec::with_capacity(tids.len());
        let mut gone = None;
        for tid in tids {
            // `pid` of `perf_event_open` is a thread id, with `cpu = -1`
            // the counter follows that thread on all CPUs.
            let flags = b::PERF_FLAG_FD_CLOEXEC;
            match syscall!(perf_event_open, &attr, tid as _, -1, -1, flags) {
                Ok(perf) => perfs.push(perf),
                // The thread exited after we listed it.
                Err(e) if e.raw_os_error() == Some(libc::ESRCH) => gone = Some(e),
                // Fds opened so far are closed on return.
                Err(e) => return Err(Error::from_attach(def.label(), pid, e)),
            }
        }

        if perfs.is_empty() {
            let e = gone.unwrap_or_else(|| io::Error::from_raw_os_error(libc::ESRCH));
            return Err(Error::from_attach(def.label(), pid, e));
        }

        Ok(PerfHandle { perfs })
    }

    fn read(&self, handle: &PerfHandle) -> io::Result<u64> {
        if handle.perfs.is_empty() {
            return Err(io::Error::new(ErrorKind::NotConnected, "counter is detached"));
        }
        handle.perfs.iter().try_fold(0_u64, |acc, perf| {
            let count = syscall!(read_count, perf)?;
            Ok(acc.saturating_add(count))
        })
    }

    fn detach(&self, handle: &mut PerfHandle) -> io::Result<()> {
        let mut result = Ok(());
        for perf in handle.perfs.drain(..) {
            // Keep going so that every fd gets closed, report the first failure.
            if let Err(e) = syscall!(ioctl, &perf, b::PERF_EVENT_IOC_DISABLE) {
                result = result.and(Err(e));
            }
        }
        result
    }
}

// Thread ids of `pid`, the process itself included.
pub(crate) fn threads(pid: u32) -> io::Result<Vec<u32>> {
    let mut tids = vec![];
    for entry in fs::read_dir(format!("/proc/{}/task", pid))? {
        let name = entry?.file_name();
        if let Some(tid) = name.to_str().and_then(|it| it.parse().ok()) {
            tids.push(tid);
        }
    }
    tids.sort_unstable();
    Ok(tids)
}
