#[cfg(test)]
mod test;

mod state;

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use futures::channel::mpsc::{unbounded, UnboundedReceiver};
use state::AtomicState;
pub use state::State;
use tracing::{debug, info, warn};

use crate::bind::{attach_all, Binder, PerfBinder};
use crate::config::{Opts, Proc};
use crate::counter::{CounterDefinition, CounterRegistry};
use crate::error::{Error, Result};
use crate::sampler::{Cancel, Sample, Sampler, Sink};
use crate::store::SampleStore;

const POLL: Duration = Duration::from_millis(1);

/// Sampling session against one target process.
///
/// The session owns every counter it attaches. They are released exactly
/// once, in reverse attach order, whichever way sampling ends: an explicit
/// [`stop`][Self::stop], the sample limit, the sink going away, a panic in
/// the sink, or the session being dropped.
///
/// `Session` is `Sync`, so `stop` may race with itself, e.g. from a signal
/// handler thread and the main thread. Only one caller performs the
/// teardown, the others return immediately.
///
/// # Examples
///
/// ```rust,no_run
/// use std::time::Duration;
///
/// use perfwatch::config::{Opts, Proc};
/// use perfwatch::counter::CounterRegistry;
/// use perfwatch::session::Session;
///
/// let mut opts = Opts::default();
/// opts.interval = Duration::from_millis(500);
///
/// let session = Session::new(Proc(1234), CounterRegistry::default_set(), opts);
/// let samples = session.open_channel().unwrap();
///
/// for sample in samples.iter().take(10) {
///     println!("{}", sample);
/// }
///
/// for e in session.stop() {
///     eprintln!("{}", e);
/// }
/// ```
pub struct Session<B: Binder = PerfBinder> {
    binder: Arc<B>,
    target: Proc,
    definitions: Vec<CounterDefinition>,
    opts: Opts,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    state: AtomicState,
    cancel: Cancel,
    // Claimed by the first `stop`.
    stopping: AtomicBool,
    // Detach failures waiting to be handed to `stop`.
    errors: Mutex<Vec<Error>>,
}

impl Session {
    /// Session backed by `perf_event_open`.
    pub fn new(target: impl Into<Proc>, definitions: Vec<CounterDefinition>, opts: Opts) -> Self {
        let binder = PerfBinder::new(opts.exclude.clone());
        Self::with_binder(binder, target, definitions, opts)
    }
}

impl<B: Binder> Session<B> {
    pub fn with_binder(
        binder: B,
        target: impl Into<Proc>,
        definitions: Vec<CounterDefinition>,
        opts: Opts,
    ) -> Self {
        Self {
            binder: Arc::new(binder),
            target: target.into(),
            definitions,
            opts,
            shared: Arc::new(Shared {
                state: AtomicState::new(State::Idle),
                cancel: Cancel::new(),
                stopping: AtomicBool::new(false),
                errors: Mutex::new(vec![]),
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn state(&self) -> State {
        self.shared.state.load()
    }

    pub fn target(&self) -> Proc {
        self.target
    }

    pub fn definitions(&self) -> &[CounterDefinition] {
        &self.definitions
    }

    pub fn opts(&self) -> &Opts {
        &self.opts
    }

    /// Attaches every counter and starts sampling into `sink`.
    ///
    /// Attaching is all or nothing: on failure no counter stays attached,
    /// the session is back to [`State::Idle`] and the error that triggered
    /// the rollback is returned.
    pub fn open<S: Sink>(&self, sink: S) -> Result<()> {
        let state = &self.shared.state;
        if !state.transition(State::Idle, State::Attaching) {
            return match state.load() {
                State::Detaching | State::Closed => Err(Error::Closed),
                _ => Err(Error::AlreadyOpen),
            };
        }

        let result = self.attach().and_then(|store| self.spawn(store, sink));
        match &result {
            // Fails only if the worker already tore down.
            Ok(()) if state.transition(State::Attaching, State::Running) => {
                info!(
                    pid = %self.target,
                    counters = self.definitions.len(),
                    interval = ?self.opts.interval,
                    "session running",
                );
            }
            Ok(()) => (),
            // A stop requested while attaching still wins.
            Err(_) if self.shared.cancel.is_cancelled() => state.store(State::Closed),
            Err(_) => state.store(State::Idle),
        }
        result
    }

    /// Opens the session with a channel sink and returns its receiver.
    pub fn open_channel(&self) -> Result<mpsc::Receiver<Sample>> {
        let (tx, rx) = mpsc::channel();
        self.open(tx)?;
        Ok(rx)
    }

    /// Opens the session and returns the samples as an asynchronous stream.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # tokio_test::block_on(async {
    /// use futures::StreamExt;
    /// use perfwatch::config::{Opts, Proc};
    /// use perfwatch::counter::CounterRegistry;
    /// use perfwatch::session::Session;
    ///
    /// let session = Session::new(Proc(1234), CounterRegistry::default_set(), Opts::default());
    /// let mut samples = session.open_stream().unwrap();
    ///
    /// while let Some(sample) = samples.next().await {
    ///     println!("cpi: {}", sample.cpi);
    /// }
    /// # });
    /// ```
    pub fn open_stream(&self) -> Result<UnboundedReceiver<Sample>> {
        let (tx, rx) = unbounded();
        self.open(tx)?;
        Ok(rx)
    }

    fn attach(&self) -> Result<SampleStore<B>> {
        self.opts.validate()?;
        let registry = CounterRegistry::from_definitions(self.definitions.iter().cloned())?;
        let counters = attach_all(&*self.binder, self.target, registry.definitions())?;
        Ok(SampleStore::new(Arc::clone(&self.binder), counters))
    }

    fn spawn<S: Sink>(&self, store: SampleStore<B>, mut sink: S) -> Result<()> {
        let sampler = Sampler::from_opts(&self.opts);
        let shared = Arc::clone(&self.shared);

        let worker = thread::Builder::new()
            .name("perfwatch-sampler".into())
            .spawn(move || {
                // Dropped on every way out of `run`, unwinding included.
                let teardown = Teardown { shared, store };
                sampler.run(&teardown.store, &mut sink, &teardown.shared.cancel);
            })
            // The closure and the store it holds are dropped, which detaches.
            .map_err(Error::Spawn)?;

        *lock(&self.worker) = Some(worker);
        Ok(())
    }

    /// Stops sampling and detaches every counter.
    ///
    /// Always ends in [`State::Closed`]. Detach failures do not interrupt the
    /// teardown, they are logged and returned. Calling `stop` again, or
    /// concurrently, returns immediately with nothing to report.
    ///
    /// Issued while [`open`][Self::open] is still attaching, `stop` waits for
    /// the attach to finish and then tears down whatever it produced.
    pub fn stop(&self) -> Vec<Error> {
        let state = &self.shared.state;
        if state.transition(State::Idle, State::Closed) {
            debug!("session closed before open");
            return vec![];
        }
        if self.shared.stopping.swap(true, Ordering::AcqRel) {
            return vec![];
        }

        // Set before looking at the state so that an `open` racing with this
        // call either sees it on its failure path or its worker sees it on
        // the first wait.
        self.shared.cancel.cancel();

        loop {
            match state.load() {
                State::Running => {
                    if state.transition(State::Running, State::Detaching) {
                        info!(pid = %self.target, "stopping session");
                        break;
                    }
                }
                // `open` is still attaching, wait for its outcome.
                State::Attaching => thread::sleep(POLL),
                // `open` failed before it saw the cancellation.
                State::Idle => {
                    if state.transition(State::Idle, State::Closed) {
                        debug!("session closed after a failed open");
                        return vec![];
                    }
                }
                // The worker ended on its own and is tearing down, or is done.
                State::Detaching | State::Closed => break,
            }
        }

        let worker = lock(&self.worker).take();
        match worker {
            // Stopped from within the sink, teardown runs once the sink returns.
            Some(worker) if worker.thread().id() == thread::current().id() => return vec![],
            Some(worker) => {
                if worker.join().is_err() {
                    warn!("sampler thread panicked");
                }
            }
            None => (),
        }
        // A worker that finished before `open` stored its handle was not joined.
        while state.load() != State::Closed {
            thread::sleep(POLL);
        }

        mem::take(&mut *lock(&self.shared.errors))
    }
}

impl<B: Binder> Drop for Session<B> {
    fn drop(&mut self) {
        // Failures are logged by the teardown.
        let _ = self.stop();
    }
}

struct Teardown<B: Binder> {
    shared: Arc<Shared>,
    store: SampleStore<B>,
}

impl<B: Binder> Drop for Teardown<B> {
    fn drop(&mut self) {
        let state = &self.shared.state;
        // After an explicit stop the state is already `Detaching`.
        let _ = state.transition(State::Running, State::Detaching)
            || state.transition(State::Attaching, State::Detaching);

        if thread::panicking() {
            warn!("sink panicked, detaching counters");
        }

        let errors = self.store.detach_all();
        lock(&self.shared.errors).extend(errors);
        state.store(State::Closed);
        info!("session closed");
    }
}

// Nothing panics while holding these locks.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
