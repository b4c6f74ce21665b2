//! Watch a running process through its hardware and software performance
//! counters.
//!
//! A [`Session`] attaches a set of counters to every thread of a target
//! process with the `perf_event_open` system call, reads their cumulative
//! values at a fixed interval and derives cycles per instruction from them.
//! Every attached counter is released exactly once whichever way the session
//! ends.
//!
//! ## Example
//!
//! Sample the default counter set of the current process five times.
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use perfwatch::config::{Opts, Proc};
//! use perfwatch::counter::CounterRegistry;
//! use perfwatch::Session;
//!
//! let mut opts = Opts::default();
//! opts.interval = Duration::from_millis(100);
//! opts.max_samples = Some(5);
//! // Required for unprivileged users when `perf_event_paranoid` >= 2.
//! opts.exclude.kernel = true;
//!
//! let session = Session::new(Proc::CURRENT, CounterRegistry::default_set(), opts);
//! let samples = session.open_channel().unwrap();
//!
//! // Ends once five samples were taken and the counters are detached.
//! for it in samples {
//!     println!("{}", it); // 1700000000.100 instructions=... cycles=... cpi=1.042
//! }
//! ```
//!
//! Custom counter sets are built with [`CounterRegistry`][counter::CounterRegistry],
//! samples can be consumed as a channel, an asynchronous stream
//! ([`Session::open_stream`]) or through any [`Sink`][sampler::Sink].

pub mod bind;
pub mod config;
pub mod counter;
mod error;
pub mod event;
mod ffi;
pub mod sampler;
pub mod session;
pub mod store;

pub use error::*;
pub use session::{Session, State};
