use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use perfwatch::config::{Exclude, Opts, Proc};
use perfwatch::counter::{CounterDefinition, CounterRegistry};
use perfwatch::sampler::{LineSink, Sink};
use perfwatch::Session;
use tracing_subscriber::{fmt, EnvFilter};

/// Stream the performance counters of a running process.
#[derive(Parser)]
#[command(name = "perfwatch", version, about)]
struct Cli {
    /// Process to watch.
    #[arg(short, long)]
    pid: u32,

    /// Time between two samples, e.g. `500ms` or `2s`.
    #[arg(short, long, default_value = "1s", value_parser = humantime::parse_duration)]
    interval: Duration,

    /// Stop after this many samples.
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Event to count instead of the default set, by its `perf list` name.
    /// May be repeated.
    #[arg(short, long = "event", value_name = "NAME")]
    events: Vec<String>,

    /// Leave kernel space out of the counts.
    #[arg(long)]
    exclude_kernel: bool,

    /// Leave the hypervisor out of the counts.
    #[arg(long)]
    exclude_hv: bool,

    /// Logging verbosity level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let definitions = definitions(&cli.events)?;
    let target = Proc(cli.pid);
    let opts = Opts {
        interval: cli.interval,
        max_samples: cli.count,
        exclude: Exclude {
            kernel: cli.exclude_kernel,
            hv: cli.exclude_hv,
        },
    };

    let session = Arc::new(Session::new(target, definitions, opts));
    {
        let session = Arc::clone(&session);
        ctrlc::set_handler(move || {
            tracing::info!("received SIGINT, shutting down");
            report(session.stop());
        })
        .context("setting Ctrl-C handler")?;
    }

    let samples = session
        .open_channel()
        .with_context(|| format!("attaching counters to pid {}", target))?;

    let mut out = LineSink::new(io::stdout());
    for it in samples {
        if out.emit(it).is_break() {
            break;
        }
    }

    // A no-op if the handler already stopped the session.
    let errors = session.stop();
    if !errors.is_empty() {
        report(errors);
        bail!("some counters failed to detach");
    }
    Ok(())
}

fn definitions(events: &[String]) -> Result<Vec<CounterDefinition>> {
    if events.is_empty() {
        return Ok(CounterRegistry::default_set());
    }

    let mut registry = CounterRegistry::new();
    for name in events {
        let def = CounterDefinition::from_name(name)
            .with_context(|| format!("unknown event `{}`", name))?;
        registry.add(def)?;
    }
    Ok(registry.into_definitions())
}

fn report(errors: Vec<perfwatch::Error>) {
    for e in errors {
        tracing::error!(error = ?anyhow::Error::from(e), "teardown");
    }
}
