use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use futures::StreamExt;

use super::{Session, State};
use crate::bind::mock::MockBinder;
use crate::config::{Opts, Proc};
use crate::counter::{CounterDefinition, CounterRegistry};
use crate::error::Error;
use crate::event::hw::Hardware;
use crate::sampler::{FnSink, Sample};

const FAST: Duration = Duration::from_millis(5);
const DEFAULT_SET: [&str; 4] = ["instructions", "cycles", "cache-misses", "page-faults"];

fn opts(interval: Duration, max_samples: Option<u64>) -> Opts {
    Opts {
        interval,
        max_samples,
        ..Opts::default()
    }
}

fn session(binder: &MockBinder, opts: Opts) -> Session<MockBinder> {
    Session::with_binder(binder.clone(), Proc(42), CounterRegistry::default_set(), opts)
}

fn wait_closed(session: &Session<MockBinder>) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while session.state() != State::Closed {
        assert!(Instant::now() < deadline, "session never closed");
        thread::sleep(Duration::from_millis(1));
    }
}

fn reversed() -> Vec<String> {
    DEFAULT_SET.iter().rev().map(|it| it.to_string()).collect()
}

#[test]
fn test_open_stop() {
    let binder = MockBinder::new();
    let session = session(&binder, opts(FAST, None));
    assert_eq!(session.state(), State::Idle);

    let rx = session.open_channel().unwrap();
    assert_eq!(session.state(), State::Running);
    assert_eq!(binder.attaches(), 4);

    let errors = session.stop();
    assert!(errors.is_empty());
    assert_eq!(session.state(), State::Closed);
    assert_eq!(binder.detaches(), 4);
    assert_eq!(binder.detached(), reversed());

    // The sender went away with the sampler thread.
    let drained: Vec<Sample> = rx.iter().collect();
    assert!(drained.iter().all(|it| it.readings.len() == 4));
}

#[test]
fn test_open_stop_immediately() {
    let binder = MockBinder::new();
    let session = session(&binder, opts(Duration::from_secs(30), None));

    let (tx, rx) = mpsc::channel::<Sample>();
    session.open(tx).unwrap();
    assert!(session.stop().is_empty());

    assert_eq!(binder.attaches(), binder.detaches());
    assert_eq!(rx.iter().count(), 0);
}

#[test]
fn test_stop_twice() {
    let binder = MockBinder::new();
    let session = session(&binder, opts(FAST, None));
    let _rx = session.open_channel().unwrap();

    assert!(session.stop().is_empty());
    assert!(session.stop().is_empty());
    assert_eq!(session.state(), State::Closed);
    assert_eq!(binder.detaches(), 4);
}

#[test]
fn test_concurrent_stop() {
    let binder = MockBinder::new();
    let session = Arc::new(session(&binder, opts(FAST, None)));
    let _rx = session.open_channel().unwrap();

    let stoppers: Vec<_> = (0..4)
        .map(|_| {
            let session = Arc::clone(&session);
            thread::spawn(move || session.stop())
        })
        .collect();
    for it in stoppers {
        assert!(it.join().unwrap().is_empty());
    }

    // Losers may return before the winner finished, settle first.
    wait_closed(&session);
    assert_eq!(binder.detaches(), 4);
    assert_eq!(binder.detached(), reversed());
}

#[test]
fn test_stop_interrupts_wait() {
    let binder = MockBinder::new();
    let session = session(&binder, opts(Duration::from_secs(30), None));
    let _rx = session.open_channel().unwrap();

    let started = Instant::now();
    session.stop();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(binder.detaches(), 4);
}

#[test]
fn test_stop_while_attaching() {
    let barrier = Arc::new(Barrier::new(2));
    let binder = MockBinder::new().gate("instructions", Arc::clone(&barrier));
    let session = Arc::new(session(&binder, opts(Duration::from_secs(30), None)));

    let opener = {
        let session = Arc::clone(&session);
        thread::spawn(move || session.open_channel())
    };
    barrier.wait();
    assert_eq!(session.state(), State::Attaching);

    let started = Instant::now();
    assert!(session.stop().is_empty());
    assert!(started.elapsed() < Duration::from_secs(5));

    assert!(session.shared.cancel.is_cancelled());
    assert_eq!(session.state(), State::Closed);
    assert!(opener.join().unwrap().is_ok());
    assert_eq!(binder.attaches(), 4);
    assert_eq!(binder.detached(), reversed());
}

#[test]
fn test_stop_while_attaching_fails() {
    let barrier = Arc::new(Barrier::new(2));
    let binder = MockBinder::new()
        .gate("cycles", Arc::clone(&barrier))
        .fail_attach(2, libc::ESRCH);
    let session = Arc::new(session(&binder, opts(FAST, None)));

    let opener = {
        let session = Arc::clone(&session);
        thread::spawn(move || session.open_channel())
    };
    barrier.wait();
    assert!(session.stop().is_empty());

    let e = opener.join().unwrap().unwrap_err();
    assert!(matches!(e, Error::Attach { .. }), "{:?}", e);
    // Not back to `Idle`, the stop still holds.
    assert_eq!(session.state(), State::Closed);
    assert!(matches!(session.open_channel(), Err(Error::Closed)));
    assert_eq!(binder.attaches(), 1);
    assert_eq!(binder.detaches(), 1);
}

#[test]
fn test_stop_racing_open() {
    for _ in 0..200 {
        let binder = MockBinder::new();
        let session = Arc::new(session(&binder, opts(Duration::from_secs(30), None)));

        let opener = {
            let session = Arc::clone(&session);
            thread::spawn(move || session.open_channel().map(|_| ()))
        };
        let errors = session.stop();
        let opened = opener.join().unwrap();

        assert!(errors.is_empty());
        assert_eq!(session.state(), State::Closed);
        assert_eq!(binder.attaches(), binder.detaches());
        match opened {
            Ok(()) => assert_eq!(binder.detaches(), 4),
            Err(e) => assert!(matches!(e, Error::Closed), "{:?}", e),
        }
    }
}

#[test]
fn test_attach_failure_rolls_back() {
    for k in 1..=4 {
        let binder = MockBinder::new().fail_attach(k, libc::ESRCH);
        let session = session(&binder, opts(FAST, None));

        let (tx, _rx) = mpsc::channel::<Sample>();
        let e = session.open(tx).unwrap_err();
        assert!(matches!(e, Error::Attach { pid: 42, .. }), "{:?}", e);

        assert_eq!(session.state(), State::Idle);
        assert_eq!(binder.attaches(), k - 1);
        assert_eq!(binder.detaches(), k - 1);
    }
}

#[test]
fn test_permission_denied() {
    let binder = MockBinder::new().fail_attach(2, libc::EACCES);
    let session = session(&binder, opts(FAST, None));

    match session.open_channel() {
        Err(Error::Permission { label, pid, source }) => {
            assert_eq!(label, "cycles");
            assert_eq!(pid, 42);
            assert_eq!(source.raw_os_error(), Some(libc::EACCES));
        }
        other => panic!("{:?}", other.map(|_| ())),
    }
    assert_eq!(binder.detached(), vec!["instructions".to_string()]);
}

#[test]
fn test_invalid_configuration() {
    let binder = MockBinder::new();
    let session = session(&binder, opts(Duration::ZERO, None));
    let e = session.open_channel().unwrap_err();
    assert!(matches!(e, Error::InvalidInterval(_)));
    assert!(e.is_configuration());

    let definitions = vec![
        CounterDefinition::hardware(Hardware::Instr),
        CounterDefinition::hardware(Hardware::CpuCycle).with_label("instructions"),
    ];
    let session = Session::with_binder(binder.clone(), Proc(42), definitions, opts(FAST, None));
    let e = session.open_channel().unwrap_err();
    assert!(matches!(e, Error::DuplicateCounter { .. }));

    assert_eq!(session.state(), State::Idle);
    assert_eq!(binder.attaches(), 0);
}

#[test]
fn test_open_twice() {
    let binder = MockBinder::new();
    let session = session(&binder, opts(FAST, None));
    let _rx = session.open_channel().unwrap();

    let e = session.open_channel().unwrap_err();
    assert!(matches!(e, Error::AlreadyOpen));
    assert_eq!(binder.attaches(), 4);

    session.stop();
    assert!(matches!(session.open_channel(), Err(Error::Closed)));
}

#[test]
fn test_stop_before_open() {
    let binder = MockBinder::new();
    let session = session(&binder, opts(FAST, None));

    assert!(session.stop().is_empty());
    assert_eq!(session.state(), State::Closed);
    assert!(matches!(session.open_channel(), Err(Error::Closed)));
    assert_eq!(binder.attaches(), 0);
}

#[test]
fn test_shutdown_errors() {
    let binder = MockBinder::new().fail_detach("cycles");
    let session = session(&binder, opts(FAST, None));
    let _rx = session.open_channel().unwrap();

    let errors = session.stop();
    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors[0], Error::Shutdown { label, .. } if label == "cycles"));

    // A failed detach does not stop the others.
    assert_eq!(binder.detached(), reversed());
    assert_eq!(session.state(), State::Closed);
}

#[test]
fn test_max_samples() {
    let binder = MockBinder::new();
    let session = session(&binder, opts(FAST, Some(3)));
    let rx = session.open_channel().unwrap();

    // Disconnects once the sampler is done and torn down.
    let seqs: Vec<u64> = rx.iter().map(|it| it.seq).collect();
    assert_eq!(seqs, vec![0, 1, 2]);
    assert_eq!(session.state(), State::Closed);
    assert_eq!(binder.detaches(), 4);

    assert!(session.stop().is_empty());
    assert_eq!(binder.detaches(), 4);
}

#[test]
fn test_consumer_gone() {
    let binder = MockBinder::new();
    let session = session(&binder, opts(FAST, None));
    let rx = session.open_channel().unwrap();
    drop(rx);

    wait_closed(&session);
    assert_eq!(binder.detaches(), 4);
}

#[test]
fn test_sink_panic() {
    let binder = MockBinder::new();
    let session = session(&binder, opts(FAST, None));
    session
        .open(FnSink(|_: Sample| -> std::ops::ControlFlow<()> { panic!("sink") }))
        .unwrap();

    wait_closed(&session);
    assert_eq!(binder.detached(), reversed());
    assert!(session.stop().is_empty());
}

#[test]
fn test_drop() {
    let binder = MockBinder::new();
    let session = session(&binder, opts(Duration::from_secs(30), None));
    let _rx = session.open_channel().unwrap();

    drop(session);
    assert_eq!(binder.detaches(), 4);
}

#[test]
fn test_stream() {
    let binder = MockBinder::new().rate("instructions", 1000).rate("cycles", 2000);
    let session = session(&binder, opts(FAST, Some(3)));
    let samples = session.open_stream().unwrap();

    let samples: Vec<Sample> = tokio_test::block_on(samples.collect());
    assert_eq!(samples.len(), 3);
    for it in &samples {
        assert_eq!(it.cpi.value(), Some(2.0));
    }
    assert_eq!(session.state(), State::Closed);
}

#[test]
fn test_send_sync() {
    fn check<T: Send + Sync>() {}
    check::<Session>();
    check::<Session<MockBinder>>();
}
