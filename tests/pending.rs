mod common;

use reactor_commands::{Interest, Outcome};
use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

#[test]
fn test_pending_completes_after_all_steps() {
    let (base, handle) = common::start();

    let ret = base
        .exec_sync((), |_, scope| {
            for _ in 0..3 {
                let completion = scope.completion();
                scope
                    .reactor()
                    .defer(move |reactor| completion.report_step(reactor, 7));
            }

            Outcome::Pending(3)
        })
        .unwrap();

    assert_eq!(ret, 7);

    common::stop(base, handle);
}

#[test]
fn test_bottom_half_runs_once_after_last_step() {
    let (base, handle) = common::start();

    let steps = Arc::new(AtomicUsize::new(0));
    let seen_by_bottom_half = Arc::new(Mutex::new(Vec::new()));

    let steps_clone = steps.clone();
    let seen_clone = seen_by_bottom_half.clone();

    let ret = base
        .exec_sync_bh(
            (),
            move |_, scope| {
                for _ in 0..3 {
                    let completion = scope.completion();
                    let steps = steps_clone.clone();

                    scope.reactor().defer(move |reactor| {
                        steps.fetch_add(1, Ordering::SeqCst);
                        completion.report_step(reactor, 7);
                    });
                }

                Outcome::Pending(3)
            },
            move |_, _| {
                seen_clone.lock().unwrap().push(steps.load(Ordering::SeqCst));
                11
            },
        )
        .unwrap();

    assert_eq!(ret, 11);
    assert_eq!(*seen_by_bottom_half.lock().unwrap(), vec![3]);

    common::stop(base, handle);
}

#[test]
fn test_steps_see_previous_result() {
    let (base, handle) = common::start();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();

    let ret = base
        .exec_sync((), move |_, scope| {
            for step in 0..3 {
                let completion = scope.completion();
                let seen = seen_clone.clone();

                scope.reactor().defer(move |reactor| {
                    seen.lock().unwrap().push(completion.current_result());
                    completion.report_step(reactor, 10 + step);
                });
            }

            Outcome::Pending(3)
        })
        .unwrap();

    assert_eq!(ret, 12);
    assert_eq!(*seen.lock().unwrap(), vec![3, 10, 11]);

    common::stop(base, handle);
}

#[test]
fn test_pending_completed_by_io_readiness() {
    let (base, handle) = common::start();

    let (reader, mut writer) = UnixStream::pair().unwrap();
    reader.set_nonblocking(true).unwrap();

    let (armed_tx, armed_rx) = mpsc::channel();

    let feeder = thread::spawn(move || {
        armed_rx.recv().unwrap();
        writer.write_all(b"abc").unwrap();
        writer
    });

    let ret = base
        .exec_sync(Some(reader), move |reader, scope| {
            let Some(mut stream) = reader.take() else {
                return Outcome::Done(-1);
            };

            let completion = scope.completion();
            let fd = stream.as_raw_fd();

            let token = scope
                .reactor()
                .register(fd, Interest::READABLE, move |reactor, token| {
                    let mut buffer = [0u8; 16];
                    let n = stream.read(&mut buffer).unwrap_or(0);

                    reactor.deregister(token);
                    completion.report_step(reactor, n as i32);
                });

            if scope.reactor().arm(token).is_err() {
                return Outcome::Done(-1);
            }

            armed_tx.send(()).unwrap();
            Outcome::Pending(1)
        })
        .unwrap();

    assert_eq!(ret, 3);
    drop(feeder.join().unwrap());

    common::stop(base, handle);
}

#[test]
fn test_commands_wait_while_pending() {
    let (base, handle) = common::start();
    let base = Arc::new(base);
    let log = Arc::new(Mutex::new(Vec::new()));

    let (started_tx, started_rx) = mpsc::channel();

    let waiter = {
        let base = base.clone();
        let log = log.clone();

        thread::spawn(move || {
            base.exec_sync((), move |_, scope| {
                let completion = scope.completion();

                scope
                    .reactor()
                    .add_timer(Duration::from_millis(50), move |reactor| {
                        log.lock().unwrap().push("step");
                        completion.report_step(reactor, 0);
                    });

                started_tx.send(()).unwrap();
                Outcome::Pending(1)
            })
        })
    };

    started_rx.recv().unwrap();

    let log_clone = log.clone();
    base.exec_sync((), move |_, _| {
        log_clone.lock().unwrap().push("queued");
        Outcome::Done(0)
    })
    .unwrap();

    assert_eq!(waiter.join().unwrap().unwrap(), 0);
    assert_eq!(*log.lock().unwrap(), vec!["step", "queued"]);

    let base = Arc::into_inner(base).unwrap();
    common::stop(base, handle);
}

#[test]
fn test_zero_pending_steps_completes_immediately() {
    let (base, handle) = common::start();

    let ret = base
        .exec_sync_bh((), |_, _| Outcome::Pending(0), |_, _| 5)
        .unwrap();
    assert_eq!(ret, 5);

    common::stop(base, handle);
}

#[test]
fn test_stray_step_is_ignored() {
    let (base, handle) = common::start();
    let completion = base.completion();
    let stray = completion.clone();

    base.exec_async((), move |_, scope| {
        stray.report_step(scope.reactor(), 5);
        0
    })
    .unwrap();

    assert_eq!(base.exec_sync((), |_, _| Outcome::Done(1)).unwrap(), 1);
    assert!(!completion.is_pending());
    assert_eq!(completion.current_result(), 0);

    common::stop(base, handle);
}
