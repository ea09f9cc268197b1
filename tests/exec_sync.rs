mod common;

use reactor_commands::{CommandError, Outcome};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

#[test]
fn test_done_returns_result_code() {
    let (base, handle) = common::start();

    let ret = base.exec_sync((), |_, _| Outcome::Done(42)).unwrap();
    assert_eq!(ret, 42);

    common::stop(base, handle);
}

#[test]
fn test_bottom_half_overrides_result() {
    let (base, handle) = common::start();

    let ret = base
        .exec_sync_bh((), |_, _| Outcome::Done(0), |_, _| 99)
        .unwrap();
    assert_eq!(ret, 99);

    common::stop(base, handle);
}

#[test]
fn test_bottom_half_skipped_on_error() {
    let (base, handle) = common::start();

    let ran = Arc::new(AtomicUsize::new(0));
    let ran_clone = ran.clone();

    let ret = base
        .exec_sync_bh(
            (),
            |_, _| Outcome::Done(-1),
            move |_, _| {
                ran_clone.fetch_add(1, Ordering::SeqCst);
                99
            },
        )
        .unwrap();

    assert_eq!(ret, -1);
    assert_eq!(ran.load(Ordering::SeqCst), 0);

    common::stop(base, handle);
}

#[test]
fn test_bottom_half_finishes_before_caller_returns() {
    let (base, handle) = common::start();

    let finished = Arc::new(AtomicBool::new(false));
    let finished_clone = finished.clone();

    base.exec_sync_bh(
        (),
        |_, _| Outcome::Done(0),
        move |_, _| {
            thread::sleep(Duration::from_millis(20));
            finished_clone.store(true, Ordering::SeqCst);
            0
        },
    )
    .unwrap();

    assert!(finished.load(Ordering::SeqCst));

    common::stop(base, handle);
}

#[test]
fn test_function_sees_and_returns_argument() {
    let (base, handle) = common::start();

    let (ret, values) = base
        .exec_sync_returning(vec![1, 2, 3], |values: &mut Vec<i32>, _| {
            values.push(4);
            Outcome::Done(values.len() as i32)
        })
        .unwrap();

    assert_eq!(ret, 4);
    assert_eq!(values, vec![1, 2, 3, 4]);

    common::stop(base, handle);
}

#[test]
fn test_runs_on_reactor_thread() {
    let (base, handle) = common::start();

    let (_, ran_on) = base
        .exec_sync_returning(None, |ran_on: &mut Option<ThreadId>, _| {
            *ran_on = Some(thread::current().id());
            Outcome::Done(0)
        })
        .unwrap();

    assert_eq!(ran_on, Some(handle.thread().id()));
    assert_ne!(ran_on, Some(thread::current().id()));

    common::stop(base, handle);
}

#[test]
fn test_blocking_from_reactor_thread_is_refused() {
    let (base, handle) = common::start();
    let base = Arc::new(base);
    let inner = Arc::clone(&base);

    let ret = base
        .exec_sync((), move |_, _| {
            match inner.exec_sync((), |_, _| Outcome::Done(1)) {
                Err(CommandError::ReactorThread) => Outcome::Done(7),
                _ => Outcome::Done(-1),
            }
        })
        .unwrap();

    assert_eq!(ret, 7);

    let base = Arc::into_inner(base).unwrap();
    common::stop(base, handle);
}

#[test]
fn test_commands_from_one_thread_run_in_order() {
    let (base, handle) = common::start();
    let log = Arc::new(Mutex::new(Vec::new()));

    for i in 0..50 {
        let log = log.clone();
        base.exec_async((), move |_, _| {
            log.lock().unwrap().push(i);
            0
        })
        .unwrap();
    }

    base.exec_sync((), |_, _| Outcome::Done(0)).unwrap();

    assert_eq!(*log.lock().unwrap(), (0..50).collect::<Vec<_>>());

    common::stop(base, handle);
}
