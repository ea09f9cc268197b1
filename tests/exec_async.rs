mod common;

use reactor_commands::{CommandBase, CommandError, Outcome, Reactor};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Counts how many times it was dropped.
struct Tracked {
    value: usize,
    drops: Arc<AtomicUsize>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_argument_released_once_after_function() {
    let (base, handle) = common::start();

    let drops = Arc::new(AtomicUsize::new(0));
    let alive_during_call = Arc::new(AtomicUsize::new(0));

    for value in 0..10 {
        let alive = alive_during_call.clone();
        let arg = Tracked {
            value,
            drops: drops.clone(),
        };

        base.exec_async(arg, move |arg: &mut Tracked, _| {
            // Earlier arguments are gone, this one is not.
            if arg.drops.load(Ordering::SeqCst) == arg.value {
                alive.fetch_add(1, Ordering::SeqCst);
            }
            0
        })
        .unwrap();
    }

    base.exec_sync((), |_, _| Outcome::Done(0)).unwrap();

    assert_eq!(drops.load(Ordering::SeqCst), 10);
    assert_eq!(alive_during_call.load(Ordering::SeqCst), 10);

    common::stop(base, handle);
}

#[test]
fn test_full_queue_hands_argument_back() {
    let mut reactor = Reactor::new().unwrap();
    let base = CommandBase::builder()
        .capacity(1)
        .build(&mut reactor)
        .unwrap();

    base.exec_async(1, |_, _| 0).unwrap();

    let rejected = base.exec_async(2, |_, _| 0).unwrap_err();
    assert!(matches!(rejected.error(), CommandError::Full(1)));
    assert_eq!(rejected.to_string(), "command rejected");
    assert_eq!(
        std::error::Error::source(&rejected).map(|source| source.to_string()),
        Some("command queue is full (1 commands waiting)".to_string())
    );
    assert_eq!(rejected.into_inner(), 2);

    let handle = thread::spawn(move || reactor.run());
    common::stop(base, handle);
}

#[test]
fn test_closed_base_refuses_commands() {
    let mut reactor = Reactor::new().unwrap();
    let base = CommandBase::new(&mut reactor).unwrap();

    drop(reactor);

    let drops = Arc::new(AtomicUsize::new(0));
    let arg = Tracked {
        value: 0,
        drops: drops.clone(),
    };

    let (error, arg) = base.exec_async(arg, |_, _| 0).unwrap_err().into_parts();
    assert!(matches!(error, CommandError::Closed));
    assert_eq!(drops.load(Ordering::SeqCst), 0);
    drop(arg);
    assert_eq!(drops.load(Ordering::SeqCst), 1);

    let result = base.exec_sync((), |_, _| Outcome::Done(0));
    assert!(matches!(result, Err(CommandError::Closed)));
}

#[test]
fn test_queued_commands_dropped_with_reactor() {
    let mut reactor = Reactor::new().unwrap();
    let base = CommandBase::new(&mut reactor).unwrap();

    let drops = Arc::new(AtomicUsize::new(0));
    let ran = Arc::new(AtomicUsize::new(0));

    for value in 0..3 {
        let ran = ran.clone();
        let arg = Tracked {
            value,
            drops: drops.clone(),
        };

        base.exec_async(arg, move |_, _| {
            ran.fetch_add(1, Ordering::SeqCst);
            0
        })
        .unwrap();
    }

    drop(reactor);

    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(drops.load(Ordering::SeqCst), 3);
}
