//! The wake channel.
//!
//! Commands travel from submitting threads to the reactor through a
//! bounded FIFO queue paired with a semaphore-mode `eventfd`. Every
//! queued command is matched by exactly one unit on the counter, and
//! both are updated under the same lock, so the reactor never observes
//! a wake-up whose command is not there yet.
//!
//! The reactor takes exactly one unit and one command per readiness
//! report. The counter stays readable while a backlog remains, so the
//! next arming reports again.
//!
//! Blocking submitters wait for room in a full queue; non-blocking
//! ones are refused.

use super::task::Command;
use crate::error::CommandError;
use crate::reactor::platform::{sys_eventfd_semaphore, sys_read_counter, sys_write_counter};

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::sync::Arc;

struct Shared {
    queue: Mutex<Queue>,

    /// Signalled when a command leaves the queue or the queue closes.
    space: Condvar,

    /// Wake-up counter, readable while commands are queued.
    wake: OwnedFd,
}

struct Queue {
    commands: VecDeque<Command>,
    capacity: usize,

    /// Set once the receiving side is gone.
    closed: bool,
}

/// Creates a wake channel holding at most `capacity` queued commands.
pub(crate) fn channel(capacity: usize) -> io::Result<(CommandSender, CommandReceiver)> {
    let shared = Arc::new(Shared {
        queue: Mutex::new(Queue {
            commands: VecDeque::new(),
            capacity,
            closed: false,
        }),
        space: Condvar::new(),
        wake: sys_eventfd_semaphore()?,
    });

    Ok((
        CommandSender {
            shared: Arc::clone(&shared),
        },
        CommandReceiver { shared },
    ))
}

/// Submitting side of the wake channel. Usable from any thread.
#[derive(Clone)]
pub(crate) struct CommandSender {
    shared: Arc<Shared>,
}

impl CommandSender {
    /// Reserves a slot for one command and wakes the reactor.
    ///
    /// The queue stays locked until the returned permit is used, so the
    /// reactor cannot pop before the command is in place. On failure
    /// nothing was queued and nothing was signalled.
    pub(crate) fn reserve(&self) -> Result<Permit<'_>, CommandError> {
        let queue = self.shared.queue.lock();

        if queue.commands.len() >= queue.capacity && !queue.closed {
            return Err(CommandError::Full(queue.commands.len()));
        }

        self.admit(queue)
    }

    /// Like [`reserve`](Self::reserve), but waits for room instead of
    /// failing when the queue is full.
    pub(crate) fn reserve_blocking(&self) -> Result<Permit<'_>, CommandError> {
        let mut queue = self.shared.queue.lock();

        while !queue.closed && queue.commands.len() >= queue.capacity {
            self.shared.space.wait(&mut queue);
        }

        self.admit(queue)
    }

    fn admit<'a>(&'a self, queue: MutexGuard<'a, Queue>) -> Result<Permit<'a>, CommandError> {
        if queue.closed {
            return Err(CommandError::Closed);
        }

        sys_write_counter(&self.shared.wake, 1).map_err(CommandError::Wake)?;

        Ok(Permit { queue })
    }
}

/// A reserved, already signalled slot in the command queue.
pub(crate) struct Permit<'a> {
    queue: MutexGuard<'a, Queue>,
}

impl Permit<'_> {
    /// Places the command in the reserved slot.
    pub(crate) fn push(mut self, command: Command) {
        self.queue.commands.push_back(command);
    }
}

/// Reactor side of the wake channel.
pub(crate) struct CommandReceiver {
    shared: Arc<Shared>,
}

impl CommandReceiver {
    /// Descriptor to register with the reactor for readability.
    pub(crate) fn fd(&self) -> RawFd {
        self.shared.wake.as_raw_fd()
    }

    /// Takes exactly one command off the queue.
    pub(crate) fn recv(&self) -> Result<Command, CommandError> {
        sys_read_counter(&self.shared.wake).map_err(CommandError::Read)?;

        let command = self.shared.queue.lock().commands.pop_front();
        self.shared.space.notify_one();

        command.ok_or(CommandError::Empty)
    }
}

impl Drop for CommandReceiver {
    /// Closes the queue and drops whatever is still waiting in it.
    ///
    /// Blocking callers of dropped commands see their reply channel
    /// disconnect; arguments of non-blocking commands are released.
    fn drop(&mut self) {
        let leftover = {
            let mut queue = self.shared.queue.lock();
            queue.closed = true;
            mem::take(&mut queue.commands)
        };

        self.shared.space.notify_all();
        drop(leftover);
    }
}
