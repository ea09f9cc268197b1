//! Linux `epoll`-based poller implementation.
//!
//! Responsibilities:
//! - Register file descriptors with read/write interests
//! - Re-arm one-shot registrations after they fire
//! - Block waiting for I/O readiness, bounded by the next timer deadline

use super::common::Interest;
use crate::reactor::event::Event;

use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD, EPOLLERR, EPOLLHUP, EPOLLIN,
    EPOLLONESHOT, EPOLLOUT, epoll_create1, epoll_ctl, epoll_event, epoll_wait,
};
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

/// Linux `epoll` poller.
///
/// This poller owns:
/// - an `epoll` instance,
/// - a reusable event buffer.
///
/// Every registration carries `EPOLLONESHOT`, so a descriptor is
/// reported at most once per arming.
pub(crate) struct EpollPoller {
    /// Epoll file descriptor.
    epoll: OwnedFd,

    /// Reusable buffer for epoll events.
    events: Vec<epoll_event>,
}

impl EpollPoller {
    /// Create a new `EpollPoller` able to report `capacity` events per wait.
    pub(crate) fn new(capacity: usize) -> io::Result<Self> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            epoll: unsafe { OwnedFd::from_raw_fd(epoll) },
            events: vec![epoll_event { events: 0, u64: 0 }; capacity.max(1)],
        })
    }

    /// Add a descriptor and arm it for a single readiness report.
    pub(crate) fn add(&self, fd: RawFd, key: u64, interest: Interest) -> io::Result<()> {
        self.ctl(EPOLL_CTL_ADD, fd, key, interest)
    }

    /// Re-arm a descriptor that was added before.
    pub(crate) fn modify(&self, fd: RawFd, key: u64, interest: Interest) -> io::Result<()> {
        self.ctl(EPOLL_CTL_MOD, fd, key, interest)
    }

    /// Remove a file descriptor from the poller.
    pub(crate) fn delete(&self, fd: RawFd) -> io::Result<()> {
        let rc = unsafe {
            epoll_ctl(
                self.epoll.as_raw_fd(),
                EPOLL_CTL_DEL,
                fd,
                std::ptr::null_mut(),
            )
        };

        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn ctl(&self, op: i32, fd: RawFd, key: u64, interest: Interest) -> io::Result<()> {
        let mut flags = EPOLLONESHOT;

        if interest.read {
            flags |= EPOLLIN;
        }
        if interest.write {
            flags |= EPOLLOUT;
        }

        let mut event = epoll_event {
            events: flags as u32,
            u64: key,
        };

        let rc = unsafe { epoll_ctl(self.epoll.as_raw_fd(), op, fd, &mut event) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    /// Poll for I/O readiness events.
    ///
    /// Blocks until:
    /// - at least one armed file descriptor becomes ready,
    /// - or the optional timeout expires.
    ///
    /// An interrupted wait returns with no events.
    pub(crate) fn poll(
        &mut self,
        events: &mut Vec<Event>,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        events.clear();

        let timeout_ms = timeout.map(timeout_millis).unwrap_or(-1);

        let n = unsafe {
            epoll_wait(
                self.epoll.as_raw_fd(),
                self.events.as_mut_ptr(),
                self.events.len() as i32,
                timeout_ms,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        for ev in &self.events[..n as usize] {
            let key = ev.u64;
            let flags = ev.events;

            events.push(Event {
                key,
                readable: flags & ((EPOLLIN | EPOLLERR | EPOLLHUP) as u32) != 0,
                writable: flags & (EPOLLOUT as u32) != 0,
            });
        }

        Ok(())
    }
}

/// Rounds up to whole milliseconds so a sub-millisecond deadline does not spin.
fn timeout_millis(timeout: Duration) -> i32 {
    let ms = timeout.as_nanos().div_ceil(1_000_000);
    ms.min(i32::MAX as u128) as i32
}
