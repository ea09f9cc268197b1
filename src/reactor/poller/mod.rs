//! Platform-specific I/O poller abstraction.
//!
//! The poller is used by the reactor to wait for readiness on the file
//! descriptors it has registered. Registrations are one-shot: once a
//! descriptor reports readiness it stays silent until it is re-armed.
//!
//! Only the Linux `epoll` backend exists; the wake channel of the
//! command base relies on `eventfd`, which is Linux-specific as well.

pub(crate) mod common;

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(target_os = "linux")]
pub(crate) type Poller = epoll::EpollPoller;

#[cfg(unix)]
pub(crate) mod unix;

#[cfg(unix)]
pub(crate) use unix as platform;
