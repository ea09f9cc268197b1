//! Reactor core and event handling.
//!
//! The reactor is the single-threaded event loop that every command
//! base is bound to. It is responsible for:
//! - driving one-shot I/O readiness registrations,
//! - managing timers,
//! - running all callbacks on the thread that drives it.
//!
//! Code on other threads never touches the reactor directly; it goes
//! through a [`CommandBase`](crate::CommandBase).

mod builder;
mod core;
mod event;
mod poller;
mod timer;

pub(crate) mod context;

pub use builder::ReactorBuilder;
pub use self::core::{Reactor, Token};
pub use poller::common::Interest;

pub(crate) use poller::platform;
