//! # reactor-commands
//!
//! Run functions on a single-threaded event reactor from any thread.
//!
//! Services built around one event loop per subsystem (pipe readers,
//! service discovery, library scanning) own state that only the loop's
//! thread may touch. Other threads reach that state by submitting
//! commands through a [`CommandBase`]:
//!
//! - **Blocking** commands ([`CommandBase::exec_sync`]) wait for the
//!   function, and an optional bottom half, to finish and return its
//!   result code.
//! - **Non-blocking** commands ([`CommandBase::exec_async`]) are queued
//!   and forgotten; the reactor thread drops their argument when done.
//! - A blocking function that cannot finish within one dispatch returns
//!   [`Outcome::Pending`] with a step count. Reactor callbacks report
//!   each step through [`Completion::report_step`], and the caller is
//!   released after the last one.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reactor_commands::{CommandBase, Outcome, Reactor};
//! use std::thread;
//!
//! let mut reactor = Reactor::new()?;
//! let base = CommandBase::builder()
//!     .exit_hook(|| println!("reactor exiting"))
//!     .build(&mut reactor)?;
//!
//! let handle = thread::spawn(move || reactor.run());
//!
//! // Three steps, each completed by a later reactor event.
//! let ret = base.exec_sync((), |_, scope| {
//!     for _ in 0..3 {
//!         let completion = scope.completion();
//!         scope
//!             .reactor()
//!             .defer(move |reactor| completion.report_step(reactor, 0));
//!     }
//!     Outcome::Pending(3)
//! })?;
//! assert_eq!(ret, 0);
//!
//! base.shutdown()?;
//! handle.join().unwrap()?;
//! ```
//!
//! ## Modules
//!
//! - [`reactor`] — the epoll-based event loop commands run on
//! - [`command`] — command base, completion tracking, outcomes
//! - [`error`] — submission and completion errors
//!
//! Linux only: the reactor uses `epoll` and the wake channel `eventfd`.

pub mod command;
pub mod error;
pub mod reactor;

mod utils;

pub use command::{CommandBase, CommandBaseBuilder, Completion, ExitHook, Outcome, Scope};
pub use error::{CommandError, Rejected};
pub use reactor::{Interest, Reactor, ReactorBuilder, Token};
