//! Cross-thread command execution on a reactor.
//!
//! A [`CommandBase`] lets any thread run a function on the thread that
//! drives a [`Reactor`](crate::Reactor), either waiting for its result
//! or firing and forgetting.
//!
//! Pieces, leaves first:
//! - the wake channel carries commands to the reactor and wakes it,
//! - the dispatcher takes one command per wake-up and runs it,
//! - the [`Completion`] tracker finishes commands that went pending,
//! - [`CommandBase`] ties them to one reactor and owns the lifecycle.

mod base;
mod channel;
mod completion;
mod dispatch;
mod task;

pub use base::{CommandBase, CommandBaseBuilder, ExitHook};
pub use completion::Completion;
pub use task::{Outcome, Scope};
