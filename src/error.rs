//! Errors reported by the command base.

use std::fmt;
use std::io;
use thiserror::Error;

/// Why a command could not be submitted or completed.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command queue already holds its maximum number of commands.
    #[error("command queue is full ({0} commands waiting)")]
    Full(usize),

    /// The reactor side of the command base is gone.
    #[error("command base is closed")]
    Closed,

    /// The wake-up counter could not be written in one piece.
    #[error("failed to wake the reactor")]
    Wake(#[source] io::Error),

    /// The reactor could not read a wake-up from the channel.
    #[error("failed to read from the command channel")]
    Read(#[source] io::Error),

    /// The reactor was woken but no command was queued.
    #[error("command channel signalled without a queued command")]
    Empty,

    /// The command was dropped before it reported completion.
    #[error("command was dropped before completing")]
    Lost,

    /// A blocking command was submitted from the reactor's own thread.
    #[error("blocking command submitted from the reactor thread")]
    ReactorThread,

    /// The command channel could not be created or registered.
    #[error("failed to set up the command channel")]
    Setup(#[source] io::Error),
}

/// A non-blocking submission that was refused.
///
/// The argument of the command is handed back to the caller, who keeps
/// ownership of it.
#[derive(Error)]
#[error("command rejected")]
pub struct Rejected<A> {
    #[source]
    error: CommandError,
    arg: A,
}

impl<A> Rejected<A> {
    pub(crate) fn new(error: CommandError, arg: A) -> Self {
        Self { error, arg }
    }

    /// Why the submission failed.
    pub fn error(&self) -> &CommandError {
        &self.error
    }

    /// Returns the argument the command would have consumed.
    pub fn into_inner(self) -> A {
        self.arg
    }

    /// Splits the rejection into its error and argument.
    pub fn into_parts(self) -> (CommandError, A) {
        (self.error, self.arg)
    }
}

impl<A> fmt::Debug for Rejected<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
