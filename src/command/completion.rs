use super::task::{Command, Scope};
use crate::reactor::{Reactor, Token};

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error};

/// Reactor-side state of a command base.
#[derive(Default)]
struct Slot {
    /// The command that reported [`Outcome::Pending`](super::Outcome::Pending), if any.
    current: Option<Command>,

    /// Registration of the wake channel; `None` once released.
    token: Option<Token>,
}

/// Reports progress on the pending command of a command base.
///
/// A blocking command whose primary function returns
/// [`Outcome::Pending(n)`](super::Outcome::Pending) stays pending until
/// `n` calls to [`report_step`](Self::report_step) have been made from
/// reactor callbacks. Until then its caller stays blocked, and the
/// command base does not take any further commands off its queue.
///
/// The handle is cheap to clone; move a clone into every callback that
/// completes a step.
#[derive(Clone, Default)]
pub struct Completion {
    slot: Arc<Mutex<Slot>>,
}

impl Completion {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bind(&self, token: Token) {
        self.slot.lock().token = Some(token);
    }

    /// Removes the wake channel registration from the reactor.
    pub(crate) fn release(&self, reactor: &mut Reactor) {
        let token = self.slot.lock().token.take();

        if let Some(token) = token {
            reactor.deregister(token);
        }
    }

    /// Re-arms the wake channel so the next command is picked up.
    pub(crate) fn rearm(&self, reactor: &mut Reactor) {
        let token = self.slot.lock().token;

        if let Some(token) = token {
            if let Err(err) = reactor.arm(token) {
                error!(target: "commands", error = %err, "could not re-arm command channel");
            }
        }
    }

    /// Makes `command` the pending command.
    pub(crate) fn park(&self, command: Command) {
        let mut slot = self.slot.lock();
        debug_assert!(slot.current.is_none(), "a command is already pending");

        debug!(target: "commands", pending = command.pending, "command has pending events");
        slot.current = Some(command);
    }

    /// Finishes a command whose primary function returned done.
    ///
    /// The bottom half only runs on success.
    pub(crate) fn finish(&self, reactor: &mut Reactor, mut command: Command, ret: i32) {
        command.ret = ret;

        if ret == 0 {
            command.run_bottom_half(&mut Scope::new(reactor, self));
        }

        command.complete();
        self.rearm(reactor);
    }

    /// Returns `true` while a command is pending.
    pub fn is_pending(&self) -> bool {
        self.slot.lock().current.is_some()
    }

    /// Result code stored on the pending command, or `0` if none is pending.
    ///
    /// Before any step is reported this is the step count the primary
    /// function returned; afterwards it is the value of the latest
    /// [`report_step`](Self::report_step).
    pub fn current_result(&self) -> i32 {
        self.slot
            .lock()
            .current
            .as_ref()
            .map_or(0, |command| command.ret)
    }

    /// Reports one finished step of the pending command.
    ///
    /// Stores `ret` as the command's result code. When the last step is
    /// reported, the bottom half runs (whatever `ret` is), the blocked
    /// caller is released with the final result code, and the command
    /// base starts taking commands again.
    ///
    /// Does nothing if no command is pending.
    pub fn report_step(&self, reactor: &mut Reactor, ret: i32) {
        let finished = {
            let mut slot = self.slot.lock();

            let Some(command) = slot.current.as_mut() else {
                return;
            };

            command.pending = command.pending.saturating_sub(1);
            command.ret = ret;

            debug!(target: "commands", pending = command.pending, "command has pending events");

            if command.pending > 0 {
                return;
            }

            slot.current.take()
        };

        if let Some(mut command) = finished {
            command.run_bottom_half(&mut Scope::new(reactor, self));
            command.complete();

            self.rearm(reactor);
        }
    }
}
