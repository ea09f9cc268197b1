use super::channel::CommandReceiver;
use super::completion::Completion;
use super::task::{Command, Outcome, Scope};
use crate::reactor::Reactor;

use tracing::{error, trace};

/// Reactor callback for the wake channel.
///
/// Takes one command per readiness report and runs it. The channel is
/// re-armed once the command is finished; a command that goes pending
/// leaves it disarmed until its last step is reported.
pub(crate) struct Dispatcher {
    receiver: CommandReceiver,
    completion: Completion,
}

impl Dispatcher {
    pub(crate) fn new(receiver: CommandReceiver, completion: Completion) -> Self {
        Self {
            receiver,
            completion,
        }
    }

    pub(crate) fn dispatch(&mut self, reactor: &mut Reactor) {
        let command = match self.receiver.recv() {
            Ok(command) => command,
            Err(err) => {
                error!(target: "commands", error = %err, "error reading command from command channel");

                self.completion.rearm(reactor);
                return;
            }
        };

        if command.is_blocking() {
            self.exec_sync(reactor, command);
        } else {
            self.exec_async(reactor, command);
        }
    }

    /// Runs a command whose caller is waiting.
    fn exec_sync(&self, reactor: &mut Reactor, mut command: Command) {
        let outcome = command.run(&mut Scope::new(reactor, &self.completion));

        match outcome {
            Outcome::Pending(steps) if steps > 0 => {
                // Caller stays blocked; the channel stays disarmed.
                command.ret = i32::try_from(steps).unwrap_or(i32::MAX);
                command.pending = steps;

                self.completion.park(command);
            }
            Outcome::Pending(_) => self.completion.finish(reactor, command, 0),
            Outcome::Done(ret) => self.completion.finish(reactor, command, ret),
        }
    }

    /// Runs a fire-and-forget command and releases it.
    fn exec_async(&self, reactor: &mut Reactor, mut command: Command) {
        let outcome = command.run(&mut Scope::new(reactor, &self.completion));
        trace!(target: "commands", ?outcome, "non-blocking command finished");

        if let Outcome::Done(ret) = outcome {
            command.ret = ret;
        }

        command.complete();
        self.completion.rearm(reactor);
    }
}
