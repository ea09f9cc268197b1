use super::channel::{CommandSender, channel};
use super::completion::Completion;
use super::dispatch::Dispatcher;
use super::task::{AsyncJob, Command, Outcome, Scope, SyncJob};
use crate::error::{CommandError, Rejected};
use crate::reactor::context::is_current;
use crate::reactor::{Interest, Reactor, Token};

use parking_lot::Mutex;
use std::os::fd::RawFd;
use std::sync::mpsc;
use tracing::{debug, error};

/// Callback run on the reactor thread when the command base shuts down.
pub type ExitHook = Box<dyn FnOnce() + Send>;

/// Bottom-half type used when a command has none.
type NoBottomHalf<A> = fn(&mut A, &mut Scope<'_>) -> i32;

/// Runs closures on a reactor thread on behalf of any other thread.
///
/// A `CommandBase` is bound to one [`Reactor`]. Any thread can hand it a
/// function and an argument; the function runs on the thread driving
/// that reactor, where it may freely touch reactor-owned state.
///
/// - [`exec_sync`](Self::exec_sync) blocks until the function (and its
///   bottom half, if any) has finished, and returns the result code.
/// - [`exec_async`](Self::exec_async) returns as soon as the command is
///   queued; the argument is dropped on the reactor thread afterwards.
///
/// A blocking function may return [`Outcome::Pending`] to finish later,
/// from reactor callbacks, through [`Completion::report_step`]. Only
/// one command is pending at a time: commands submitted meanwhile wait
/// in the queue until the pending one completes.
///
/// Commands from the same thread run in submission order.
///
/// # Examples
///
/// ```rust,ignore
/// let mut reactor = Reactor::new()?;
/// let base = CommandBase::new(&mut reactor)?;
///
/// let handle = std::thread::spawn(move || reactor.run());
///
/// let ret = base.exec_sync(20, |n, _| Outcome::Done(*n + 22))?;
/// assert_eq!(ret, 42);
///
/// base.shutdown()?;
/// handle.join().unwrap()?;
/// ```
pub struct CommandBase {
    sender: CommandSender,
    completion: Completion,

    /// Reactor this base is bound to.
    reactor_id: u64,

    exit_hook: Mutex<Option<ExitHook>>,
}

impl CommandBase {
    /// Creates a command base bound to `reactor`, without an exit hook.
    pub fn new(reactor: &mut Reactor) -> Result<Self, CommandError> {
        Self::builder().build(reactor)
    }

    /// Returns a builder to configure a command base.
    pub fn builder() -> CommandBaseBuilder {
        CommandBaseBuilder::new()
    }

    /// The completion handle of this base.
    ///
    /// Reactor callbacks set up ahead of time use it to report steps of
    /// a command that goes pending later.
    pub fn completion(&self) -> Completion {
        self.completion.clone()
    }

    /// Runs `func` on the reactor thread and waits for its result code.
    ///
    /// If `func` returns [`Outcome::Pending`], this returns once the last
    /// step has been reported, with the result code of that step.
    ///
    /// A full queue makes the caller wait for room rather than fail.
    ///
    /// Fails with [`CommandError::ReactorThread`] when called from the
    /// reactor's own thread, where waiting would never end.
    pub fn exec_sync<A, F>(&self, arg: A, func: F) -> Result<i32, CommandError>
    where
        A: Send + 'static,
        F: FnOnce(&mut A, &mut Scope<'_>) -> Outcome + Send + 'static,
    {
        self.submit_sync(arg, func, None::<NoBottomHalf<A>>)
            .map(|(ret, _)| ret)
    }

    /// Like [`exec_sync`](Self::exec_sync), then runs `bottom_half` on the
    /// reactor thread before the caller is released.
    ///
    /// When `func` returns [`Outcome::Done`], the bottom half only runs if
    /// the result code is `0`. After a pending command's last step it
    /// always runs. Its return value replaces the result code.
    pub fn exec_sync_bh<A, F, B>(&self, arg: A, func: F, bottom_half: B) -> Result<i32, CommandError>
    where
        A: Send + 'static,
        F: FnOnce(&mut A, &mut Scope<'_>) -> Outcome + Send + 'static,
        B: FnOnce(&mut A, &mut Scope<'_>) -> i32 + Send + 'static,
    {
        self.submit_sync(arg, func, Some(bottom_half))
            .map(|(ret, _)| ret)
    }

    /// Like [`exec_sync`](Self::exec_sync), but also hands the argument
    /// back, so values the function stored in it can be read.
    pub fn exec_sync_returning<A, F>(&self, arg: A, func: F) -> Result<(i32, A), CommandError>
    where
        A: Send + 'static,
        F: FnOnce(&mut A, &mut Scope<'_>) -> Outcome + Send + 'static,
    {
        self.submit_sync(arg, func, None::<NoBottomHalf<A>>)
    }

    /// Queues `func` to run on the reactor thread and returns immediately.
    ///
    /// On success the argument belongs to the reactor thread, which
    /// drops it once `func` has returned. On failure, including a full
    /// queue, it comes back in the [`Rejected`] error.
    ///
    /// The function returns a plain result code: a non-blocking command
    /// has nobody to report completion to, so it cannot go pending.
    pub fn exec_async<A, F>(&self, arg: A, func: F) -> Result<(), Rejected<A>>
    where
        A: Send + 'static,
        F: FnOnce(&mut A, &mut Scope<'_>) -> i32 + Send + 'static,
    {
        let permit = match self.sender.reserve() {
            Ok(permit) => permit,
            Err(err) => {
                error!(target: "commands", error = %err, "error sending non-blocking command");
                return Err(Rejected::new(err, arg));
            }
        };

        permit.push(Command::nonblocking(Box::new(AsyncJob::new(arg, func))));
        Ok(())
    }

    fn submit_sync<A, F, B>(
        &self,
        arg: A,
        func: F,
        bottom_half: Option<B>,
    ) -> Result<(i32, A), CommandError>
    where
        A: Send + 'static,
        F: FnOnce(&mut A, &mut Scope<'_>) -> Outcome + Send + 'static,
        B: FnOnce(&mut A, &mut Scope<'_>) -> i32 + Send + 'static,
    {
        if is_current(self.reactor_id) {
            error!(target: "commands", "programming error: blocking command sent from the reactor thread");
            return Err(CommandError::ReactorThread);
        }

        let (reply, done) = mpsc::sync_channel(1);

        let permit = self.sender.reserve_blocking().inspect_err(|err| {
            error!(target: "commands", error = %err, "error sending blocking command");
        })?;

        let job = SyncJob::new(arg, func, bottom_half, reply);
        permit.push(Command::blocking(Box::new(job)));

        done.recv().map_err(|_| CommandError::Lost)
    }

    /// Stops the reactor through the command queue and releases the base.
    ///
    /// A final blocking command runs the exit hook (if any), removes the
    /// base's registration and stops the reactor. Commands queued ahead
    /// of it run first; a pending command is completed first.
    ///
    /// Must not be called from the reactor thread.
    pub fn shutdown(self) -> Result<(), CommandError> {
        let exit_hook = self.exit_hook.lock().take();

        self.exec_sync(exit_hook, |exit_hook, scope| {
            if let Some(exit_hook) = exit_hook.take() {
                exit_hook();
            }

            scope.release();
            scope.reactor().stop();

            Outcome::Done(0)
        })?;

        debug!(target: "commands", "command base shut down");
        Ok(())
    }
}

/// Builder for configuring and creating a command base.
///
/// # Examples
///
/// ```rust,ignore
/// let base = CommandBase::builder()
///     .capacity(256)
///     .exit_hook(|| tracing::info!("pipe watcher exiting"))
///     .build(&mut reactor)?;
/// ```
pub struct CommandBaseBuilder {
    /// Maximum number of commands waiting in the queue.
    capacity: usize,

    exit_hook: Option<ExitHook>,
}

impl CommandBaseBuilder {
    /// Creates a new `CommandBaseBuilder` with default configuration.
    ///
    /// By default up to 8192 commands may wait in the queue and there is
    /// no exit hook.
    pub fn new() -> Self {
        Self {
            capacity: 8192,
            exit_hook: None,
        }
    }

    /// Sets how many commands may wait in the queue.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn capacity(mut self, n: usize) -> Self {
        assert!(n > 0, "capacity must be > 0");

        self.capacity = n;
        self
    }

    /// Sets a callback run on the reactor thread during
    /// [`CommandBase::shutdown`], before the reactor is stopped.
    pub fn exit_hook<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.exit_hook = Some(Box::new(hook));
        self
    }

    /// Creates the command channel and registers it with `reactor`.
    ///
    /// On failure nothing stays registered with the reactor.
    pub fn build(self, reactor: &mut Reactor) -> Result<CommandBase, CommandError> {
        let (sender, receiver) = channel(self.capacity).map_err(|err| {
            error!(target: "commands", error = %err, "could not create command channel");
            CommandError::Setup(err)
        })?;

        let completion = Completion::new();
        let fd = receiver.fd();

        let dispatcher = Dispatcher::new(receiver, completion.clone());
        let token = register_dispatcher(reactor, fd, dispatcher)?;

        completion.bind(token);

        Ok(CommandBase {
            sender,
            completion,
            reactor_id: reactor.id(),
            exit_hook: Mutex::new(self.exit_hook),
        })
    }
}

/// Registers the dispatcher for readability of `fd` and arms it.
///
/// On failure nothing stays registered with the reactor.
fn register_dispatcher(
    reactor: &mut Reactor,
    fd: RawFd,
    mut dispatcher: Dispatcher,
) -> Result<Token, CommandError> {
    let token = reactor.register(fd, Interest::READABLE, move |reactor, _| {
        dispatcher.dispatch(reactor)
    });

    if let Err(err) = reactor.arm(token) {
        error!(target: "commands", error = %err, "could not add command event");
        reactor.deregister(token);
        return Err(CommandError::Setup(err));
    }

    Ok(token)
}

impl Default for CommandBaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
