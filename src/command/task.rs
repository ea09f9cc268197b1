use super::completion::Completion;
use crate::reactor::Reactor;

use std::sync::mpsc::SyncSender;
use tracing::trace;

/// How a blocking command's primary function finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The function finished with this result code. `0` means success.
    Done(i32),

    /// The function handed work off to further reactor events and is
    /// waiting for this many [`Completion::report_step`] calls.
    ///
    /// The count also becomes the command's initial result code, as
    /// seen by [`Completion::current_result`].
    Pending(u32),
}

/// What a command's function gets to work with on the reactor thread.
pub struct Scope<'a> {
    reactor: &'a mut Reactor,
    completion: &'a Completion,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(reactor: &'a mut Reactor, completion: &'a Completion) -> Self {
        Self {
            reactor,
            completion,
        }
    }

    /// The reactor the command runs on, for registering follow-up events.
    pub fn reactor(&mut self) -> &mut Reactor {
        self.reactor
    }

    /// A handle follow-up events use to report progress on a pending command.
    pub fn completion(&self) -> Completion {
        self.completion.clone()
    }

    /// Result code of the pending command, or `0` if none is pending.
    pub fn current_result(&self) -> i32 {
        self.completion.current_result()
    }

    /// Removes the command base's registration from the reactor.
    pub(crate) fn release(&mut self) {
        self.completion.release(self.reactor);
    }
}

/// A unit of work with its argument, type-erased for the channel.
pub(crate) trait Job: Send {
    /// Runs the primary function.
    fn run(&mut self, scope: &mut Scope<'_>) -> Outcome;

    /// Runs the bottom half, if there is one, returning its result code.
    fn run_bottom_half(&mut self, scope: &mut Scope<'_>) -> Option<i32>;

    /// Hands the final result to whoever waits for it, releasing the argument.
    fn complete(self: Box<Self>, ret: i32);
}

/// A command in flight between a submitting thread and the reactor.
pub(crate) struct Command {
    job: Box<dyn Job>,

    /// Whether the submitting thread waits for completion.
    blocking: bool,

    /// Last reported result code.
    pub(crate) ret: i32,

    /// Outstanding steps while the command is pending.
    pub(crate) pending: u32,
}

impl Command {
    pub(crate) fn blocking(job: Box<dyn Job>) -> Self {
        Self {
            job,
            blocking: true,
            ret: 0,
            pending: 0,
        }
    }

    pub(crate) fn nonblocking(job: Box<dyn Job>) -> Self {
        Self {
            job,
            blocking: false,
            ret: 0,
            pending: 0,
        }
    }

    pub(crate) fn is_blocking(&self) -> bool {
        self.blocking
    }

    pub(crate) fn run(&mut self, scope: &mut Scope<'_>) -> Outcome {
        self.job.run(scope)
    }

    /// Runs the bottom half and stores its result code.
    pub(crate) fn run_bottom_half(&mut self, scope: &mut Scope<'_>) {
        if let Some(ret) = self.job.run_bottom_half(scope) {
            self.ret = ret;
        }
    }

    pub(crate) fn complete(self) {
        self.job.complete(self.ret);
    }
}

/// A command whose submitter blocks until it completes.
///
/// The argument travels back to the submitter together with the result.
pub(crate) struct SyncJob<A, F, B> {
    arg: A,
    func: Option<F>,
    bottom_half: Option<B>,
    reply: SyncSender<(i32, A)>,
}

impl<A, F, B> SyncJob<A, F, B>
where
    A: Send + 'static,
    F: FnOnce(&mut A, &mut Scope<'_>) -> Outcome + Send + 'static,
    B: FnOnce(&mut A, &mut Scope<'_>) -> i32 + Send + 'static,
{
    pub(crate) fn new(
        arg: A,
        func: F,
        bottom_half: Option<B>,
        reply: SyncSender<(i32, A)>,
    ) -> Self {
        Self {
            arg,
            func: Some(func),
            bottom_half,
            reply,
        }
    }
}

impl<A, F, B> Job for SyncJob<A, F, B>
where
    A: Send,
    F: FnOnce(&mut A, &mut Scope<'_>) -> Outcome + Send,
    B: FnOnce(&mut A, &mut Scope<'_>) -> i32 + Send,
{
    fn run(&mut self, scope: &mut Scope<'_>) -> Outcome {
        match self.func.take() {
            Some(func) => func(&mut self.arg, scope),
            None => Outcome::Done(0),
        }
    }

    fn run_bottom_half(&mut self, scope: &mut Scope<'_>) -> Option<i32> {
        let bottom_half = self.bottom_half.take()?;
        Some(bottom_half(&mut self.arg, scope))
    }

    fn complete(self: Box<Self>, ret: i32) {
        let SyncJob { arg, reply, .. } = *self;

        // The submitter only goes away if its thread panicked.
        if reply.send((ret, arg)).is_err() {
            trace!(target: "commands", ret, "blocking caller no longer waiting");
        }
    }
}

/// A fire-and-forget command. Its argument is dropped once the function returns.
pub(crate) struct AsyncJob<A, F> {
    arg: A,
    func: Option<F>,
}

impl<A, F> AsyncJob<A, F>
where
    A: Send + 'static,
    F: FnOnce(&mut A, &mut Scope<'_>) -> i32 + Send + 'static,
{
    pub(crate) fn new(arg: A, func: F) -> Self {
        Self {
            arg,
            func: Some(func),
        }
    }
}

impl<A, F> Job for AsyncJob<A, F>
where
    A: Send,
    F: FnOnce(&mut A, &mut Scope<'_>) -> i32 + Send,
{
    fn run(&mut self, scope: &mut Scope<'_>) -> Outcome {
        match self.func.take() {
            Some(func) => Outcome::Done(func(&mut self.arg, scope)),
            None => Outcome::Done(0),
        }
    }

    fn run_bottom_half(&mut self, _scope: &mut Scope<'_>) -> Option<i32> {
        None
    }

    fn complete(self: Box<Self>, ret: i32) {
        trace!(target: "commands", ret, "releasing non-blocking command");
    }
}
