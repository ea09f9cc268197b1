use std::cell::Cell;

thread_local! {
    /// Identifier of the reactor currently running on this thread.
    ///
    /// This is set for the duration of [`Reactor::run`](super::Reactor::run)
    /// and lets the command base detect a blocking submission that would
    /// wait on its own thread.
    static CURRENT_REACTOR: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Marks the current thread as running reactor `id` while `f` executes.
///
/// The previous marker is restored afterwards, so nested loops on the
/// same thread behave.
pub(crate) fn enter_context<R>(id: u64, f: impl FnOnce() -> R) -> R {
    let prev = CURRENT_REACTOR.with(|cell| cell.replace(Some(id)));
    let out = f();
    CURRENT_REACTOR.with(|cell| cell.set(prev));

    out
}

/// Returns `true` if this thread is currently driving reactor `id`.
pub(crate) fn is_current(id: u64) -> bool {
    CURRENT_REACTOR.with(|cell| cell.get() == Some(id))
}
