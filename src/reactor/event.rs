/// An I/O event reported by the poller.
///
/// An `Event` represents readiness information for a registered
/// file descriptor. It is produced by the poller and consumed
/// by the reactor to run the matching registration's callback.
pub(crate) struct Event {
    /// User data stored with the registered file descriptor.
    ///
    /// This is the registration's packed [`Token`](super::Token).
    pub(crate) key: u64,

    /// Indicates that the file descriptor is readable (or hung up).
    pub(crate) readable: bool,

    /// Indicates that the file descriptor is writable.
    pub(crate) writable: bool,
}
