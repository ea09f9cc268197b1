use super::Reactor;

use std::io;

/// Builder for configuring and creating a reactor.
///
/// # Examples
///
/// ```rust,ignore
/// let reactor = Reactor::builder()
///     .event_capacity(128)
///     .build()?;
/// ```
pub struct ReactorBuilder {
    /// Maximum number of readiness events collected per poll.
    event_capacity: usize,
}

impl ReactorBuilder {
    /// Creates a new `ReactorBuilder` with default configuration.
    ///
    /// By default, up to 64 events are collected per poll.
    pub fn new() -> Self {
        Self { event_capacity: 64 }
    }

    /// Sets how many readiness events are collected per poll.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn event_capacity(mut self, n: usize) -> Self {
        assert!(n > 0, "event_capacity must be > 0");

        self.event_capacity = n;
        self
    }

    /// Builds the reactor with the configured options.
    pub fn build(self) -> io::Result<Reactor> {
        Reactor::with_capacity(self.event_capacity)
    }
}

impl Default for ReactorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
