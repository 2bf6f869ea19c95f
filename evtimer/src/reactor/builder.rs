use super::EpollReactor;

use std::io;

/// Default number of readiness events collected per `epoll_wait` call.
const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Builder for configuring and creating an [`EpollReactor`].
///
/// # Examples
///
/// ```rust,ignore
/// let reactor = ReactorBuilder::new()
///     .event_capacity(128)
///     .build()?;
/// ```
pub struct ReactorBuilder {
    /// Size of the readiness event buffer.
    event_capacity: usize,
}

impl ReactorBuilder {
    /// Creates a new `ReactorBuilder` with default configuration.
    pub fn new() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Sets how many readiness events a single poll can collect.
    ///
    /// Descriptors that are still ready after a full buffer are reported
    /// again on the next poll, since the reactor is level-triggered.
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
    pub fn build(self) -> io::Result<EpollReactor> {
        EpollReactor::with_capacity(self.event_capacity)
    }
}

impl Default for ReactorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
