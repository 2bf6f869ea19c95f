//! Reactor interface and the bundled epoll reactor.
//!
//! The reactor owns the readiness-multiplexing loop. Components that want to
//! be driven by it hand over an [`EventDescriptor`]: a file descriptor, the
//! readiness it is interested in, an opaque piece of user data and the
//! handler the reactor calls when the descriptor becomes ready.
//!
//! Timers only rely on the narrow [`Reactor`] trait, so any multiplexer that
//! can register and deregister descriptors can drive them. [`EpollReactor`]
//! is the level-triggered Linux implementation shipped with the crate.

mod builder;
mod epoll;
mod event;

pub use builder::ReactorBuilder;
pub use epoll::EpollReactor;
pub use event::{Event, EventDescriptor, Handler, Interest};

use std::io;
use std::os::fd::RawFd;
use thiserror::Error;

/// Errors reported by a [`Reactor`] implementation.
///
/// Timer operations forward these verbatim through
/// [`Error::Reactor`](crate::Error::Reactor).
#[derive(Debug, Error)]
pub enum ReactorError {
    #[error("invalid file descriptor {0}")]
    BadDescriptor(RawFd),

    #[error("file descriptor {0} is already registered")]
    AlreadyRegistered(RawFd),

    #[error("file descriptor {0} is not registered")]
    NotRegistered(RawFd),

    #[error("readiness registration of file descriptor {fd} failed")]
    Os {
        fd: RawFd,
        #[source]
        source: io::Error,
    },
}

/// The registration surface a timer needs from an event reactor.
///
/// Implementations must be synchronous: a descriptor is live as soon as
/// [`register`](Reactor::register) returns `Ok`, and no handler is invoked
/// for it once [`deregister`](Reactor::deregister) returns `Ok`.
pub trait Reactor {
    /// Adds a descriptor to the multiplexer.
    ///
    /// The reactor keeps the descriptor until it is deregistered.
    fn register(&self, descriptor: EventDescriptor) -> Result<(), ReactorError>;

    /// Removes the registration keyed by `fd` and hands the stored
    /// descriptor back.
    fn deregister(&self, fd: RawFd) -> Result<EventDescriptor, ReactorError>;
}
