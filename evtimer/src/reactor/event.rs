use super::Reactor;

use std::any::Any;
use std::os::fd::RawFd;
use std::rc::Rc;

/// Readiness a descriptor is registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interest {
    pub read: bool,
    pub write: bool,
}

impl Interest {
    /// Interest in read readiness only.
    pub const READABLE: Interest = Interest {
        read: true,
        write: false,
    };

    /// Interest in write readiness only.
    pub const WRITABLE: Interest = Interest {
        read: false,
        write: true,
    };
}

/// A readiness event reported by the reactor.
///
/// The event identifies the ready descriptor and whether it is readable,
/// writable, or both. Error and hang-up conditions are folded into
/// `readable` so the owner observes them on its next read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event {
    /// The descriptor that became ready.
    pub fd: RawFd,

    /// Indicates that the descriptor is readable.
    pub readable: bool,

    /// Indicates that the descriptor is writable.
    pub writable: bool,
}

/// Function invoked by the reactor when a registered descriptor is ready.
///
/// It receives the reactor that dispatched it, the readiness event and the
/// user data stored in the [`EventDescriptor`].
pub type Handler = fn(&dyn Reactor, Event, &Rc<dyn Any>);

/// The registration unit tracked by a reactor.
#[derive(Debug)]
pub struct EventDescriptor {
    /// Descriptor to watch.
    pub fd: RawFd,

    /// Readiness to watch for.
    pub interest: Interest,

    /// Opaque data handed back to `handler` on every dispatch.
    pub data: Rc<dyn Any>,

    /// Function called on readiness.
    pub handler: Handler,
}

impl EventDescriptor {
    /// Invokes the handler with this descriptor's user data.
    pub fn dispatch(&self, reactor: &dyn Reactor, event: Event) {
        (self.handler)(reactor, event, &self.data);
    }
}
