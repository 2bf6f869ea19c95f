//! Linux `epoll`-based reactor.
//!
//! Descriptors are registered level-triggered: a descriptor that is still
//! ready after its handler returns is reported again on the next poll. The
//! epoll user data of every registration is the descriptor itself, which
//! keys the descriptor table.
//!
//! Handlers run with no internal borrow held, so they are free to register
//! or deregister descriptors, including their own.

use super::builder::ReactorBuilder;
use super::event::{Event, EventDescriptor, Interest};
use super::{Reactor, ReactorError};
use crate::sys::{sys_close, sys_epoll_create, sys_epoll_ctl, sys_epoll_wait};

use libc::{
    EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLLERR, EPOLLHUP, EPOLLIN, EPOLLOUT, c_int, epoll_event,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io;
use std::os::fd::RawFd;
use std::time::Duration;
use tracing::{debug, trace};

/// Level-triggered `epoll` reactor.
///
/// This reactor owns:
/// - an `epoll` instance,
/// - a reusable readiness buffer,
/// - the table of registered descriptors.
///
/// It is single-threaded: registration, polling and dispatch all happen on
/// the thread that owns it.
pub struct EpollReactor {
    /// Epoll file descriptor.
    epoll: RawFd,

    /// Reusable buffer for epoll events.
    events: RefCell<Vec<epoll_event>>,

    /// Registered descriptors, keyed by file descriptor.
    descriptors: RefCell<HashMap<RawFd, EventDescriptor>>,

    /// Cleared by [`stop`](Self::stop) to end [`run`](Self::run).
    running: Cell<bool>,
}

impl EpollReactor {
    /// Creates a reactor with the default configuration.
    pub fn new() -> io::Result<Self> {
        ReactorBuilder::new().build()
    }

    /// Returns a builder for configuring a reactor.
    pub fn builder() -> ReactorBuilder {
        ReactorBuilder::new()
    }

    pub(crate) fn with_capacity(capacity: usize) -> io::Result<Self> {
        let epoll = sys_epoll_create()?;
        debug!(epoll, capacity, "epoll reactor created");

        Ok(Self {
            epoll,
            events: RefCell::new(Vec::with_capacity(capacity)),
            descriptors: RefCell::new(HashMap::new()),
            running: Cell::new(false),
        })
    }

    /// Returns `true` if `fd` is currently registered.
    pub fn is_registered(&self, fd: RawFd) -> bool {
        self.descriptors.borrow().contains_key(&fd)
    }

    /// Returns the number of registered descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.borrow().len()
    }

    /// Returns `true` if no descriptor is registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.borrow().is_empty()
    }

    /// Waits for readiness and dispatches every ready descriptor once.
    ///
    /// Blocks until at least one descriptor is ready or the optional
    /// timeout expires. An interrupted wait dispatches nothing.
    ///
    /// Returns the number of handlers invoked.
    pub fn poll_once(&self, timeout: Option<Duration>) -> io::Result<usize> {
        let timeout_ms = timeout
            .map(|t| t.as_nanos().div_ceil(1_000_000).min(c_int::MAX as u128) as c_int)
            .unwrap_or(-1);

        let ready: Vec<Event> = {
            let mut events = self.events.borrow_mut();

            match sys_epoll_wait(self.epoll, &mut events, timeout_ms) {
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::Interrupted => return Ok(0),
                Err(err) => return Err(err),
            }

            events.iter().map(to_event).collect()
        };

        let mut dispatched = 0;

        for event in ready {
            let target = self
                .descriptors
                .borrow()
                .get(&event.fd)
                .map(|descriptor| (descriptor.handler, descriptor.data.clone()));

            // Deregistered by an earlier handler in this batch.
            let Some((handler, data)) = target else {
                trace!(fd = event.fd, "dropping event for deregistered descriptor");
                continue;
            };

            handler(self, event, &data);
            dispatched += 1;
        }

        Ok(dispatched)
    }

    /// Runs the dispatch loop until [`stop`](Self::stop) is called.
    ///
    /// With no registered descriptor this blocks forever.
    pub fn run(&self) -> io::Result<()> {
        self.running.set(true);
        debug!(epoll = self.epoll, "reactor loop started");

        while self.running.get() {
            self.poll_once(None)?;
        }

        debug!(epoll = self.epoll, "reactor loop stopped");
        Ok(())
    }

    /// Ends [`run`](Self::run) after the current dispatch batch.
    pub fn stop(&self) {
        self.running.set(false);
    }
}

impl Reactor for EpollReactor {
    fn register(&self, descriptor: EventDescriptor) -> Result<(), ReactorError> {
        let fd = descriptor.fd;

        if fd < 0 {
            return Err(ReactorError::BadDescriptor(fd));
        }

        let mut descriptors = self.descriptors.borrow_mut();

        if descriptors.contains_key(&fd) {
            return Err(ReactorError::AlreadyRegistered(fd));
        }

        let mut event = epoll_event {
            events: interest_flags(descriptor.interest),
            u64: fd as u64,
        };

        sys_epoll_ctl(self.epoll, EPOLL_CTL_ADD, fd, Some(&mut event))
            .map_err(|source| ReactorError::Os { fd, source })?;

        descriptors.insert(fd, descriptor);
        trace!(fd, "descriptor registered");

        Ok(())
    }

    fn deregister(&self, fd: RawFd) -> Result<EventDescriptor, ReactorError> {
        let mut descriptors = self.descriptors.borrow_mut();

        if !descriptors.contains_key(&fd) {
            return Err(ReactorError::NotRegistered(fd));
        }

        sys_epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, None)
            .map_err(|source| ReactorError::Os { fd, source })?;

        trace!(fd, "descriptor deregistered");

        descriptors
            .remove(&fd)
            .ok_or(ReactorError::NotRegistered(fd))
    }
}

impl Drop for EpollReactor {
    fn drop(&mut self) {
        let _ = sys_close(self.epoll);
    }
}

/// Translates an interest into level-triggered epoll flags.
fn interest_flags(interest: Interest) -> u32 {
    let mut flags = 0;

    if interest.read {
        flags |= EPOLLIN;
    }
    if interest.write {
        flags |= EPOLLOUT;
    }

    flags as u32
}

fn to_event(ev: &epoll_event) -> Event {
    let bits = ev.events;
    let fd = ev.u64 as RawFd;

    Event {
        fd,
        readable: bits & ((EPOLLIN | EPOLLERR | EPOLLHUP) as u32) != 0,
        writable: bits & (EPOLLOUT as u32) != 0,
    }
}
