use super::dispatch::dispatch;
use super::kernel::{KernelTimer, Period, TimerFd};
use crate::error::{Error, Result};
use crate::reactor::{EventDescriptor, Interest, Reactor};

use std::cell::{Cell, RefCell};
use std::os::fd::RawFd;
use std::rc::{Rc, Weak};
use tracing::{debug, trace, warn};

/// Handle value of a timer that owns no kernel timer.
pub const INVALID_FD: RawFd = -1;

/// Function invoked once per expiration with the expired timer and its
/// user data.
pub type Callback<U> = Box<dyn FnMut(&TimerHandle<U>, &U)>;

/// State shared between the timer storage and its reactor registration.
///
/// The registration's user data points back here, which is how the
/// dispatch handler finds the callback.
pub(super) struct Shared<U: 'static> {
    /// Reactor the timer is registered with. Non-owning.
    pub(super) reactor: Weak<dyn Reactor>,

    /// Backend owning the kernel timer object.
    pub(super) kernel: Rc<dyn KernelTimer>,

    /// Kernel timer descriptor, [`INVALID_FD`] once released.
    pub(super) fd: Cell<RawFd>,

    /// Set when a teardown failed. The descriptor may already be closed or
    /// reused, so it is never touched again.
    pub(super) dirty: Cell<bool>,

    pub(super) callback: RefCell<Callback<U>>,

    pub(super) data: U,
}

/// A live timer.
///
/// Handles are cheap to clone and are what callbacks receive. They can
/// re-arm or disarm the timer but not destroy it; teardown goes through the
/// owning [`Timer`].
pub struct TimerHandle<U: 'static> {
    pub(super) shared: Rc<Shared<U>>,
}

impl<U: 'static> Clone for TimerHandle<U> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<U: 'static> TimerHandle<U> {
    /// Returns the kernel timer descriptor, or [`INVALID_FD`] once destroyed.
    pub fn fd(&self) -> RawFd {
        self.shared.fd.get()
    }

    /// Returns the user data supplied at creation.
    pub fn user_data(&self) -> &U {
        &self.shared.data
    }

    /// Arms the timer to fire every `period_ms` milliseconds, the first time
    /// one period from now.
    ///
    /// Re-arming an armed timer replaces its schedule. Negative periods are
    /// rejected by the kernel and reported as [`Error::Program`].
    pub fn start(&self, period_ms: i32) -> Result<()> {
        let period = Period::from_millis(period_ms);

        self.program(period, period)
    }

    /// Disarms the timer. It stays registered with its reactor.
    ///
    /// Expirations already being delivered are not cancelled.
    pub fn stop(&self) -> Result<()> {
        self.program(Period::ZERO, Period::ZERO)
    }

    fn program(&self, interval: Period, initial: Period) -> Result<()> {
        let fd = self.shared.fd.get();

        if fd == INVALID_FD {
            return Err(Error::MissingTimer);
        }
        if self.shared.dirty.get() {
            return Err(Error::Dirty { fd });
        }

        self.shared
            .kernel
            .arm(fd, interval, initial)
            .map_err(|source| Error::Program { fd, source })?;

        trace!(
            fd,
            secs = interval.secs,
            nanos = interval.nanos,
            "timer programmed"
        );

        Ok(())
    }

    /// Deregisters the timer and releases its kernel timer.
    ///
    /// Only a complete teardown resets the descriptor to [`INVALID_FD`];
    /// any failure marks the timer dirty instead.
    fn teardown(&self) -> Result<()> {
        let shared = &self.shared;
        let fd = shared.fd.get();

        if shared.dirty.get() {
            return Err(Error::Dirty { fd });
        }

        let deregistered = match shared.reactor.upgrade() {
            Some(reactor) => reactor.deregister(fd).map(drop).map_err(Error::from),
            None => Err(Error::MissingReactor),
        };

        if let Err(err) = deregistered {
            shared.dirty.set(true);

            // The deregistration error is the one reported.
            if let Err(close_err) = shared.kernel.close(fd) {
                warn!(fd, error = %close_err, "suppressed kernel timer release failure");
            }
            return Err(err);
        }

        if let Err(source) = shared.kernel.close(fd) {
            shared.dirty.set(true);
            return Err(Error::Release { fd, source });
        }

        shared.fd.set(INVALID_FD);
        debug!(fd, "timer destroyed");

        Ok(())
    }
}

enum State<U: 'static> {
    /// Never created, or a creation was rolled back.
    Vacant,

    Live(TimerHandle<U>),

    /// A teardown failed midway. The reactor and kernel state are unknown,
    /// so nothing is reset.
    Dirty(TimerHandle<U>),

    Destroyed,
}

/// Caller-owned timer storage.
///
/// A `Timer` starts vacant, is populated by [`TimerBuilder::create`] and
/// emptied again by [`destroy`](Timer::destroy). Operations on a vacant or
/// destroyed timer fail with [`Error::MissingTimer`], and on a dirty timer
/// with [`Error::Dirty`].
///
/// Dropping a live timer destroys it, logging any failure. A timer whose
/// teardown already failed is left alone on drop.
pub struct Timer<U: 'static = ()> {
    state: State<U>,
}

impl<U: 'static> Timer<U> {
    /// Creates vacant timer storage.
    pub const fn new() -> Self {
        Self {
            state: State::Vacant,
        }
    }

    /// Returns `true` while the timer holds a kernel timer and a
    /// registration, including after a failed teardown.
    pub fn is_created(&self) -> bool {
        matches!(self.state, State::Live(_) | State::Dirty(_))
    }

    /// Returns `true` once [`destroy`](Self::destroy) has completed.
    pub fn is_destroyed(&self) -> bool {
        matches!(self.state, State::Destroyed)
    }

    /// Returns `true` if a teardown failed and the timer was left as is.
    pub fn is_dirty(&self) -> bool {
        matches!(self.state, State::Dirty(_))
    }

    /// Returns the live timer, if any.
    ///
    /// A dirty timer still exposes its handle for inspection, but every
    /// operation through it fails with [`Error::Dirty`].
    pub fn handle(&self) -> Option<&TimerHandle<U>> {
        match &self.state {
            State::Live(handle) | State::Dirty(handle) => Some(handle),
            State::Vacant | State::Destroyed => None,
        }
    }

    /// See [`TimerHandle::start`].
    pub fn start(&self, period_ms: i32) -> Result<()> {
        self.live()?.start(period_ms)
    }

    /// See [`TimerHandle::stop`].
    pub fn stop(&self) -> Result<()> {
        self.live()?.stop()
    }

    /// Deregisters the timer from its reactor and releases the kernel timer.
    ///
    /// If deregistration fails the kernel timer is still released on a
    /// best-effort basis and the deregistration error is returned. If the
    /// release fails, [`Error::Release`] is returned. In both cases the
    /// timer is left dirty rather than reset, and later calls fail with
    /// [`Error::Dirty`] without touching the descriptor again.
    pub fn destroy(&mut self) -> Result<()> {
        let handle = self.live()?.clone();

        match handle.teardown() {
            Ok(()) => {
                self.state = State::Destroyed;
                Ok(())
            }
            Err(err) => {
                self.state = State::Dirty(handle);
                Err(err)
            }
        }
    }

    fn live(&self) -> Result<&TimerHandle<U>> {
        self.handle().ok_or(Error::MissingTimer)
    }
}

impl<U: 'static> Default for Timer<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: 'static> Drop for Timer<U> {
    fn drop(&mut self) {
        if let State::Live(_) = self.state {
            if let Err(err) = self.destroy() {
                warn!(error = %err, "failed to destroy timer on drop");
            }
        }
    }
}

/// Builder for creating a timer inside caller-owned [`Timer`] storage.
///
/// The reactor and the callback are required; the user data defaults to
/// `()` and the kernel backend to [`TimerFd`].
///
/// # Examples
///
/// ```rust,ignore
/// let mut timer = Timer::new();
///
/// TimerBuilder::with_data(counter.clone())
///     .reactor(&reactor)
///     .callback(|_timer, counter| counter.set(counter.get() + 1))
///     .create(&mut timer)?;
/// ```
pub struct TimerBuilder<U: 'static = ()> {
    reactor: Option<Weak<dyn Reactor>>,
    callback: Option<Callback<U>>,
    kernel: Rc<dyn KernelTimer>,
    data: U,
}

impl TimerBuilder<()> {
    /// Creates a builder for a timer without user data.
    pub fn new() -> Self {
        Self::with_data(())
    }
}

impl Default for TimerBuilder<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: 'static> TimerBuilder<U> {
    /// Creates a builder whose callbacks receive `data`.
    pub fn with_data(data: U) -> Self {
        Self {
            reactor: None,
            callback: None,
            kernel: Rc::new(TimerFd),
            data,
        }
    }

    /// Sets the reactor the timer registers with.
    ///
    /// Only a weak reference is kept; the reactor must outlive the timer.
    pub fn reactor<R: Reactor + 'static>(mut self, reactor: &Rc<R>) -> Self {
        let reactor: Weak<R> = Rc::downgrade(reactor);
        let reactor: Weak<dyn Reactor> = reactor;

        self.reactor = Some(reactor);
        self
    }

    /// Sets the function invoked once per expiration.
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&TimerHandle<U>, &U) + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Replaces the kernel timer backend.
    pub fn kernel<K: KernelTimer + 'static>(mut self, kernel: Rc<K>) -> Self {
        let kernel: Rc<dyn KernelTimer> = kernel;

        self.kernel = kernel;
        self
    }

    /// Allocates a kernel timer and registers it with the reactor, storing
    /// the result in `timer`. The timer starts disarmed.
    ///
    /// Arguments are validated before anything is allocated. If the reactor
    /// rejects the registration, the kernel timer is released, `timer` is
    /// reset to vacant and the reactor's error is returned; a failure to
    /// release is logged and otherwise ignored.
    pub fn create(self, timer: &mut Timer<U>) -> Result<()> {
        let Self {
            reactor: weak,
            callback,
            kernel,
            data,
        } = self;

        let (weak, reactor) = weak
            .and_then(|weak| weak.upgrade().map(|reactor| (weak, reactor)))
            .ok_or(Error::MissingReactor)?;

        if timer.is_created() {
            return Err(Error::AlreadyCreated);
        }

        let callback = callback.ok_or(Error::MissingCallback)?;

        let fd = kernel.create().map_err(Error::Allocate)?;

        let shared = Rc::new(Shared {
            reactor: weak,
            kernel,
            fd: Cell::new(fd),
            dirty: Cell::new(false),
            callback: RefCell::new(callback),
            data,
        });

        let descriptor = EventDescriptor {
            fd,
            interest: Interest::READABLE,
            data: shared.clone(),
            handler: dispatch::<U>,
        };

        if let Err(err) = reactor.register(descriptor) {
            // The registration error is the one reported.
            if let Err(close_err) = shared.kernel.close(fd) {
                warn!(fd, error = %close_err, "suppressed kernel timer release failure");
            }
            shared.fd.set(INVALID_FD);
            timer.state = State::Vacant;

            return Err(err.into());
        }

        debug!(fd, "timer created");
        timer.state = State::Live(TimerHandle { shared });

        Ok(())
    }
}
