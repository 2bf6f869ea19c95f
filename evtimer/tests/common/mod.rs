#![allow(dead_code)]

use evtimer::reactor::{Event, EventDescriptor, Reactor, ReactorError};
use evtimer::time::{KernelTimer, Period};

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io;
use std::os::fd::RawFd;
use std::rc::Rc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Installs a test-friendly subscriber, honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Reactor that records calls and can be told to fail.
#[derive(Default)]
pub struct FakeReactor {
    descriptors: RefCell<HashMap<RawFd, EventDescriptor>>,
    pub registers: Cell<usize>,
    pub deregisters: Cell<usize>,
    pub fail_register: Cell<bool>,
    pub fail_deregister: Cell<bool>,
}

impl FakeReactor {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn is_registered(&self, fd: RawFd) -> bool {
        self.descriptors.borrow().contains_key(&fd)
    }

    pub fn len(&self) -> usize {
        self.descriptors.borrow().len()
    }

    /// Delivers one readable notification for `fd`.
    ///
    /// Returns `false` if nothing is registered under `fd`.
    pub fn fire(&self, fd: RawFd) -> bool {
        let target = self
            .descriptors
            .borrow()
            .get(&fd)
            .map(|descriptor| (descriptor.handler, descriptor.data.clone()));

        let Some((handler, data)) = target else {
            return false;
        };

        let event = Event {
            fd,
            readable: true,
            writable: false,
        };
        handler(self, event, &data);

        true
    }
}

impl Reactor for FakeReactor {
    fn register(&self, descriptor: EventDescriptor) -> Result<(), ReactorError> {
        self.registers.set(self.registers.get() + 1);
        let fd = descriptor.fd;

        if self.fail_register.get() {
            return Err(ReactorError::Os {
                fd,
                source: io::Error::other("injected register failure"),
            });
        }

        let mut descriptors = self.descriptors.borrow_mut();
        if descriptors.contains_key(&fd) {
            return Err(ReactorError::AlreadyRegistered(fd));
        }
        descriptors.insert(fd, descriptor);

        Ok(())
    }

    fn deregister(&self, fd: RawFd) -> Result<EventDescriptor, ReactorError> {
        self.deregisters.set(self.deregisters.get() + 1);

        if self.fail_deregister.get() {
            return Err(ReactorError::Os {
                fd,
                source: io::Error::other("injected deregister failure"),
            });
        }

        self.descriptors
            .borrow_mut()
            .remove(&fd)
            .ok_or(ReactorError::NotRegistered(fd))
    }
}

#[derive(Clone, Copy, Default)]
struct Schedule {
    interval: Duration,
    remaining: Option<Duration>,
    pending: u64,
}

/// Kernel timer simulated on a virtual clock.
///
/// Mirrors `timerfd`: programming a timer clears its pending count, a zero
/// initial value disarms it, and reading drains the count.
pub struct FakeKernel {
    next_fd: Cell<RawFd>,
    schedules: RefCell<HashMap<RawFd, Schedule>>,
    pub created: Cell<usize>,
    pub closed: RefCell<Vec<RawFd>>,
    pub arms: RefCell<Vec<(RawFd, Period, Period)>>,
    pub fail_create: Cell<bool>,
    pub fail_arm: Cell<bool>,
    pub fail_close: Cell<bool>,
    pub short_read: Cell<bool>,
}

impl FakeKernel {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            next_fd: Cell::new(100),
            schedules: RefCell::new(HashMap::new()),
            created: Cell::new(0),
            closed: RefCell::new(Vec::new()),
            arms: RefCell::new(Vec::new()),
            fail_create: Cell::new(false),
            fail_arm: Cell::new(false),
            fail_close: Cell::new(false),
            short_read: Cell::new(false),
        })
    }

    /// Number of timers created and not yet closed.
    pub fn open(&self) -> usize {
        self.schedules.borrow().len()
    }

    pub fn last_arm(&self) -> Option<(RawFd, Period, Period)> {
        self.arms.borrow().last().copied()
    }

    pub fn pending(&self, fd: RawFd) -> u64 {
        self.schedules
            .borrow()
            .get(&fd)
            .map_or(0, |schedule| schedule.pending)
    }

    /// Forces `count` unread expirations on `fd`.
    pub fn set_pending(&self, fd: RawFd, count: u64) {
        if let Some(schedule) = self.schedules.borrow_mut().get_mut(&fd) {
            schedule.pending = count;
        }
    }

    /// Advances the virtual clock of `fd` by `elapsed`.
    pub fn advance(&self, fd: RawFd, elapsed: Duration) {
        let mut schedules = self.schedules.borrow_mut();
        let Some(schedule) = schedules.get_mut(&fd) else {
            return;
        };
        let Some(remaining) = schedule.remaining else {
            return;
        };

        if elapsed < remaining {
            schedule.remaining = Some(remaining - elapsed);
            return;
        }

        let left = elapsed - remaining;
        schedule.pending += 1;

        if schedule.interval.is_zero() {
            schedule.remaining = None;
            return;
        }

        let interval = schedule.interval.as_nanos();
        schedule.pending += (left.as_nanos() / interval) as u64;
        let into_period = (left.as_nanos() % interval) as u64;
        schedule.remaining = Some(schedule.interval - Duration::from_nanos(into_period));
    }
}

fn to_duration(period: Period) -> io::Result<Duration> {
    if period.secs < 0 || !(0..1_000_000_000).contains(&period.nanos) {
        return Err(io::Error::from(io::ErrorKind::InvalidInput));
    }

    Ok(Duration::new(period.secs as u64, period.nanos as u32))
}

impl KernelTimer for FakeKernel {
    fn create(&self) -> io::Result<RawFd> {
        if self.fail_create.get() {
            return Err(io::Error::other("injected create failure"));
        }

        let fd = self.next_fd.get();
        self.next_fd.set(fd + 1);
        self.created.set(self.created.get() + 1);
        self.schedules.borrow_mut().insert(fd, Schedule::default());

        Ok(fd)
    }

    fn arm(&self, fd: RawFd, interval: Period, initial: Period) -> io::Result<()> {
        self.arms.borrow_mut().push((fd, interval, initial));

        if self.fail_arm.get() {
            return Err(io::Error::other("injected arm failure"));
        }

        let interval = to_duration(interval)?;
        let initial = to_duration(initial)?;

        let mut schedules = self.schedules.borrow_mut();
        let schedule = schedules
            .get_mut(&fd)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;

        *schedule = Schedule {
            interval,
            remaining: (!initial.is_zero()).then_some(initial),
            pending: 0,
        };

        Ok(())
    }

    fn read(&self, fd: RawFd, buffer: &mut [u8]) -> io::Result<usize> {
        let mut schedules = self.schedules.borrow_mut();
        let schedule = schedules
            .get_mut(&fd)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;

        if schedule.pending == 0 {
            return Err(io::Error::from(io::ErrorKind::WouldBlock));
        }

        if self.short_read.get() {
            return Ok(4);
        }

        buffer[..8].copy_from_slice(&schedule.pending.to_ne_bytes());
        schedule.pending = 0;

        Ok(8)
    }

    fn close(&self, fd: RawFd) -> io::Result<()> {
        self.closed.borrow_mut().push(fd);

        if self.fail_close.get() {
            return Err(io::Error::other("injected close failure"));
        }

        self.schedules.borrow_mut().remove(&fd);

        Ok(())
    }
}
