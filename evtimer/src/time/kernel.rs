use crate::sys::{sys_close, sys_read, sys_timerfd_create, sys_timerfd_settime};

use libc::{itimerspec, timespec};
use std::io;
use std::mem;
use std::os::fd::RawFd;

/// Width in bytes of the expiration counter read from a kernel timer.
pub const EXPIRATION_COUNTER_SIZE: usize = mem::size_of::<u64>();

/// A relative timer value split into whole seconds and nanoseconds.
///
/// Values are signed so that negative durations reach the kernel facility
/// unchanged and are rejected there.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Period {
    pub secs: i64,
    pub nanos: i64,
}

impl Period {
    /// The zero period. Programming it as the initial delay disarms a timer.
    pub const ZERO: Period = Period { secs: 0, nanos: 0 };

    /// Splits a millisecond count into seconds and a nanosecond remainder.
    pub const fn from_millis(msec: i32) -> Self {
        Self {
            secs: (msec / 1000) as i64,
            nanos: (msec % 1000) as i64 * 1_000_000,
        }
    }

    /// Returns `true` for [`Period::ZERO`].
    pub const fn is_zero(&self) -> bool {
        self.secs == 0 && self.nanos == 0
    }
}

/// Interface over a monotonic kernel timer object.
///
/// A kernel timer is identified by a file descriptor that becomes readable
/// once it has expired. Reading it yields the number of expirations since
/// the previous read as a native-endian `u64`.
pub trait KernelTimer {
    /// Allocates a new non-blocking monotonic timer, initially disarmed.
    fn create(&self) -> io::Result<RawFd>;

    /// Programs the timer. A zero `initial` disarms it; a zero `interval`
    /// makes it fire once.
    fn arm(&self, fd: RawFd, interval: Period, initial: Period) -> io::Result<()>;

    /// Reads the expiration counter into `buffer`.
    ///
    /// Reports [`io::ErrorKind::WouldBlock`] when no expiration is pending.
    fn read(&self, fd: RawFd, buffer: &mut [u8]) -> io::Result<usize>;

    /// Releases the timer.
    fn close(&self, fd: RawFd) -> io::Result<()>;
}

/// Linux `timerfd` backend on `CLOCK_MONOTONIC`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimerFd;

impl KernelTimer for TimerFd {
    fn create(&self) -> io::Result<RawFd> {
        sys_timerfd_create()
    }

    fn arm(&self, fd: RawFd, interval: Period, initial: Period) -> io::Result<()> {
        let spec = itimerspec {
            it_interval: to_timespec(interval),
            it_value: to_timespec(initial),
        };

        sys_timerfd_settime(fd, &spec)
    }

    fn read(&self, fd: RawFd, buffer: &mut [u8]) -> io::Result<usize> {
        sys_read(fd, buffer)
    }

    fn close(&self, fd: RawFd) -> io::Result<()> {
        sys_close(fd)
    }
}

fn to_timespec(period: Period) -> timespec {
    let mut ts: timespec = unsafe { mem::zeroed() };
    ts.tv_sec = period.secs as _;
    ts.tv_nsec = period.nanos as _;
    ts
}
