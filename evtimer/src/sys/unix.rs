use libc::{
    CLOCK_MONOTONIC, EPOLL_CLOEXEC, TFD_CLOEXEC, TFD_NONBLOCK, c_int, close, epoll_create1,
    epoll_ctl, epoll_event, epoll_wait, itimerspec, read, timerfd_create, timerfd_settime,
};
use std::io;
use std::os::fd::RawFd;
use std::ptr;

/// Converts a `-1`-on-error return value into an [`io::Result`].
fn cvt(rc: c_int) -> io::Result<c_int> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc)
    }
}

/// Creates a non-blocking, close-on-exec monotonic timer descriptor.
pub(crate) fn sys_timerfd_create() -> io::Result<RawFd> {
    cvt(unsafe { timerfd_create(CLOCK_MONOTONIC, TFD_NONBLOCK | TFD_CLOEXEC) })
}

/// Programs a timer descriptor with a relative expiration.
///
/// A zero `it_value` disarms the timer.
pub(crate) fn sys_timerfd_settime(fd: RawFd, spec: &itimerspec) -> io::Result<()> {
    cvt(unsafe { timerfd_settime(fd, 0, spec, ptr::null_mut()) }).map(drop)
}

/// Reads from a file descriptor into the given buffer.
///
/// The file descriptor **must** be non-blocking; an empty source reports
/// [`io::ErrorKind::WouldBlock`].
pub(crate) fn sys_read(fd: RawFd, buffer: &mut [u8]) -> io::Result<usize> {
    let n = unsafe { read(fd, buffer.as_mut_ptr() as *mut _, buffer.len()) };
    if n < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(n as usize)
    }
}

/// Closes a file descriptor.
pub(crate) fn sys_close(fd: RawFd) -> io::Result<()> {
    cvt(unsafe { close(fd) }).map(drop)
}

/// Creates a close-on-exec epoll instance.
pub(crate) fn sys_epoll_create() -> io::Result<RawFd> {
    cvt(unsafe { epoll_create1(EPOLL_CLOEXEC) })
}

/// Adds, modifies or removes `fd` in the interest list of `epoll`.
///
/// `event` may be `None` for `EPOLL_CTL_DEL`.
pub(crate) fn sys_epoll_ctl(
    epoll: RawFd,
    op: c_int,
    fd: RawFd,
    event: Option<&mut epoll_event>,
) -> io::Result<()> {
    let event = event.map_or(ptr::null_mut(), |e| e as *mut epoll_event);
    cvt(unsafe { epoll_ctl(epoll, op, fd, event) }).map(drop)
}

/// Waits for readiness events, filling `events` up to its capacity.
///
/// A negative `timeout_ms` blocks indefinitely. The length of `events` is
/// set to the number of ready descriptors.
pub(crate) fn sys_epoll_wait(
    epoll: RawFd,
    events: &mut Vec<epoll_event>,
    timeout_ms: c_int,
) -> io::Result<usize> {
    events.clear();

    let n = unsafe {
        epoll_wait(
            epoll,
            events.as_mut_ptr(),
            events.capacity() as c_int,
            timeout_ms,
        )
    };
    let n = cvt(n)? as usize;

    unsafe {
        events.set_len(n);
    }

    Ok(n)
}
