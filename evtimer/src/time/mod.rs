//! Monotonic timer sources driven by a reactor.
//!
//! This module provides:
//! - [`KernelTimer`], the interface over the OS timer object, and its
//!   `timerfd` backend [`TimerFd`],
//! - [`Timer`], the caller-owned timer storage with its
//!   create/start/stop/destroy lifecycle,
//! - [`TimerHandle`], the live timer handed to callbacks.
//!
//! Expirations are delivered by the reactor's dispatch thread: every
//! expiration counted by the kernel since the last dispatch results in one
//! synchronous callback invocation.

mod dispatch;
mod kernel;
mod timer;

#[doc(inline)]
pub use kernel::{EXPIRATION_COUNTER_SIZE, KernelTimer, Period, TimerFd};

#[doc(inline)]
pub use timer::{Callback, INVALID_FD, Timer, TimerBuilder, TimerHandle};
