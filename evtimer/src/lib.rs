//! # evtimer
//!
//! **evtimer** provides periodic timer sources for a readiness-driven event
//! reactor. Each timer is backed by a monotonic kernel timer (`timerfd` on
//! Linux) whose expirations are observed through the same readiness mechanism
//! the reactor uses for I/O.
//!
//! The crate is organised around three pieces:
//!
//! - a [`Reactor`](reactor::Reactor) interface, with [`EpollReactor`] as the
//!   bundled level-triggered implementation,
//! - a [`KernelTimer`](time::KernelTimer) interface over the OS timer object,
//!   with [`TimerFd`](time::TimerFd) as the production backend,
//! - the [`Timer`] itself, which ties both together and invokes a user
//!   callback once per expiration on the reactor's dispatch thread.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use evtimer::{EpollReactor, Timer, TimerBuilder};
//! use std::rc::Rc;
//!
//! let reactor = Rc::new(EpollReactor::new()?);
//! let mut timer = Timer::new();
//!
//! TimerBuilder::with_data("tick")
//!     .reactor(&reactor)
//!     .callback(|_timer, label| println!("{label}"))
//!     .create(&mut timer)?;
//!
//! timer.start(250)?;
//! reactor.run()?;
//! ```
//!
//! ## Modules
//!
//! - [`reactor`] — Reactor interface, event descriptors and the epoll reactor
//! - [`time`] — Kernel timer backends and the timer lifecycle

mod error;
mod sys;

pub mod reactor;
pub mod time;

pub use error::{Error, Result};
pub use reactor::{EpollReactor, ReactorBuilder};
pub use time::{Timer, TimerBuilder, TimerHandle};
