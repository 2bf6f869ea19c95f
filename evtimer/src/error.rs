//! Error types for timer operations.

use crate::reactor::ReactorError;

use std::io;
use std::os::fd::RawFd;
use thiserror::Error;

/// Result alias used by every timer operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the timer lifecycle.
///
/// Precondition failures (`Missing*`, [`AlreadyCreated`](Error::AlreadyCreated))
/// are detected before any resource is touched. The remaining variants carry
/// the underlying OS or reactor failure.
#[derive(Debug, Error)]
pub enum Error {
    #[error("reactor is missing or no longer alive")]
    MissingReactor,

    #[error("timer has not been created")]
    MissingTimer,

    #[error("timer callback is missing")]
    MissingCallback,

    #[error("timer storage already holds a live timer")]
    AlreadyCreated,

    #[error("failed to allocate kernel timer")]
    Allocate(#[source] io::Error),

    #[error("failed to program kernel timer {fd}")]
    Program {
        fd: RawFd,
        #[source]
        source: io::Error,
    },

    #[error("failed to release kernel timer {fd}")]
    Release {
        fd: RawFd,
        #[source]
        source: io::Error,
    },

    #[error("kernel timer {fd} was left dirty by a failed teardown")]
    Dirty { fd: RawFd },

    #[error(transparent)]
    Reactor(#[from] ReactorError),
}
