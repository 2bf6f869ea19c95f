//! Thin wrappers over the OS calls used by the reactor and the timer backend.
//!
//! Every wrapper converts the C return convention into an [`std::io::Result`]
//! so callers can propagate failures with `?`.

#[cfg(target_os = "linux")]
mod unix;

#[cfg(target_os = "linux")]
pub(crate) use unix::*;
