use super::kernel::EXPIRATION_COUNTER_SIZE;
use super::timer::{Shared, TimerHandle};
use crate::reactor::{Event, Reactor};

use std::any::Any;
use std::io;
use std::rc::Rc;
use tracing::trace;

/// Readiness handler registered for every timer.
///
/// Drains the expiration counter and invokes the callback once per
/// expiration before returning to the reactor. The descriptor is registered
/// level-triggered, so an already drained counter (`WouldBlock`) is not an
/// error: the reactor reports the descriptor again once it expires.
///
/// # Panics
///
/// Panics if the user data is not a timer record, or if the counter read
/// fails for any reason other than `WouldBlock` or returns a partial value.
pub(super) fn dispatch<U: 'static>(_reactor: &dyn Reactor, event: Event, data: &Rc<dyn Any>) {
    let Ok(shared) = Rc::clone(data).downcast::<Shared<U>>() else {
        panic!("timer handler dispatched with foreign user data (fd {})", event.fd);
    };

    let fd = shared.fd.get();
    debug_assert_eq!(fd, event.fd);

    // Still registered after a failed teardown, but the descriptor may
    // already be closed.
    if shared.dirty.get() {
        trace!(fd, "ignoring readiness of dirty timer");
        return;
    }

    // The callback is running further up the stack and drove the reactor
    // itself. Leave the counter unread; it is reported again.
    let Ok(mut callback) = shared.callback.try_borrow_mut() else {
        trace!(fd, "timer callback busy, deferring expirations");
        return;
    };

    let mut counter = [0u8; EXPIRATION_COUNTER_SIZE];

    match shared.kernel.read(fd, &mut counter) {
        Ok(n) => assert_eq!(
            n, EXPIRATION_COUNTER_SIZE,
            "partial expiration counter read from timer {fd}"
        ),
        Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
            trace!(fd, "expiration counter already drained");
            return;
        }
        Err(err) => panic!("failed to read expiration counter of timer {fd}: {err}"),
    }

    let mut expirations = u64::from_ne_bytes(counter);
    trace!(fd, expirations, "timer expired");

    let handle = TimerHandle {
        shared: shared.clone(),
    };
    let callback: &mut dyn FnMut(&TimerHandle<U>, &U) = &mut **callback;

    while expirations > 0 {
        callback(&handle, &shared.data);
        expirations -= 1;
    }
}
