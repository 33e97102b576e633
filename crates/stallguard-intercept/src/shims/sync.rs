//! Guarded `std::sync::mpsc` routines.

use crate::guarded_fn;
use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError};
use std::time::Duration;

/// Guarded [`Receiver`] methods.
pub trait GuardedReceiver<T> {
    /// Guarded [`Receiver::recv`].
    fn guarded_recv(&self) -> Result<T, RecvError>;

    /// Guarded [`Receiver::recv_timeout`].
    fn guarded_recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError>;
}

impl<T> GuardedReceiver<T> for Receiver<T> {
    guarded_fn! {
        owner = "std::sync::mpsc::Receiver", name = "recv";
        fn guarded_recv(&self) -> Result<T, RecvError> {
            self.recv()
        }
    }

    guarded_fn! {
        owner = "std::sync::mpsc::Receiver", name = "recv_timeout";
        fn guarded_recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
            self.recv_timeout(timeout)
        }
    }
}
