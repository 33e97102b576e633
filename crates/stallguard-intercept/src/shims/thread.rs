//! Guarded `std::thread` routines.

use crate::guarded_fn;
use std::time::Duration;

guarded_fn! {
    owner = "std::thread";
    /// Guarded [`std::thread::sleep`].
    pub fn sleep(duration: Duration) {
        std::thread::sleep(duration)
    }
}

guarded_fn! {
    owner = "std::thread";
    /// Guarded [`std::thread::yield_now`].
    pub fn yield_now() {
        std::thread::yield_now()
    }
}

guarded_fn! {
    owner = "std::thread";
    /// Guarded [`std::thread::park`].
    pub fn park() {
        std::thread::park()
    }
}

guarded_fn! {
    owner = "std::thread";
    /// Guarded [`std::thread::park_timeout`].
    pub fn park_timeout(duration: Duration) {
        std::thread::park_timeout(duration)
    }
}
