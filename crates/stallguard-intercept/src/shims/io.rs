//! Guarded `std::io` routines.

use crate::guarded_fn;
use std::io::{self, Stdin};

/// Guarded [`Stdin`] methods.
pub trait GuardedStdin {
    /// Guarded [`Stdin::read_line`].
    fn guarded_read_line(&self, buf: &mut String) -> io::Result<usize>;
}

impl GuardedStdin for Stdin {
    guarded_fn! {
        owner = "std::io::Stdin", name = "read_line";
        fn guarded_read_line(&self, buf: &mut String) -> io::Result<usize> {
            self.read_line(buf)
        }
    }
}
