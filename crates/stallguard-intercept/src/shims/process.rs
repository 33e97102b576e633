//! Guarded `std::process` routines.

use crate::guarded_fn;
use std::io;
use std::process::{Command, ExitStatus, Output};

/// Guarded [`Command`] methods.
pub trait GuardedCommand {
    /// Guarded [`Command::output`].
    fn guarded_output(&mut self) -> io::Result<Output>;

    /// Guarded [`Command::status`].
    fn guarded_status(&mut self) -> io::Result<ExitStatus>;
}

impl GuardedCommand for Command {
    guarded_fn! {
        owner = "std::process::Command", name = "output";
        fn guarded_output(&mut self) -> io::Result<Output> {
            self.output()
        }
    }

    guarded_fn! {
        owner = "std::process::Command", name = "status";
        fn guarded_status(&mut self) -> io::Result<ExitStatus> {
            self.status()
        }
    }
}
