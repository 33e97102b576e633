//! # Guarded Standard-Library Operations
//!
//! Standard-library routines cannot host a check themselves, so each one is
//! wrapped here. Owners and names match
//! `stallguard_registry::DEFAULT_BLOCKING`.
//!
//! | Module | Free functions | Extension traits |
//! |--------|----------------|------------------|
//! | [`thread`] | `sleep`, `yield_now`, `park`, `park_timeout` | |
//! | [`fs`] | `read`, `read_to_string`, `write`, `copy`, `remove_file`, `create_dir_all`, `open`, `create` | [`fs::GuardedFile`] |
//! | [`net`] | `connect` | [`net::GuardedTcpListener`], [`net::GuardedUdpSocket`] |
//! | [`process`] | | [`process::GuardedCommand`] |
//! | [`io`] | | [`io::GuardedStdin`] |
//! | [`sync`] | | [`sync::GuardedReceiver`] |
//!
//! Calls made directly through `std` bypass these wrappers.

pub mod fs;
pub mod io;
pub mod net;
pub mod process;
pub mod sync;
pub mod thread;
