//! Default blocking operations.
//!
//! These are the standard-library routines wrapped by
//! `stallguard_intercept::shims`. Owners and names here must match the
//! shim declarations exactly.

/// A default blocking-set entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultOperation {
    /// Owner path.
    pub owner: &'static str,
    /// Operation name.
    pub name: &'static str,
    /// Signature text (`"*"` for every overload).
    pub signature: &'static str,
}

const fn op(owner: &'static str, name: &'static str) -> DefaultOperation {
    DefaultOperation {
        owner,
        name,
        signature: crate::ANY_SIGNATURE,
    }
}

/// Operations registered by [`crate::Registry::with_defaults`].
pub const DEFAULT_BLOCKING: &[DefaultOperation] = &[
    op("std::thread", "sleep"),
    op("std::thread", "yield_now"),
    op("std::thread", "park"),
    op("std::thread", "park_timeout"),
    op("std::fs", "read"),
    op("std::fs", "read_to_string"),
    op("std::fs", "write"),
    op("std::fs", "copy"),
    op("std::fs", "remove_file"),
    op("std::fs", "create_dir_all"),
    op("std::fs::File", "open"),
    op("std::fs::File", "create"),
    op("std::fs::File", "sync_all"),
    op("std::net::TcpStream", "connect"),
    op("std::net::TcpListener", "accept"),
    op("std::net::UdpSocket", "recv_from"),
    op("std::net::UdpSocket", "send_to"),
    op("std::process::Command", "output"),
    op("std::process::Command", "status"),
    op("std::io::Stdin", "read_line"),
    op("std::sync::mpsc::Receiver", "recv"),
    op("std::sync::mpsc::Receiver", "recv_timeout"),
];
