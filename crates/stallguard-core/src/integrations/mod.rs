//! Built-in integrations for third-party runtimes.
//!
//! An integration whose runtime is not compiled in applies nothing.

pub mod tokio;
