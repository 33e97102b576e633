//! # Stallguard Intercept
//!
//! Inserts a check in front of registered blocking operations and applies
//! scope directives on entry to registered frames.
//!
//! ## Architecture
//!
//! ```text
//!  guarded_fn! ──▶ static CallSite ──┐
//!                                    ├──▶ SiteInventory ──▶ InterceptHook
//!  frame!      ──▶ static ScopeSite ─┘        ▲               (ScopeTracker)
//!                                             │
//!                               begin_guarding(plan, hook)
//! ```
//!
//! A site registers with the inventory on first execution. Publishing the
//! plan arms every loaded site the plan guards; sites loaded afterwards
//! resolve themselves against the plan as they load.
//!
//! ## Components
//!
//! | Item | Purpose |
//! |------|---------|
//! | [`InterceptionCapability`] | Contract: publish a plan and hook once |
//! | [`SiteInventory`] | The in-process capability |
//! | [`CallSite`] / [`ScopeSite`] | Static descriptors embedded in guarded code |
//! | [`guarded_fn!`] / [`frame!`] / [`static_init_frame!`] | Declaration macros |
//! | [`shims`] | Guarded wrappers for standard-library operations |
//!
//! ## Notes
//!
//! - An unarmed site costs one atomic load per call
//! - Code already running when the plan is published may miss its first
//!   checks; the retroactive pass is one-shot

mod capability;
mod error;
mod inventory;
mod macros;
pub mod shims;
mod site;

pub use capability::{InstrumentationReport, InterceptHook, InterceptionCapability};
pub use error::{InterceptError, Result};
pub use inventory::SiteInventory;
pub use site::{CallSite, CallSiteState, ScopeSite, ScopeSiteState, SiteDescriptor};
