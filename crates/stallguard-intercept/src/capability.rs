//! The interception contract.
//!
//! An [`InterceptionCapability`] receives the frozen plan and a hook once,
//! and from then on calls the hook before every guarded operation and on
//! entry to every frame carrying a directive.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use stallguard_monitor::{ScopeGuard, ScopeTracker};
use stallguard_registry::FrozenRegistry;
use std::sync::Arc;

/// Callbacks invoked by guarded code.
pub trait InterceptHook: Send + Sync {
    /// Called before a guarded operation's own logic, on the calling thread.
    fn on_intercept(&self, owner: &str, name: &str, is_static: bool);

    /// Called on entry to a frame carrying a directive.
    fn enter_scope(&self, allowed: bool) -> ScopeGuard;
}

impl InterceptHook for ScopeTracker {
    fn on_intercept(&self, owner: &str, name: &str, is_static: bool) {
        self.check(owner, name, is_static);
    }

    fn enter_scope(&self, allowed: bool) -> ScopeGuard {
        ScopeTracker::enter_scope(self, allowed)
    }
}

/// Something able to insert checks in front of registered operations.
pub trait InterceptionCapability: Send + Sync {
    /// Publishes the plan and hook, and arms matching sites already loaded.
    ///
    /// # Errors
    ///
    /// Returns [`InterceptError::AlreadyGuarding`](crate::InterceptError::AlreadyGuarding)
    /// if a plan was published before.
    fn begin_guarding(
        &self,
        plan: Arc<FrozenRegistry>,
        hook: Arc<dyn InterceptHook>,
    ) -> Result<InstrumentationReport>;
}

impl<T: InterceptionCapability + ?Sized> InterceptionCapability for &T {
    fn begin_guarding(
        &self,
        plan: Arc<FrozenRegistry>,
        hook: Arc<dyn InterceptHook>,
    ) -> Result<InstrumentationReport> {
        (**self).begin_guarding(plan, hook)
    }
}

impl<T: InterceptionCapability + ?Sized> InterceptionCapability for Arc<T> {
    fn begin_guarding(
        &self,
        plan: Arc<FrozenRegistry>,
        hook: Arc<dyn InterceptHook>,
    ) -> Result<InstrumentationReport> {
        (**self).begin_guarding(plan, hook)
    }
}

/// Outcome of the retroactive pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentationReport {
    /// Call sites loaded before the plan was published.
    pub loaded_call_sites: usize,
    /// Of those, the ones now armed.
    pub armed_call_sites: usize,
    /// Scope sites loaded before the plan was published.
    pub loaded_scope_sites: usize,
    /// Of those, the ones now carrying a directive.
    pub resolved_scope_sites: usize,
}
