//! # Site Inventory
//!
//! Process-global list of loaded sites and the published plan.
//!
//! ## Ordering
//!
//! ```text
//!   site load ─────┐                      ┌──── begin_guarding
//!                  ▼                      ▼
//!            ┌──────────── inventory lock ────────────┐
//!            │ plan absent: record site, leave unarmed │
//!            │ plan present: record site, resolve now  │
//!            │ publish: store plan, resolve every site │
//!            └─────────────────────────────────────────┘
//! ```
//!
//! Loading and publication hold the same lock, so every site is resolved
//! exactly once by one of the two paths. The lock is never held while the
//! hook runs.

use crate::capability::{InstrumentationReport, InterceptHook, InterceptionCapability};
use crate::error::{InterceptError, Result};
use crate::site::{CallSite, CallSiteState, ScopeSite, ScopeSiteState, SiteDescriptor};
use parking_lot::{const_mutex, Mutex};
use stallguard_monitor::ScopeGuard;
use stallguard_registry::FrozenRegistry;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

struct Sites {
    call_sites: Vec<&'static CallSite>,
    scope_sites: Vec<&'static ScopeSite>,
    plan: Option<Arc<FrozenRegistry>>,
}

/// The in-process [`InterceptionCapability`].
pub struct SiteInventory {
    sites: Mutex<Sites>,
    hook: OnceLock<Arc<dyn InterceptHook>>,
}

static GLOBAL: SiteInventory = SiteInventory {
    sites: const_mutex(Sites {
        call_sites: Vec::new(),
        scope_sites: Vec::new(),
        plan: None,
    }),
    hook: OnceLock::new(),
};

impl SiteInventory {
    /// The inventory every [`CallSite`] and [`ScopeSite`] registers with.
    pub fn global() -> &'static SiteInventory {
        &GLOBAL
    }

    /// Returns `true` once a plan has been published.
    pub fn is_guarding(&self) -> bool {
        self.hook.get().is_some()
    }

    /// Loaded call sites and their states.
    pub fn call_sites(&self) -> Vec<(SiteDescriptor, CallSiteState)> {
        self.sites
            .lock()
            .call_sites
            .iter()
            .map(|site| (*site.descriptor(), site.state()))
            .collect()
    }

    /// Loaded scope sites and their states.
    pub fn scope_sites(&self) -> Vec<(SiteDescriptor, ScopeSiteState)> {
        self.sites
            .lock()
            .scope_sites
            .iter()
            .map(|site| (*site.descriptor(), site.state()))
            .collect()
    }
}

impl InterceptionCapability for SiteInventory {
    fn begin_guarding(
        &self,
        plan: Arc<FrozenRegistry>,
        hook: Arc<dyn InterceptHook>,
    ) -> Result<InstrumentationReport> {
        let mut sites = self.sites.lock();
        if sites.plan.is_some() || self.hook.set(hook).is_err() {
            return Err(InterceptError::AlreadyGuarding);
        }

        let mut report = InstrumentationReport {
            loaded_call_sites: sites.call_sites.len(),
            loaded_scope_sites: sites.scope_sites.len(),
            ..InstrumentationReport::default()
        };
        for site in sites
            .call_sites
            .iter()
            .filter(|site| plan.guards_owner(site.descriptor().owner))
        {
            if resolve_call_site(&plan, site) {
                report.armed_call_sites += 1;
            }
        }
        for site in sites
            .scope_sites
            .iter()
            .filter(|site| plan.guards_owner(site.descriptor().owner))
        {
            if resolve_scope_site(&plan, site).is_some() {
                report.resolved_scope_sites += 1;
            }
        }
        sites.plan = Some(plan);

        info!(
            "Interception active: {}/{} loaded call sites armed, {}/{} scope sites resolved",
            report.armed_call_sites,
            report.loaded_call_sites,
            report.resolved_scope_sites,
            report.loaded_scope_sites
        );
        Ok(report)
    }
}

fn resolve_call_site(plan: &FrozenRegistry, site: &CallSite) -> bool {
    let d = site.descriptor();
    let armed = plan.is_blocking(d.owner, d.name, d.signature);
    site.set_armed(armed);
    armed
}

fn resolve_scope_site(plan: &FrozenRegistry, site: &ScopeSite) -> Option<bool> {
    let d = site.descriptor();
    let directive = plan.directive(d.owner, d.name, d.signature);
    site.set_directive(directive);
    directive
}

pub(crate) fn load_call_site(site: &'static CallSite) -> CallSiteState {
    let mut sites = GLOBAL.sites.lock();
    if site.is_unloaded() {
        match &sites.plan {
            Some(plan) => {
                resolve_call_site(plan, site);
            }
            None => site.set_armed(false),
        }
        sites.call_sites.push(site);
        debug!("Call site {} loaded as {:?}", site.descriptor(), site.state());
    }
    site.state()
}

pub(crate) fn load_scope_site(site: &'static ScopeSite) -> ScopeSiteState {
    let mut sites = GLOBAL.sites.lock();
    if site.is_unloaded() {
        let directive = match &sites.plan {
            Some(plan) => resolve_scope_site(plan, site),
            None => {
                site.set_directive(None);
                None
            }
        };
        sites.scope_sites.push(site);
        debug!(
            "Scope site {} loaded with directive {:?}",
            site.descriptor(),
            directive
        );
    }
    site.state()
}

pub(crate) fn dispatch(descriptor: &SiteDescriptor) {
    if let Some(hook) = GLOBAL.hook.get() {
        hook.on_intercept(descriptor.owner, descriptor.name, descriptor.is_static);
    }
}

pub(crate) fn enter_scope(allowed: bool) -> ScopeGuard {
    match GLOBAL.hook.get() {
        Some(hook) => hook.enter_scope(allowed),
        None => ScopeGuard::inert(),
    }
}
