//! # Call Sites and Scope Sites
//!
//! Every guarded operation embeds a `static` [`CallSite`]; every frame that
//! may carry a scope directive embeds a `static` [`ScopeSite`]. A site
//! registers itself with the [`SiteInventory`](crate::SiteInventory) the
//! first time it runs ("loading"), at which point it is resolved against the
//! published plan, or left waiting for the retroactive pass if no plan has
//! been published yet.
//!
//! ## States
//!
//! ```text
//! CallSite:   Unloaded ──load──▶ Disarmed ◀──▶ Armed
//! ScopeSite:  Unloaded ──load──▶ Inert | Allow | Disallow
//! ```
//!
//! After loading, the per-call cost of an unarmed site is one atomic load.

use crate::inventory;
use stallguard_monitor::ScopeGuard;
use stallguard_registry::STATIC_INITIALIZER;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Identity of a site: what it guards and how it is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SiteDescriptor {
    /// Owner path, matched against registry owners.
    pub owner: &'static str,
    /// Operation or frame name.
    pub name: &'static str,
    /// Signature text; `"*"` when the site declares none.
    pub signature: &'static str,
    /// `false` for receiver methods.
    pub is_static: bool,
}

impl fmt::Display for SiteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = if self.is_static { "::" } else { "#" };
        write!(f, "{}{}{}{}", self.owner, separator, self.name, self.signature)
    }
}

/// Arming state of a [`CallSite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSiteState {
    /// Never executed.
    Unloaded,
    /// Registered; calls run without a check.
    Disarmed,
    /// Registered; calls are checked first.
    Armed,
}

const UNLOADED: u8 = 0;
const DISARMED: u8 = 1;
const ARMED: u8 = 2;

/// Check point embedded in a guarded operation.
///
/// Usually declared by [`guarded_fn!`](crate::guarded_fn).
pub struct CallSite {
    descriptor: SiteDescriptor,
    state: AtomicU8,
}

impl CallSite {
    /// Declares a call site.
    pub const fn new(
        owner: &'static str,
        name: &'static str,
        signature: &'static str,
        is_static: bool,
    ) -> Self {
        Self {
            descriptor: SiteDescriptor {
                owner,
                name,
                signature,
                is_static,
            },
            state: AtomicU8::new(UNLOADED),
        }
    }

    /// What this site guards.
    pub fn descriptor(&self) -> &SiteDescriptor {
        &self.descriptor
    }

    /// Current arming state.
    pub fn state(&self) -> CallSiteState {
        match self.state.load(Ordering::Acquire) {
            UNLOADED => CallSiteState::Unloaded,
            ARMED => CallSiteState::Armed,
            _ => CallSiteState::Disarmed,
        }
    }

    /// Runs the check for one call, loading the site on first use.
    ///
    /// Must be called before the guarded operation's own logic. A violation
    /// reported by a panicking reporter unwinds out of this call.
    #[inline]
    pub fn intercept(&'static self) {
        match self.state.load(Ordering::Acquire) {
            DISARMED => {}
            ARMED => inventory::dispatch(&self.descriptor),
            _ => {
                if inventory::load_call_site(self) == CallSiteState::Armed {
                    inventory::dispatch(&self.descriptor);
                }
            }
        }
    }

    /// Loads the site without running a check.
    ///
    /// Lets the retroactive pass see a site before its first call.
    pub fn preload(&'static self) -> CallSiteState {
        match self.state() {
            CallSiteState::Unloaded => inventory::load_call_site(self),
            state => state,
        }
    }

    pub(crate) fn is_unloaded(&self) -> bool {
        self.state.load(Ordering::Acquire) == UNLOADED
    }

    pub(crate) fn set_armed(&self, armed: bool) {
        let state = if armed { ARMED } else { DISARMED };
        self.state.store(state, Ordering::Release);
    }
}

impl fmt::Debug for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSite")
            .field("descriptor", &self.descriptor)
            .field("state", &self.state())
            .finish()
    }
}

/// Resolved directive of a [`ScopeSite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeSiteState {
    /// Never entered.
    Unloaded,
    /// No directive applies.
    Inert,
    /// Blocking calls inside the frame are allowed.
    Allow,
    /// Blocking calls inside the frame are reported, even inside an allowed frame.
    Disallow,
}

const INERT: u8 = 1;
const ALLOW: u8 = 2;
const DISALLOW: u8 = 3;

/// Frame that may carry a scope directive.
///
/// Usually declared by [`frame!`](crate::frame) or
/// [`static_init_frame!`](crate::static_init_frame).
pub struct ScopeSite {
    descriptor: SiteDescriptor,
    state: AtomicU8,
}

impl ScopeSite {
    /// Declares a frame.
    pub const fn new(owner: &'static str, name: &'static str, signature: &'static str) -> Self {
        Self {
            descriptor: SiteDescriptor {
                owner,
                name,
                signature,
                is_static: true,
            },
            state: AtomicU8::new(UNLOADED),
        }
    }

    /// Declares the one-time initializer frame of `owner`.
    pub const fn static_initializer(owner: &'static str) -> Self {
        Self::new(owner, STATIC_INITIALIZER, stallguard_registry::ANY_SIGNATURE)
    }

    /// What this frame is.
    pub fn descriptor(&self) -> &SiteDescriptor {
        &self.descriptor
    }

    /// Current directive.
    pub fn state(&self) -> ScopeSiteState {
        match self.state.load(Ordering::Acquire) {
            UNLOADED => ScopeSiteState::Unloaded,
            ALLOW => ScopeSiteState::Allow,
            DISALLOW => ScopeSiteState::Disallow,
            _ => ScopeSiteState::Inert,
        }
    }

    /// Enters the frame. Dropping the guard leaves it.
    pub fn enter(&'static self) -> ScopeGuard {
        let state = match self.state() {
            ScopeSiteState::Unloaded => inventory::load_scope_site(self),
            state => state,
        };
        match state {
            ScopeSiteState::Allow => inventory::enter_scope(true),
            ScopeSiteState::Disallow => inventory::enter_scope(false),
            ScopeSiteState::Inert | ScopeSiteState::Unloaded => ScopeGuard::inert(),
        }
    }

    /// Runs `f` inside the frame.
    pub fn frame<R>(&'static self, f: impl FnOnce() -> R) -> R {
        let _guard = self.enter();
        f()
    }

    pub(crate) fn is_unloaded(&self) -> bool {
        self.state.load(Ordering::Acquire) == UNLOADED
    }

    pub(crate) fn set_directive(&self, directive: Option<bool>) {
        let state = match directive {
            None => INERT,
            Some(true) => ALLOW,
            Some(false) => DISALLOW,
        };
        self.state.store(state, Ordering::Release);
    }
}

impl fmt::Debug for ScopeSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeSite")
            .field("descriptor", &self.descriptor)
            .field("state", &self.state())
            .finish()
    }
}
