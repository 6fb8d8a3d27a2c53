//! Permission handlers.
//!
//! A handler owns one question for one model (or one whole namespace):
//! which permission strings am I responsible for, and do I grant this one?
//!
//! The shared state (target, include/exclude rules, the memoized supported
//! set) lives in [`HandlerCore`]; the [`PermissionHandler`] trait supplies the
//! decision procedure on top of it. [`BaseHandler`] deliberately has none and
//! fails with [`PermissionError::NotImplemented`]; [`LogicalHandler`] delegates
//! to the logics attached to its model.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use rowguard_core::{Model, Object, PermissionError, PermissionResult};

use crate::cache::CacheKey;
use crate::permission_set::{HandlerScope, PermissionSet};
use crate::settings::HandlerKind;
use crate::{LogicStore, Permission, PermissionCatalog, Principal};

/// What a handler is bound to: a concrete model XOR a whole namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandlerTarget {
    Model(Model),
    App(Cow<'static, str>),
}

impl HandlerTarget {
    pub fn app(app_label: impl Into<Cow<'static, str>>) -> Self {
        HandlerTarget::App(app_label.into())
    }

    pub fn app_label(&self) -> &str {
        match self {
            HandlerTarget::Model(model) => model.app_label(),
            HandlerTarget::App(label) => label,
        }
    }

    pub fn model(&self) -> Option<&Model> {
        match self {
            HandlerTarget::Model(model) => Some(model),
            HandlerTarget::App(_) => None,
        }
    }
}

impl From<Model> for HandlerTarget {
    fn from(value: Model) -> Self {
        HandlerTarget::Model(value)
    }
}

impl From<&Model> for HandlerTarget {
    fn from(value: &Model) -> Self {
        HandlerTarget::Model(value.clone())
    }
}

impl core::fmt::Display for HandlerTarget {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HandlerTarget::Model(model) => core::fmt::Display::fmt(model, f),
            HandlerTarget::App(label) => f.write_str(label),
        }
    }
}

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// State shared by every handler implementation.
#[derive(Debug)]
pub struct HandlerCore {
    id: u64,
    target: HandlerTarget,
    catalog: Arc<dyn PermissionCatalog>,
    includes: RwLock<PermissionSet>,
    excludes: RwLock<PermissionSet>,
    supported: RwLock<Option<Arc<BTreeSet<Permission>>>>,
}

impl HandlerCore {
    pub fn new(target: HandlerTarget, catalog: Arc<dyn PermissionCatalog>) -> Self {
        Self {
            id: NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed),
            target,
            catalog,
            includes: RwLock::new(PermissionSet::target_default()),
            excludes: RwLock::new(PermissionSet::empty()),
            supported: RwLock::new(None),
        }
    }

    /// Process-unique id of this handler instance.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn target(&self) -> &HandlerTarget {
        &self.target
    }

    pub fn catalog(&self) -> &dyn PermissionCatalog {
        self.catalog.as_ref()
    }

    pub fn includes(&self) -> PermissionSet {
        self.includes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the include rule; the supported set is recomputed on next use.
    pub fn set_includes(&self, includes: PermissionSet) {
        *self.includes.write().unwrap_or_else(PoisonError::into_inner) = includes;
        self.invalidate();
    }

    pub fn excludes(&self) -> PermissionSet {
        self.excludes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the exclude rule; the supported set is recomputed on next use.
    pub fn set_excludes(&self, excludes: PermissionSet) {
        *self.excludes.write().unwrap_or_else(PoisonError::into_inner) = excludes;
        self.invalidate();
    }

    /// Drop the memoized supported set.
    pub fn invalidate(&self) {
        *self.supported.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// `includes - excludes`, computed once and shared until invalidated.
    pub fn supported_permissions(&self) -> Arc<BTreeSet<Permission>> {
        if let Some(cached) = self
            .supported
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Arc::clone(cached);
        }

        let scope = HandlerScope::new(&self.target, self.catalog.as_ref());
        let excludes = self.excludes().resolve(&scope);
        let mut supported = self.includes().resolve(&scope);
        supported.retain(|perm| !excludes.contains(perm));
        let supported = Arc::new(supported);

        let mut slot = self.supported.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slot.get_or_insert(supported))
    }

    /// Namespaces of the supported permissions.
    pub fn supported_app_labels(&self) -> BTreeSet<String> {
        self.supported_permissions()
            .iter()
            .filter_map(|perm| perm.namespace().map(str::to_string))
            .collect()
    }
}

/// A permission handler.
pub trait PermissionHandler: Send + Sync + core::fmt::Debug {
    fn core(&self) -> &HandlerCore;

    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    fn target(&self) -> &HandlerTarget {
        self.core().target()
    }

    fn supported_permissions(&self) -> Arc<BTreeSet<Permission>> {
        self.core().supported_permissions()
    }

    fn supports(&self, perm: &Permission) -> bool {
        self.supported_permissions().contains(perm)
    }

    /// Moves whenever the inputs of this handler's decisions change.
    /// Cached decisions from an older generation are never served.
    fn decision_generation(&self) -> u64 {
        0
    }

    /// Decide `perm` for `principal`, optionally on `obj`.
    ///
    /// Concrete handlers must override this; the default fails.
    fn has_perm(
        &self,
        principal: &dyn Principal,
        perm: &Permission,
        obj: Option<&dyn Object>,
    ) -> PermissionResult<bool> {
        let _ = (principal, perm, obj);
        Err(PermissionError::NotImplemented(format!(
            "{} for {}",
            self.name(),
            self.target()
        )))
    }

    /// `true` iff `app_label` is this handler's namespace and the principal
    /// holds at least one of the supported permissions class-level.
    fn has_module_perms(&self, principal: &dyn Principal, app_label: &str) -> PermissionResult<bool> {
        if self.target().app_label() != app_label {
            return Ok(false);
        }

        let decide = || -> PermissionResult<bool> {
            for perm in self.supported_permissions().iter() {
                if self.has_perm(principal, perm, None)? {
                    return Ok(true);
                }
            }
            Ok(false)
        };

        match principal.decision_cache() {
            Some(cache) => cache.get_or_try_insert_with(
                CacheKey::Module {
                    handler: self.core().id(),
                    generation: self.decision_generation(),
                    principal: principal.id(),
                    app_label: app_label.to_string(),
                },
                decide,
            ),
            None => decide(),
        }
    }
}

/// Handler without a decision procedure.
///
/// Useful as a starting point for hosts that only need the supported-set
/// machinery; asking it for a decision is an error.
#[derive(Debug)]
pub struct BaseHandler {
    core: HandlerCore,
}

impl BaseHandler {
    pub fn new(target: HandlerTarget, catalog: Arc<dyn PermissionCatalog>) -> Self {
        Self {
            core: HandlerCore::new(target, catalog),
        }
    }
}

impl PermissionHandler for BaseHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn name(&self) -> &'static str {
        "base"
    }
}

/// Handler delegating to the logics attached to its model.
///
/// First logic to grant wins; logics are consulted in attachment order.
#[derive(Debug)]
pub struct LogicalHandler {
    core: HandlerCore,
    model: Model,
    logics: Arc<LogicStore>,
}

impl LogicalHandler {
    /// Fails for namespace targets: there is no model to read logics from.
    pub fn new(
        target: HandlerTarget,
        catalog: Arc<dyn PermissionCatalog>,
        logics: Arc<LogicStore>,
    ) -> PermissionResult<Self> {
        let Some(model) = target.model().cloned() else {
            return Err(PermissionError::invalid_handler(
                "logical",
                target.to_string(),
                "a logical handler needs a model, not a namespace",
            ));
        };

        Ok(Self {
            core: HandlerCore::new(target, catalog),
            model,
            logics,
        })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    fn decide(&self, principal: &dyn Principal, perm: &Permission, obj: Option<&dyn Object>) -> bool {
        let logics = self.logics.logics_for(&self.model);
        let granted = logics.iter().find(|logic| logic.has_perm(principal, perm, obj));

        if let Some(logic) = granted {
            tracing::debug!(model = %self.model, perm = %perm, logic = logic.name(), "granted by logic");
        }
        granted.is_some()
    }
}

impl PermissionHandler for LogicalHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn name(&self) -> &'static str {
        "logical"
    }

    fn decision_generation(&self) -> u64 {
        self.logics.generation()
    }

    fn has_perm(
        &self,
        principal: &dyn Principal,
        perm: &Permission,
        obj: Option<&dyn Object>,
    ) -> PermissionResult<bool> {
        if !self.supports(perm) {
            return Ok(false);
        }

        match principal.decision_cache() {
            Some(cache) => cache.get_or_try_insert_with(
                CacheKey::Perm {
                    handler: self.core.id(),
                    generation: self.decision_generation(),
                    principal: principal.id(),
                    perm: perm.clone(),
                    object: obj.map(|o| o.key()),
                },
                || Ok(self.decide(principal, perm, obj)),
            ),
            None => Ok(self.decide(principal, perm, obj)),
        }
    }
}

/// Everything a factory may hand to the handler it builds.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub catalog: Arc<dyn PermissionCatalog>,
    pub logics: Arc<LogicStore>,
}

type BuildFn =
    dyn Fn(HandlerTarget, &HandlerContext) -> PermissionResult<Arc<dyn PermissionHandler>> + Send + Sync;

/// Named handler constructor: the "handler class" passed to registration.
#[derive(Clone)]
pub struct HandlerFactory {
    name: Cow<'static, str>,
    build: Arc<BuildFn>,
}

impl HandlerFactory {
    pub fn new<F>(name: impl Into<Cow<'static, str>>, build: F) -> Self
    where
        F: Fn(HandlerTarget, &HandlerContext) -> PermissionResult<Arc<dyn PermissionHandler>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            build: Arc::new(build),
        }
    }

    pub fn logical() -> Self {
        Self::new("logical", |target, ctx| {
            let handler = LogicalHandler::new(target, Arc::clone(&ctx.catalog), Arc::clone(&ctx.logics))?;
            Ok(Arc::new(handler) as Arc<dyn PermissionHandler>)
        })
    }

    pub fn base() -> Self {
        Self::new("base", |target, ctx| {
            Ok(Arc::new(BaseHandler::new(target, Arc::clone(&ctx.catalog))) as Arc<dyn PermissionHandler>)
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn build(&self, target: HandlerTarget, ctx: &HandlerContext) -> PermissionResult<Arc<dyn PermissionHandler>> {
        (self.build)(target, ctx)
    }
}

impl From<HandlerKind> for HandlerFactory {
    fn from(kind: HandlerKind) -> Self {
        match kind {
            HandlerKind::Logical => Self::logical(),
            HandlerKind::Base => Self::base(),
        }
    }
}

impl core::fmt::Debug for HandlerFactory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandlerFactory").field("name", &self.name).finish()
    }
}
