//! Include/exclude rules for a handler's supported permissions.

use std::collections::BTreeSet;
use std::sync::Arc;

use rowguard_core::Model;

use crate::{HandlerTarget, Permission, PermissionCatalog};

/// What a computed [`PermissionSet`] can see: the handler's target and the catalog.
#[derive(Debug, Clone, Copy)]
pub struct HandlerScope<'a> {
    pub target: &'a HandlerTarget,
    pub catalog: &'a dyn PermissionCatalog,
}

impl<'a> HandlerScope<'a> {
    pub fn new(target: &'a HandlerTarget, catalog: &'a dyn PermissionCatalog) -> Self {
        Self { target, catalog }
    }

    pub fn model(&self) -> Option<&'a Model> {
        self.target.model()
    }

    /// Permissions declared for exactly the target model (empty for namespace targets).
    pub fn model_permissions(&self) -> BTreeSet<Permission> {
        self.model()
            .map(|model| self.catalog.model_permissions(model))
            .unwrap_or_default()
    }

    /// Permissions declared anywhere in the target's namespace.
    pub fn app_permissions(&self) -> BTreeSet<Permission> {
        self.catalog.app_permissions(self.target.app_label())
    }

    /// Model permissions for model targets, namespace permissions otherwise.
    pub fn default_permissions(&self) -> BTreeSet<Permission> {
        match self.target {
            HandlerTarget::Model(_) => self.model_permissions(),
            HandlerTarget::App(_) => self.app_permissions(),
        }
    }
}

type ComputeFn = dyn Fn(&HandlerScope<'_>) -> BTreeSet<Permission> + Send + Sync;

/// Either a fixed set of permission strings or a function computing one.
#[derive(Clone)]
pub enum PermissionSet {
    Literal(BTreeSet<Permission>),
    Computed(Arc<ComputeFn>),
}

impl PermissionSet {
    pub fn empty() -> Self {
        PermissionSet::Literal(BTreeSet::new())
    }

    /// The default includes: everything the catalog declares for the target.
    pub fn target_default() -> Self {
        Self::computed(|scope| scope.default_permissions())
    }

    pub fn computed<F>(compute: F) -> Self
    where
        F: Fn(&HandlerScope<'_>) -> BTreeSet<Permission> + Send + Sync + 'static,
    {
        PermissionSet::Computed(Arc::new(compute))
    }

    pub fn resolve(&self, scope: &HandlerScope<'_>) -> BTreeSet<Permission> {
        match self {
            PermissionSet::Literal(perms) => perms.clone(),
            PermissionSet::Computed(compute) => compute(scope),
        }
    }
}

impl Default for PermissionSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl core::fmt::Debug for PermissionSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PermissionSet::Literal(perms) => f.debug_tuple("Literal").field(perms).finish(),
            PermissionSet::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl<P: Into<Permission>> FromIterator<P> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        PermissionSet::Literal(iter.into_iter().map(Into::into).collect())
    }
}
