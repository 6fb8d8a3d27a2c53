//! Permission catalog: which permission strings the host declares.
//!
//! The engine only reads the catalog. It is the source of a handler's default
//! supported-permission set and of the optional presence check.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};

use rowguard_core::Model;

use crate::Permission;

/// Actions every model declares when registered with [`InMemoryCatalog::declare_defaults`].
pub const DEFAULT_ACTIONS: [&str; 4] = ["add", "change", "delete", "view"];

/// Read-only view of the host's declared permissions.
pub trait PermissionCatalog: Send + Sync + core::fmt::Debug {
    /// All permission strings declared for exactly this model.
    fn model_permissions(&self, model: &Model) -> BTreeSet<Permission>;

    /// All permission strings declared under a namespace.
    fn app_permissions(&self, app_label: &str) -> BTreeSet<Permission>;

    /// Returns `true` if `perm` is declared anywhere in the catalog.
    fn contains(&self, perm: &Permission) -> bool {
        perm.namespace()
            .is_some_and(|ns| self.app_permissions(ns).contains(perm))
    }
}

/// In-memory catalog for tests/dev and hosts without a persistent one.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    inner: RwLock<BTreeMap<Model, BTreeSet<Permission>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare explicit codenames for a model (e.g. `["publish_article"]`).
    pub fn declare<I, S>(&self, model: &Model, codenames: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let perms = codenames
            .into_iter()
            .map(|c| Permission::new(format!("{}.{}", model.app_label(), c.as_ref())));

        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(model.clone())
            .or_default()
            .extend(perms);
    }

    /// Declare the default add/change/delete/view permissions of a model.
    pub fn declare_defaults(&self, model: &Model) {
        let codenames: Vec<String> = DEFAULT_ACTIONS.iter().map(|a| model.codename(a)).collect();
        self.declare(model, codenames);
    }

    #[must_use]
    pub fn with_defaults(self, model: &Model) -> Self {
        self.declare_defaults(model);
        self
    }
}

impl PermissionCatalog for InMemoryCatalog {
    fn model_permissions(&self, model: &Model) -> BTreeSet<Permission> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(model)
            .cloned()
            .unwrap_or_default()
    }

    fn app_permissions(&self, app_label: &str) -> BTreeSet<Permission> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(model, _)| model.app_label() == app_label)
            .flat_map(|(_, perms)| perms.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_four_actions() {
        let article = Model::new("blog", "article");
        let catalog = InMemoryCatalog::new().with_defaults(&article);

        let perms = catalog.model_permissions(&article);
        assert_eq!(perms.len(), 4);
        assert!(perms.contains(&Permission::from("blog.add_article")));
        assert!(perms.contains(&Permission::from("blog.view_article")));
    }

    #[test]
    fn app_permissions_span_models() {
        let article = Model::new("blog", "article");
        let comment = Model::new("blog", "comment");
        let invoice = Model::new("billing", "invoice");
        let catalog = InMemoryCatalog::new()
            .with_defaults(&article)
            .with_defaults(&comment)
            .with_defaults(&invoice);
        catalog.declare(&article, ["publish_article"]);

        assert_eq!(catalog.app_permissions("blog").len(), 9);
        assert_eq!(catalog.app_permissions("billing").len(), 4);
        assert!(catalog.app_permissions("shop").is_empty());
    }

    #[test]
    fn contains_checks_the_namespace() {
        let article = Model::new("blog", "article");
        let catalog = InMemoryCatalog::new().with_defaults(&article);

        assert!(catalog.contains(&Permission::from("blog.change_article")));
        assert!(!catalog.contains(&Permission::from("blog.publish_article")));
        assert!(!catalog.contains(&Permission::from("change_article")));
    }
}
