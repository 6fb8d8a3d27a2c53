//! Handler registry: one handler per model or namespace.
//!
//! The registry is an explicit object the host builds at startup and hands to
//! the resolution backend. Registration is expected to finish before queries
//! start; the internal locks only keep the structure sound, they do not make
//! concurrent re-registration meaningful.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use rowguard_core::{Model, PermissionError, PermissionResult};

use crate::handler::{HandlerContext, HandlerFactory};
use crate::{HandlerTarget, LogicStore, PermissionCatalog, PermissionHandler, Settings};

#[derive(Debug)]
pub struct HandlerRegistry {
    settings: Settings,
    default_handler: HandlerFactory,
    context: HandlerContext,
    handlers: RwLock<BTreeMap<HandlerTarget, Arc<dyn PermissionHandler>>>,
    generation: AtomicU64,
}

impl HandlerRegistry {
    pub fn new(catalog: Arc<dyn PermissionCatalog>) -> Self {
        Self::with_settings(catalog, Settings::default())
    }

    pub fn with_settings(catalog: Arc<dyn PermissionCatalog>, settings: Settings) -> Self {
        Self {
            default_handler: HandlerFactory::from(settings.default_handler),
            settings,
            context: HandlerContext {
                catalog,
                logics: Arc::new(LogicStore::new()),
            },
            handlers: RwLock::new(BTreeMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Replace the factory used by `register(target, None)`.
    #[must_use]
    pub fn with_default_handler(mut self, factory: HandlerFactory) -> Self {
        self.default_handler = factory;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn catalog(&self) -> &Arc<dyn PermissionCatalog> {
        &self.context.catalog
    }

    pub fn logics(&self) -> &Arc<LogicStore> {
        &self.context.logics
    }

    /// Build a handler for `target` and register it.
    ///
    /// `handler` defaults to the configured default handler. Fails for
    /// abstract models, for targets already registered, for handlers that
    /// cannot serve the target, and (with `check_permission_presence`) for
    /// handlers claiming permissions the catalog does not declare.
    pub fn register(
        &self,
        target: impl Into<HandlerTarget>,
        handler: Option<HandlerFactory>,
    ) -> PermissionResult<Arc<dyn PermissionHandler>> {
        let target = target.into();

        if target.model().is_some_and(Model::is_abstract) {
            return Err(PermissionError::AbstractModel(target.to_string()));
        }
        if self.is_registered(&target) {
            return Err(PermissionError::AlreadyRegistered(target.to_string()));
        }

        let factory = handler.unwrap_or_else(|| self.default_handler.clone());
        let instance = factory.build(target.clone(), &self.context)?;

        if self.settings.check_permission_presence {
            let catalog = self.catalog();
            if let Some(unknown) = instance
                .supported_permissions()
                .iter()
                .find(|perm| !catalog.contains(perm))
            {
                return Err(PermissionError::UnknownPermission(unknown.to_string()));
            }
        }

        {
            let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
            if handlers.contains_key(&target) {
                return Err(PermissionError::AlreadyRegistered(target.to_string()));
            }
            handlers.insert(target.clone(), Arc::clone(&instance));
        }
        self.generation.fetch_add(1, Ordering::AcqRel);

        tracing::info!(scope = %target, handler = factory.name(), "registered permission handler");
        Ok(instance)
    }

    /// Remove the handler for `target`, returning it.
    pub fn unregister(&self, target: impl Into<HandlerTarget>) -> PermissionResult<Arc<dyn PermissionHandler>> {
        let target = target.into();
        let removed = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&target)
            .ok_or_else(|| PermissionError::NotRegistered(target.to_string()))?;
        self.generation.fetch_add(1, Ordering::AcqRel);

        tracing::info!(scope = %target, "unregistered permission handler");
        Ok(removed)
    }

    /// Snapshot of all registered handlers, ordered by target.
    pub fn get_handlers(&self) -> Vec<Arc<dyn PermissionHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn get_handler(&self, target: &HandlerTarget) -> Option<Arc<dyn PermissionHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(target)
            .cloned()
    }

    pub fn is_registered(&self, target: &HandlerTarget) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(target)
    }

    pub fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every handler (test fixtures). Attached logics are kept.
    pub fn clear(&self) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Bumped on every change to the handler table.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HandlerKind, InMemoryCatalog, PermissionSet};

    fn article() -> Model {
        Model::new("blog", "article")
    }

    fn registry() -> HandlerRegistry {
        let catalog = InMemoryCatalog::new()
            .with_defaults(&article())
            .with_defaults(&Model::new("blog", "comment"));
        HandlerRegistry::new(Arc::new(catalog))
    }

    #[test]
    fn register_uses_the_default_handler() {
        let registry = registry();
        let handler = registry.register(&article(), None).unwrap();

        assert_eq!(handler.name(), "logical");
        assert_eq!(registry.len(), 1);
        assert!(registry.is_registered(&article().into()));
    }

    #[test]
    fn duplicate_registration_fails_without_growing() {
        let registry = registry();
        registry.register(&article(), None).unwrap();
        let generation = registry.generation();

        let err = registry.register(&article(), Some(HandlerFactory::base())).unwrap_err();
        assert_eq!(err, PermissionError::AlreadyRegistered("blog.article".into()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.generation(), generation);
    }

    #[test]
    fn abstract_models_cannot_be_registered() {
        let registry = registry();
        let err = registry
            .register(Model::new_abstract("blog", "entry"), None)
            .unwrap_err();

        assert!(matches!(err, PermissionError::AbstractModel(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn namespace_targets_need_a_namespace_capable_handler() {
        let registry = registry();

        let err = registry.register(HandlerTarget::app("blog"), None).unwrap_err();
        assert!(matches!(err, PermissionError::InvalidHandler { .. }));

        let handler = registry
            .register(HandlerTarget::app("blog"), Some(HandlerFactory::base()))
            .unwrap();
        assert_eq!(handler.supported_permissions().len(), 8);
    }

    #[test]
    fn unregister_removes_and_reports_absence() {
        let registry = registry();
        registry.register(&article(), None).unwrap();

        registry.unregister(&article()).unwrap();
        assert!(registry.get_handlers().is_empty());

        let err = registry.unregister(&article()).unwrap_err();
        assert_eq!(err, PermissionError::NotRegistered("blog.article".into()));
    }

    #[test]
    fn presence_check_rejects_undeclared_permissions() {
        let catalog = Arc::new(InMemoryCatalog::new().with_defaults(&article()));
        let settings = Settings {
            check_permission_presence: true,
            ..Settings::default()
        };
        let registry = HandlerRegistry::with_settings(catalog, settings);

        let sloppy = HandlerFactory::new("sloppy", |target, ctx| {
            let handler = crate::BaseHandler::new(target, Arc::clone(&ctx.catalog));
            handler.core().set_includes(PermissionSet::from_iter(["blog.publish_article"]));
            Ok(Arc::new(handler) as Arc<dyn PermissionHandler>)
        });

        let err = registry.register(&article(), Some(sloppy)).unwrap_err();
        assert_eq!(err, PermissionError::UnknownPermission("blog.publish_article".into()));
        assert!(registry.register(&article(), None).is_ok());
    }

    #[test]
    fn settings_pick_the_default_handler() {
        let settings = Settings {
            default_handler: HandlerKind::Base,
            ..Settings::default()
        };
        let registry = HandlerRegistry::with_settings(
            Arc::new(InMemoryCatalog::new().with_defaults(&article())),
            settings,
        );

        assert_eq!(registry.register(&article(), None).unwrap().name(), "base");
    }

    #[test]
    fn clear_empties_the_table() {
        let registry = registry();
        registry.register(&article(), None).unwrap();
        registry.register(Model::new("blog", "comment"), None).unwrap();
        assert_eq!(registry.get_handlers().len(), 2);

        registry.clear();
        assert!(registry.is_empty());
    }
}
