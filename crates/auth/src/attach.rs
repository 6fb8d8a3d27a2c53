//! Attaching logics to models.
//!
//! Logics belong to their model, not to the handler: the [`LogicStore`] keeps
//! an ordered list per model and the model's [`LogicalHandler`] reads it on
//! every decision. Attaching the first logic to a model registers the default
//! handler for it.
//!
//! [`LogicalHandler`]: crate::LogicalHandler

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use rowguard_core::{Model, PermissionError, PermissionResult};

use crate::{HandlerRegistry, HandlerTarget, PermissionLogic};

/// Logics attached to each model, in attachment order.
///
/// Every change bumps a generation; handlers fold it into their cached
/// decisions so a principal never sees an answer from before the change.
#[derive(Debug, Default)]
pub struct LogicStore {
    inner: RwLock<HashMap<Model, Vec<Arc<dyn PermissionLogic>>>>,
    generation: AtomicU64,
}

impl LogicStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Make sure `model` has a (possibly empty) logic list.
    pub fn ensure(&self, model: &Model) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(model.clone())
            .or_default();
    }

    pub fn has_entry(&self, model: &Model) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(model)
    }

    /// Append `logic`; returns `false` if this very instance is already attached.
    pub fn attach(&self, model: &Model, logic: Arc<dyn PermissionLogic>) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let logics = inner.entry(model.clone()).or_default();
        if logics.iter().any(|attached| Arc::ptr_eq(attached, &logic)) {
            return false;
        }
        logics.push(logic);
        self.bump();
        true
    }

    /// Snapshot of the logics attached to `model`.
    pub fn logics_for(&self, model: &Model) -> Vec<Arc<dyn PermissionLogic>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(model)
            .cloned()
            .unwrap_or_default()
    }

    /// Remove every logic of `model` matching `pred`; returns how many went.
    pub fn remove_where<F>(&self, model: &Model, pred: F) -> usize
    where
        F: Fn(&Arc<dyn PermissionLogic>) -> bool,
    {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let Some(logics) = inner.get_mut(model) else {
            return 0;
        };
        let before = logics.len();
        logics.retain(|logic| !pred(logic));
        let removed = before - logics.len();
        if removed > 0 {
            self.bump();
        }
        removed
    }

    pub fn clear(&self, model: &Model) {
        if let Some(logics) = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(model)
        {
            logics.clear();
            self.bump();
        }
    }

    pub fn len(&self, model: &Model) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(model)
            .map_or(0, Vec::len)
    }
}

/// Which attached logics [`HandlerRegistry::detach_logic`] removes.
#[derive(Debug, Clone)]
pub enum LogicSelector {
    /// Exactly this instance.
    Instance(Arc<dyn PermissionLogic>),
    /// Every attached instance of one logic type.
    Kind { type_id: TypeId, type_name: &'static str },
}

impl LogicSelector {
    pub fn instance(logic: &Arc<dyn PermissionLogic>) -> Self {
        LogicSelector::Instance(Arc::clone(logic))
    }

    pub fn kind<L: PermissionLogic>() -> Self {
        LogicSelector::Kind {
            type_id: TypeId::of::<L>(),
            type_name: std::any::type_name::<L>(),
        }
    }

    pub fn matches(&self, logic: &Arc<dyn PermissionLogic>) -> bool {
        match self {
            LogicSelector::Instance(instance) => Arc::ptr_eq(instance, logic),
            LogicSelector::Kind { type_id, .. } => logic.as_any().type_id() == *type_id,
        }
    }

    fn describe(&self) -> String {
        match self {
            LogicSelector::Instance(instance) => instance.name().to_string(),
            LogicSelector::Kind { type_name, .. } => (*type_name).to_string(),
        }
    }
}

impl HandlerRegistry {
    /// Attach `logic` to `model`, registering the default handler for the
    /// model if it has none yet. Returns the shared, bound logic.
    pub fn attach_logic<L: PermissionLogic>(
        &self,
        model: &Model,
        logic: L,
    ) -> PermissionResult<Arc<dyn PermissionLogic>> {
        self.logics().ensure(model);

        let target = HandlerTarget::from(model);
        if !self.is_registered(&target) {
            self.register(target, None)?;
        }

        let mut logic = logic;
        logic.bind_model(model.clone());
        let logic: Arc<dyn PermissionLogic> = Arc::new(logic);
        self.logics().attach(model, Arc::clone(&logic));

        tracing::info!(model = %model, logic = logic.name(), "attached permission logic");
        Ok(logic)
    }

    /// Detach logics selected by `selector` from `model`.
    ///
    /// Returns the number removed. When nothing matched this is an error
    /// unless `fail_silently` is set.
    pub fn detach_logic(
        &self,
        model: &Model,
        selector: &LogicSelector,
        fail_silently: bool,
    ) -> PermissionResult<usize> {
        let removed = self.logics().remove_where(model, |logic| selector.matches(logic));

        if removed == 0 && !fail_silently {
            return Err(PermissionError::not_attached(model.to_string(), selector.describe()));
        }

        tracing::info!(model = %model, logic = %selector.describe(), removed, "detached permission logic");
        Ok(removed)
    }
}
