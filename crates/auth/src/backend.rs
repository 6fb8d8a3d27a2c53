//! Authorization backends.
//!
//! The host asks an ordered chain of backends whether a principal holds a
//! permission. [`ResolutionBackend`] is the one backed by the handler
//! registry; [`BackendChain`] models the host pipeline around it.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use rowguard_core::{Object, PermissionError, PermissionResult, UserId};

use crate::{HandlerRegistry, Permission, PermissionHandler, Principal};

/// One link of the host's authentication/authorization pipeline.
pub trait AuthorizationBackend: Send + Sync + core::fmt::Debug {
    fn name(&self) -> &'static str;

    /// `None` means "no opinion": the pipeline moves on to the next backend.
    fn authenticate(&self, username: &str, password: &str) -> Option<UserId> {
        let _ = (username, password);
        None
    }

    fn has_perm(
        &self,
        principal: &dyn Principal,
        perm: &Permission,
        obj: Option<&dyn Object>,
    ) -> PermissionResult<bool>;

    fn has_module_perms(&self, principal: &dyn Principal, app_label: &str) -> PermissionResult<bool>;
}

#[derive(Debug, Default)]
struct Shortlists {
    generation: u64,
    by_perm: HashMap<Permission, Vec<Arc<dyn PermissionHandler>>>,
}

/// Backend resolving permissions through the registered handlers.
///
/// Never authenticates. For a permission, the handlers supporting it are
/// asked in target order; the first `true` wins and no `true` is a deny.
///
/// The per-permission handler short-list is cached and dropped whenever the
/// registry's generation moves. Changing a handler's includes or excludes
/// after the first query still needs [`ResolutionBackend::clear_cache`].
#[derive(Debug)]
pub struct ResolutionBackend {
    registry: Arc<HandlerRegistry>,
    shortlists: RwLock<Shortlists>,
}

impl ResolutionBackend {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            shortlists: RwLock::new(Shortlists::default()),
        }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Forget every cached handler short-list.
    pub fn clear_cache(&self) {
        let mut shortlists = self.shortlists.write().unwrap_or_else(PoisonError::into_inner);
        shortlists.by_perm.clear();
        shortlists.generation = self.registry.generation();
    }

    /// Handlers whose supported set contains `perm`, in target order.
    pub fn candidates(&self, perm: &Permission) -> Vec<Arc<dyn PermissionHandler>> {
        let generation = self.registry.generation();

        {
            let shortlists = self.shortlists.read().unwrap_or_else(PoisonError::into_inner);
            if shortlists.generation == generation {
                if let Some(handlers) = shortlists.by_perm.get(perm) {
                    return handlers.clone();
                }
            }
        }

        let handlers: Vec<_> = self
            .registry
            .get_handlers()
            .into_iter()
            .filter(|handler| handler.supports(perm))
            .collect();

        let mut shortlists = self.shortlists.write().unwrap_or_else(PoisonError::into_inner);
        if shortlists.generation != generation {
            tracing::debug!(
                from = shortlists.generation,
                to = generation,
                "registry changed, dropping handler short-lists"
            );
            shortlists.by_perm.clear();
            shortlists.generation = generation;
        }
        shortlists.by_perm.insert(perm.clone(), handlers.clone());
        handlers
    }

    /// Fails with `UnknownPermission` when presence checking is on and the
    /// catalog does not declare `perm`.
    pub(crate) fn check_presence(&self, perm: &Permission) -> PermissionResult<()> {
        if self.registry.settings().check_permission_presence && !self.registry.catalog().contains(perm) {
            return Err(PermissionError::UnknownPermission(perm.to_string()));
        }
        Ok(())
    }
}

impl AuthorizationBackend for ResolutionBackend {
    fn name(&self) -> &'static str {
        "resolution"
    }

    fn has_perm(
        &self,
        principal: &dyn Principal,
        perm: &Permission,
        obj: Option<&dyn Object>,
    ) -> PermissionResult<bool> {
        self.check_presence(perm)?;

        for handler in self.candidates(perm) {
            if handler.has_perm(principal, perm, obj)? {
                tracing::debug!(
                    perm = %perm,
                    scope = %handler.target(),
                    handler = handler.name(),
                    "permission granted"
                );
                return Ok(true);
            }
        }

        tracing::debug!(perm = %perm, object = obj.is_some(), "permission denied");
        Ok(false)
    }

    fn has_module_perms(&self, principal: &dyn Principal, app_label: &str) -> PermissionResult<bool> {
        for handler in self.registry.get_handlers() {
            if handler.has_module_perms(principal, app_label)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Ordered list of backends, consulted the way a host consults its
/// configured authentication backends.
#[derive(Debug, Default, Clone)]
pub struct BackendChain {
    backends: Vec<Arc<dyn AuthorizationBackend>>,
}

impl BackendChain {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, backend: Arc<dyn AuthorizationBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    pub fn push(&mut self, backend: Arc<dyn AuthorizationBackend>) {
        self.backends.push(backend);
    }

    pub fn backends(&self) -> &[Arc<dyn AuthorizationBackend>] {
        &self.backends
    }
}

impl AuthorizationBackend for BackendChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    /// First backend that recognises the credentials wins.
    fn authenticate(&self, username: &str, password: &str) -> Option<UserId> {
        self.backends
            .iter()
            .find_map(|backend| backend.authenticate(username, password))
    }

    /// Active superusers hold every permission; otherwise any backend may grant.
    fn has_perm(
        &self,
        principal: &dyn Principal,
        perm: &Permission,
        obj: Option<&dyn Object>,
    ) -> PermissionResult<bool> {
        if principal.is_active() && principal.is_superuser() {
            return Ok(true);
        }

        for backend in &self.backends {
            if backend.has_perm(principal, perm, obj)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn has_module_perms(&self, principal: &dyn Principal, app_label: &str) -> PermissionResult<bool> {
        if principal.is_active() && principal.is_superuser() {
            return Ok(true);
        }

        for backend in &self.backends {
            if backend.has_module_perms(principal, app_label)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
