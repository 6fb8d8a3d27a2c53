use serde::Serialize;
use thiserror::Error;

use rowguard_core::{Object, PermissionError, UserId};

use crate::{AuthorizationBackend, Permission, Principal, ResolutionBackend};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),

    #[error(transparent)]
    Resolution(#[from] PermissionError),
}

/// Guard for the host's command/request boundary.
///
/// Unauthenticated principals are rejected before any backend is asked; a
/// `false` decision becomes [`AuthzError::Forbidden`].
pub fn require(
    backend: &dyn AuthorizationBackend,
    principal: &dyn Principal,
    perm: &Permission,
    obj: Option<&dyn Object>,
) -> Result<(), AuthzError> {
    if !principal.is_authenticated() {
        return Err(AuthzError::Unauthenticated);
    }

    if backend.has_perm(principal, perm, obj)? {
        Ok(())
    } else {
        tracing::debug!(perm = %perm, backend = backend.name(), "authorization refused");
        Err(AuthzError::Forbidden(perm.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Why a permission was (or would be) granted or denied by the resolution
/// backend, handler by handler.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required_permission: String,

    /// `"app.model:pk"` of the target object, if any.
    pub object: Option<String>,

    pub granted: bool,

    /// Human-readable reason for the decision.
    pub reason: String,

    pub principal: PrincipalState,

    /// Every handler claiming the permission, in the order they are asked.
    pub handlers: Vec<HandlerVerdict>,

    pub denial_reason: Option<DenialReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrincipalState {
    pub principal_id: Option<UserId>,
    pub is_authenticated: bool,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl PrincipalState {
    fn of(principal: &dyn Principal) -> Self {
        Self {
            principal_id: principal.id(),
            is_authenticated: principal.is_authenticated(),
            is_active: principal.is_active(),
            is_staff: principal.is_staff(),
            is_superuser: principal.is_superuser(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HandlerVerdict {
    /// Model (`app.model`) or namespace the handler is registered for.
    pub scope: String,
    pub handler: String,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "message")]
pub enum Verdict {
    Granted,
    Denied,
    Error(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    UnknownPermission,
    NoHandler,
    NotGranted,
}

/// Explain how `backend` decides `perm` for `principal` on `obj`.
///
/// Unlike [`AuthorizationBackend::has_perm`] every candidate handler is asked,
/// and handler errors are recorded as verdicts instead of aborting.
pub fn explain(
    backend: &ResolutionBackend,
    principal: &dyn Principal,
    perm: &Permission,
    obj: Option<&dyn Object>,
) -> AuthorizationExplanation {
    let mut explanation = AuthorizationExplanation {
        required_permission: perm.to_string(),
        object: obj.map(|o| o.key().to_string()),
        granted: false,
        reason: String::new(),
        principal: PrincipalState::of(principal),
        handlers: Vec::new(),
        denial_reason: None,
    };

    if let Err(err) = backend.check_presence(perm) {
        explanation.reason = err.to_string();
        explanation.denial_reason = Some(DenialReason {
            kind: DenialKind::UnknownPermission,
            message: format!("'{perm}' is not declared in the permission catalog"),
            suggestions: vec![
                "Declare the permission for its model in the catalog".to_string(),
                "Check the permission string for typos".to_string(),
            ],
        });
        return explanation;
    }

    for handler in backend.candidates(perm) {
        let verdict = match handler.has_perm(principal, perm, obj) {
            Ok(true) => Verdict::Granted,
            Ok(false) => Verdict::Denied,
            Err(err) => Verdict::Error(err.to_string()),
        };
        explanation.handlers.push(HandlerVerdict {
            scope: handler.target().to_string(),
            handler: handler.name().to_string(),
            verdict,
        });
    }

    let granted_by = explanation
        .handlers
        .iter()
        .find(|h| h.verdict == Verdict::Granted);

    if let Some(grant) = granted_by {
        explanation.reason = format!("Granted by the '{}' handler of '{}'", grant.handler, grant.scope);
        explanation.granted = true;
        return explanation;
    }

    if explanation.handlers.is_empty() {
        explanation.reason = format!("No registered handler supports '{perm}'");
        explanation.denial_reason = Some(DenialReason {
            kind: DenialKind::NoHandler,
            message: format!("No handler claims '{perm}'"),
            suggestions: vec![
                "Register a handler for the permission's model".to_string(),
                "Check the handler's includes and excludes".to_string(),
            ],
        });
    } else {
        explanation.reason = format!(
            "None of the {} handler(s) supporting '{perm}' granted it",
            explanation.handlers.len()
        );
        explanation.denial_reason = Some(DenialReason {
            kind: DenialKind::NotGranted,
            message: format!("Missing required permission: '{perm}'"),
            suggestions: vec!["Attach a logic granting this permission to the model".to_string()],
        });
    }

    explanation
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rowguard_core::{Model, Record};

    use super::*;
    use crate::{AnonymousUser, AuthorLogic, HandlerFactory, HandlerRegistry, InMemoryCatalog, Settings, User};

    fn article() -> Model {
        Model::new("blog", "article")
    }

    fn backend_with(settings: Settings) -> ResolutionBackend {
        let catalog = InMemoryCatalog::new().with_defaults(&article());
        let registry = HandlerRegistry::with_settings(Arc::new(catalog), settings);
        registry.attach_logic(&article(), AuthorLogic::new()).unwrap();
        ResolutionBackend::new(Arc::new(registry))
    }

    fn backend() -> ResolutionBackend {
        backend_with(Settings::default())
    }

    #[test]
    fn require_maps_decisions_to_errors() {
        let backend = backend();
        let alice = User::new("alice");
        let bob = User::new("bob");
        let article = Record::new(article(), "1").with("author", alice.id);
        let change = Permission::from("blog.change_article");

        assert_eq!(require(&backend, &alice, &change, Some(&article)), Ok(()));
        assert_eq!(
            require(&backend, &bob, &change, Some(&article)),
            Err(AuthzError::Forbidden("blog.change_article".into()))
        );
        assert_eq!(
            require(&backend, &AnonymousUser, &change, Some(&article)),
            Err(AuthzError::Unauthenticated)
        );
    }

    #[test]
    fn require_surfaces_resolution_errors() {
        let catalog = Arc::new(InMemoryCatalog::new().with_defaults(&article()));
        let registry = HandlerRegistry::new(catalog);
        registry.register(&article(), Some(HandlerFactory::base())).unwrap();
        let backend = ResolutionBackend::new(Arc::new(registry));

        let err = require(&backend, &User::new("alice"), &Permission::from("blog.view_article"), None).unwrap_err();
        assert!(matches!(err, AuthzError::Resolution(PermissionError::NotImplemented(_))));
    }

    #[test]
    fn explain_lists_handler_verdicts() {
        let backend = backend();
        let alice = User::new("alice");
        let article = Record::new(article(), "7").with("author", alice.id);

        let granted = explain(&backend, &alice, &Permission::from("blog.delete_article"), Some(&article));
        assert!(granted.granted);
        assert_eq!(granted.object.as_deref(), Some("blog.article:7"));
        assert_eq!(granted.handlers.len(), 1);
        assert_eq!(granted.handlers[0].verdict, Verdict::Granted);
        assert!(granted.denial_reason.is_none());

        let denied = explain(&backend, &alice, &Permission::from("blog.add_article"), None);
        assert!(!denied.granted);
        assert_eq!(denied.handlers[0].verdict, Verdict::Denied);
        assert_eq!(denied.denial_reason.map(|d| d.kind), Some(DenialKind::NotGranted));
    }

    #[test]
    fn explain_without_handlers() {
        let explanation = explain(&backend(), &User::new("alice"), &Permission::from("shop.refund_order"), None);
        assert!(!explanation.granted);
        assert!(explanation.handlers.is_empty());
        assert_eq!(explanation.denial_reason.map(|d| d.kind), Some(DenialKind::NoHandler));
    }

    #[test]
    fn explain_reports_undeclared_permissions() {
        let backend = backend_with(Settings {
            check_permission_presence: true,
            ..Settings::default()
        });
        let explanation = explain(&backend, &User::new("alice"), &Permission::from("blog.publish_article"), None);
        assert_eq!(explanation.denial_reason.map(|d| d.kind), Some(DenialKind::UnknownPermission));
    }

    #[test]
    fn explanation_serializes() {
        let alice = User::new("alice");
        let explanation = explain(&backend(), &alice, &Permission::from("blog.change_article"), None);
        let json = serde_json::to_value(&explanation).unwrap();

        assert_eq!(json["required_permission"], "blog.change_article");
        assert_eq!(json["granted"], true);
        assert_eq!(json["handlers"][0]["verdict"]["kind"], "granted");
        assert_eq!(json["principal"]["principal_id"], alice.id.to_string());
    }
}
