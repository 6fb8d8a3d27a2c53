//! Permission engine error model.

use thiserror::Error;

/// Result type used across the permission engine.
pub type PermissionResult<T> = Result<T, PermissionError>;

/// Engine-level error.
///
/// Most variants are configuration errors raised while the host wires its
/// handlers and logics at startup. A plain "not granted" is never an error;
/// decisions resolve to `false` instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// A handler is already registered for the target.
    #[error("a permission handler is already registered for '{0}'")]
    AlreadyRegistered(String),

    /// No handler has been registered for the target yet.
    #[error("no permission handler has been registered for '{0}'")]
    NotRegistered(String),

    /// Abstract models have no concrete rows to check permissions against.
    #[error("model '{0}' is abstract and cannot be registered")]
    AbstractModel(String),

    /// A handler was constructed for a target it cannot serve.
    #[error("handler '{handler}' cannot be used for '{target}': {reason}")]
    InvalidHandler {
        handler: String,
        target: String,
        reason: String,
    },

    /// Detaching a logic that is not attached to the model.
    #[error("logic '{logic}' is not attached to '{model}'")]
    LogicNotAttached { model: String, logic: String },

    /// A handler did not supply a decision procedure.
    #[error("handler '{0}' does not implement has_perm")]
    NotImplemented(String),

    /// A permission string without a namespace separator (strict parsing).
    #[error("malformed permission string: '{0}'")]
    MalformedPermission(String),

    /// A permission string absent from the host's permission catalog.
    #[error("permission '{0}' is not declared in the permission catalog")]
    UnknownPermission(String),

    /// Settings could not be parsed.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl PermissionError {
    pub fn invalid_handler(
        handler: impl Into<String>,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidHandler {
            handler: handler.into(),
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn not_attached(model: impl Into<String>, logic: impl Into<String>) -> Self {
        Self::LogicNotAttached {
            model: model.into(),
            logic: logic.into(),
        }
    }

    pub fn malformed(perm: impl Into<String>) -> Self {
        Self::MalformedPermission(perm.into())
    }

    /// Returns `true` for errors raised while wiring the engine at startup.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRegistered(_)
                | Self::NotRegistered(_)
                | Self::AbstractModel(_)
                | Self::InvalidHandler { .. }
                | Self::LogicNotAttached { .. }
                | Self::InvalidSettings(_)
        )
    }

    /// Stable short label, suitable for structured log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyRegistered(_) => "already_registered",
            Self::NotRegistered(_) => "not_registered",
            Self::AbstractModel(_) => "abstract_model",
            Self::InvalidHandler { .. } => "invalid_handler",
            Self::LogicNotAttached { .. } => "logic_not_attached",
            Self::NotImplemented(_) => "not_implemented",
            Self::MalformedPermission(_) => "malformed_permission",
            Self::UnknownPermission(_) => "unknown_permission",
            Self::InvalidSettings(_) => "invalid_settings",
            Self::InvalidId(_) => "invalid_id",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_errors_are_configuration_errors() {
        assert!(PermissionError::AlreadyRegistered("blog.article".into()).is_configuration_error());
        assert!(PermissionError::AbstractModel("blog.base".into()).is_configuration_error());
        assert!(
            PermissionError::invalid_handler("logical", "blog", "needs a model")
                .is_configuration_error()
        );
    }

    #[test]
    fn decision_time_errors_are_not_configuration_errors() {
        assert!(!PermissionError::NotImplemented("base".into()).is_configuration_error());
        assert!(!PermissionError::malformed("nodot").is_configuration_error());
        assert_eq!(PermissionError::malformed("nodot").kind(), "malformed_permission");
    }

    #[test]
    fn display_names_the_target() {
        let msg = PermissionError::NotRegistered("blog.article".into()).to_string();
        assert!(msg.contains("blog.article"), "got: {msg}");
    }
}
