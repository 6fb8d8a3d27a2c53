//! Engine configuration.
//!
//! Settings are read once at startup and handed to the registry and to the
//! logics' `from_settings` constructors. Nothing reads them at decision time.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use rowguard_core::{PermissionError, PermissionResult};

pub const ENV_DEFAULT_HANDLER: &str = "ROWGUARD_DEFAULT_HANDLER";
pub const ENV_CHECK_PERMISSION_PRESENCE: &str = "ROWGUARD_CHECK_PERMISSION_PRESENCE";
pub const ENV_AUTHOR_FIELD_NAME: &str = "ROWGUARD_AUTHOR_FIELD_NAME";
pub const ENV_COLLABORATORS_FIELD_NAME: &str = "ROWGUARD_COLLABORATORS_FIELD_NAME";

pub const DEFAULT_AUTHOR_FIELD_NAME: &str = "author";
pub const DEFAULT_COLLABORATORS_FIELD_NAME: &str = "collaborators";

/// Built-in handler kinds selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    /// Delegates to the logics attached to the handler's model.
    #[default]
    Logical,
    /// Computes its supported permissions but has no decision procedure.
    Base,
}

impl HandlerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::Logical => "logical",
            HandlerKind::Base => "base",
        }
    }
}

impl FromStr for HandlerKind {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "logical" => Ok(HandlerKind::Logical),
            "base" => Ok(HandlerKind::Base),
            other => Err(PermissionError::InvalidSettings(format!(
                "unknown handler kind '{other}'"
            ))),
        }
    }
}

/// Which permissions a logic grants once its condition holds.
///
/// Owner-style logics (author, collaborators, oneself) ignore `add_permission`:
/// there is no owner before the object exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrantFlags {
    pub any_permission: bool,
    pub add_permission: bool,
    pub change_permission: bool,
    pub delete_permission: bool,
}

impl Default for GrantFlags {
    fn default() -> Self {
        Self {
            any_permission: false,
            add_permission: true,
            change_permission: true,
            delete_permission: true,
        }
    }
}

/// Defaults for logics that inspect a field of the target object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldLogicSettings {
    /// Relation path to inspect; `None` keeps the logic's built-in default.
    pub field_name: Option<String>,
    #[serde(flatten)]
    pub flags: GrantFlags,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Handler used by `register(target, None)`.
    pub default_handler: HandlerKind,
    /// Validate permission strings against the catalog.
    pub check_permission_presence: bool,
    pub author: FieldLogicSettings,
    pub collaborators: FieldLogicSettings,
    pub group_in: GrantFlags,
    pub oneself: GrantFlags,
    pub staff: GrantFlags,
}

impl Settings {
    pub fn author_field_name(&self) -> &str {
        self.author
            .field_name
            .as_deref()
            .unwrap_or(DEFAULT_AUTHOR_FIELD_NAME)
    }

    pub fn collaborators_field_name(&self) -> &str {
        self.collaborators
            .field_name
            .as_deref()
            .unwrap_or(DEFAULT_COLLABORATORS_FIELD_NAME)
    }

    /// Parse settings from JSON; absent keys keep their defaults.
    pub fn from_json(raw: &str) -> PermissionResult<Self> {
        serde_json::from_str(raw).map_err(|e| PermissionError::InvalidSettings(e.to_string()))
    }

    /// Defaults overlaid with the `ROWGUARD_*` environment variables.
    ///
    /// Unparsable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(raw) = lookup(ENV_DEFAULT_HANDLER) {
            match raw.parse::<HandlerKind>() {
                Ok(kind) => settings.default_handler = kind,
                Err(e) => tracing::warn!(key = ENV_DEFAULT_HANDLER, error = %e, "ignoring setting"),
            }
        }

        if let Some(raw) = lookup(ENV_CHECK_PERMISSION_PRESENCE) {
            match parse_bool(&raw) {
                Some(flag) => settings.check_permission_presence = flag,
                None => tracing::warn!(
                    key = ENV_CHECK_PERMISSION_PRESENCE,
                    value = %raw,
                    "ignoring non-boolean setting"
                ),
            }
        }

        if let Some(field) = lookup(ENV_AUTHOR_FIELD_NAME).filter(|f| !f.trim().is_empty()) {
            settings.author.field_name = Some(field.trim().to_string());
        }

        if let Some(field) = lookup(ENV_COLLABORATORS_FIELD_NAME).filter(|f| !f.trim().is_empty()) {
            settings.collaborators.field_name = Some(field.trim().to_string());
        }

        settings
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
