use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use rowguard_core::{Model, PermissionError, PermissionResult};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings of the form
/// `"<namespace>.<codename>"` (e.g. `"blog.change_article"`), where the
/// codename conventionally reads `"<action>_<model>"`. Equality is exact
/// string equality; there is no wildcard matching.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Strict parse: the string must have a non-empty namespace and codename.
    pub fn parse(name: impl Into<Cow<'static, str>>) -> PermissionResult<Self> {
        let perm = Self::new(name);
        match perm.as_str().split_once('.') {
            Some((ns, codename)) if !ns.is_empty() && !codename.is_empty() => Ok(perm),
            _ => Err(PermissionError::malformed(perm.as_str())),
        }
    }

    /// Permission for `action` on `model`, e.g. `blog.change_article`.
    pub fn for_model(model: &Model, action: &str) -> Self {
        Self(Cow::Owned(model.permission_string(action)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substring before the first `.`; `None` for a bare codename.
    pub fn namespace(&self) -> Option<&str> {
        self.as_str().split_once('.').map(|(ns, _)| ns)
    }

    /// Substring after the first `.` (the whole string when there is none).
    pub fn codename(&self) -> &str {
        self.as_str()
            .split_once('.')
            .map_or(self.as_str(), |(_, codename)| codename)
    }

    /// Leading action of the codename, e.g. `change` for `blog.change_article`.
    pub fn action(&self) -> Option<&str> {
        self.codename().split_once('_').map(|(action, _)| action)
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Permission {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
