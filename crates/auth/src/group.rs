use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Name of a principal group (e.g. `"editors"`).
///
/// Groups are opaque strings at this layer; the host decides how principals
/// join them. Logics only test membership.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Group(Cow<'static, str>);

impl Group {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Group {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Group {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Group {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
