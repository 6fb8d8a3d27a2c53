//! Model descriptors.
//!
//! A [`Model`] names a kind of object the host stores (its "class"), grouped
//! under an application label. Permission strings for a model follow the
//! `"<app_label>.<action>_<model_name>"` convention.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Descriptor of a host model.
///
/// Identity is the `(app_label, model_name)` pair plus the abstract flag;
/// model names are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "ModelRepr")]
pub struct Model {
    app_label: Cow<'static, str>,
    model_name: Cow<'static, str>,
    is_abstract: bool,
}

/// Wire shape of [`Model`]; decoding goes through [`Model::new`] so names are lowercased.
#[derive(Deserialize)]
struct ModelRepr {
    app_label: String,
    model_name: String,
    #[serde(default)]
    is_abstract: bool,
}

impl From<ModelRepr> for Model {
    fn from(repr: ModelRepr) -> Self {
        Self {
            is_abstract: repr.is_abstract,
            ..Self::new(repr.app_label, repr.model_name)
        }
    }
}

impl Model {
    pub fn new(app_label: impl Into<Cow<'static, str>>, model_name: impl Into<Cow<'static, str>>) -> Self {
        let model_name: Cow<'static, str> = model_name.into();
        let model_name = if model_name.chars().any(char::is_uppercase) {
            Cow::Owned(model_name.to_lowercase())
        } else {
            model_name
        };

        Self {
            app_label: app_label.into(),
            model_name,
            is_abstract: false,
        }
    }

    /// An abstract model. It has no concrete rows, so it can never own a handler.
    pub fn new_abstract(
        app_label: impl Into<Cow<'static, str>>,
        model_name: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            is_abstract: true,
            ..Self::new(app_label, model_name)
        }
    }

    pub fn app_label(&self) -> &str {
        &self.app_label
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Codename for an action on this model, e.g. `change_article`.
    pub fn codename(&self, action: &str) -> String {
        format!("{}_{}", action, self.model_name)
    }

    /// Fully qualified permission string for an action, e.g. `blog.change_article`.
    pub fn permission_string(&self, action: &str) -> String {
        format!("{}.{}", self.app_label, self.codename(action))
    }
}

impl core::fmt::Display for Model {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.app_label, self.model_name)
    }
}
