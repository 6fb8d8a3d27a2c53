//! Target objects of row-level permission checks.
//!
//! The engine never owns host data. It sees objects through the [`Object`]
//! trait: a model, a primary key, and named fields whose values are
//! [`FieldValue`]s. Relations are expressed as nested objects (to-one) or
//! [`FieldValue::Many`] (to-many).

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Model, UserId};

/// Read-only view of a host object.
pub trait Object: Send + Sync + core::fmt::Debug {
    /// The model this object is an instance of.
    fn model(&self) -> &Model;

    /// Primary key, rendered as a string.
    fn pk(&self) -> String;

    /// Value of a single field. `None` when the object has no such field.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// The principal this object *is*, if it is a user record.
    fn principal_id(&self) -> Option<UserId> {
        None
    }

    /// Stable identity used as a cache key.
    fn key(&self) -> ObjectKey {
        ObjectKey::new(self.model().clone(), self.pk())
    }
}

/// Identity of an object: its model and primary key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub model: Model,
    pub pk: String,
}

impl ObjectKey {
    pub fn new(model: Model, pk: impl Into<String>) -> Self {
        Self { model, pk: pk.into() }
    }
}

impl core::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.model, self.pk)
    }
}

/// A resolved field value.
#[derive(Debug, Clone, Default)]
pub enum FieldValue {
    /// Missing or empty value.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    /// Reference to a principal by id.
    User(UserId),
    /// To-one relation.
    Object(Arc<dyn Object>),
    /// To-many relation (or the fan-out of a lookup through one).
    Many(Vec<FieldValue>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Returns `true` if this single value denotes the given principal.
    ///
    /// A to-many value never *equals* a principal; use
    /// [`FieldValue::contains_principal`] for membership.
    pub fn is_principal(&self, id: UserId) -> bool {
        match self {
            FieldValue::User(u) => *u == id,
            FieldValue::Object(o) => o.principal_id() == Some(id),
            _ => false,
        }
    }

    /// Membership test: the value is the principal, or a collection holding it.
    pub fn contains_principal(&self, id: UserId) -> bool {
        match self {
            FieldValue::Many(items) => items.iter().any(|v| v.contains_principal(id)),
            other => other.is_principal(id),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Number of leaf values (`Null` counts as zero).
    pub fn len(&self) -> usize {
        match self {
            FieldValue::Null => 0,
            FieldValue::Many(items) => items.iter().map(FieldValue::len).sum(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<UserId> for FieldValue {
    fn from(value: UserId) -> Self {
        FieldValue::User(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl<T: Object + 'static> From<Arc<T>> for FieldValue {
    fn from(value: Arc<T>) -> Self {
        FieldValue::Object(value)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(values: Vec<T>) -> Self {
        FieldValue::Many(values.into_iter().map(Into::into).collect())
    }
}

/// Generic object for hosts without their own object types.
#[derive(Debug, Clone)]
pub struct Record {
    model: Model,
    pk: String,
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(model: Model, pk: impl Into<String>) -> Self {
        Self {
            model,
            pk: pk.into(),
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }
}

impl Object for Record {
    fn model(&self) -> &Model {
        &self.model
    }

    fn pk(&self) -> String {
        self.pk.clone()
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).cloned()
    }
}
