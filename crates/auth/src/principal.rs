//! The principal contract and the two principal types shipped with the engine.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use rowguard_core::{FieldValue, Model, Object, UserId};

use crate::{DecisionCache, Group};

/// The acting identity being checked for access.
///
/// Implemented by the host's user type. The engine only reads it.
pub trait Principal: Send + Sync {
    /// `None` for anonymous principals.
    fn id(&self) -> Option<UserId>;

    fn is_authenticated(&self) -> bool;

    fn is_active(&self) -> bool;

    fn is_staff(&self) -> bool;

    fn is_superuser(&self) -> bool {
        false
    }

    /// Returns `true` if the principal belongs to at least one of `groups`.
    fn in_any_group(&self, groups: &[Group]) -> bool;

    /// Extension point for the request-scoped decision cache.
    fn decision_cache(&self) -> Option<&DecisionCache> {
        None
    }
}

/// Model descriptor of [`User`] records.
pub static USER_MODEL: LazyLock<Model> = LazyLock::new(|| Model::new("auth", "user"));

/// An authenticated user account.
///
/// Carries its own [`DecisionCache`]; call [`User::reset_cache`] when the same
/// `User` value is reused across requests.
#[derive(Debug)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub groups: BTreeSet<Group>,
    cache: DecisionCache,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self::with_id(UserId::new(), username)
    }

    pub fn with_id(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            groups: BTreeSet::new(),
            cache: DecisionCache::new(),
        }
    }

    #[must_use]
    pub fn staff(mut self) -> Self {
        self.is_staff = true;
        self
    }

    #[must_use]
    pub fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self
    }

    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    #[must_use]
    pub fn in_group(mut self, group: impl Into<Group>) -> Self {
        self.groups.insert(group.into());
        self
    }

    pub fn cache(&self) -> &DecisionCache {
        &self.cache
    }

    pub fn reset_cache(&self) {
        self.cache.reset();
    }
}

impl Principal for User {
    fn id(&self) -> Option<UserId> {
        Some(self.id)
    }

    fn is_authenticated(&self) -> bool {
        true
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn is_staff(&self) -> bool {
        self.is_staff
    }

    fn is_superuser(&self) -> bool {
        self.is_superuser
    }

    fn in_any_group(&self, groups: &[Group]) -> bool {
        groups.iter().any(|g| self.groups.contains(g))
    }

    fn decision_cache(&self) -> Option<&DecisionCache> {
        Some(&self.cache)
    }
}

impl Object for User {
    fn model(&self) -> &Model {
        &USER_MODEL
    }

    fn pk(&self) -> String {
        self.id.to_string()
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(FieldValue::User(self.id)),
            "username" => Some(FieldValue::Text(self.username.clone())),
            "is_active" => Some(FieldValue::Bool(self.is_active)),
            "is_staff" => Some(FieldValue::Bool(self.is_staff)),
            "is_superuser" => Some(FieldValue::Bool(self.is_superuser)),
            "groups" => Some(FieldValue::Many(
                self.groups
                    .iter()
                    .map(|g| FieldValue::Text(g.as_str().to_string()))
                    .collect(),
            )),
            _ => None,
        }
    }

    fn principal_id(&self) -> Option<UserId> {
        Some(self.id)
    }
}

/// The unauthenticated visitor. Every built-in logic denies it.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnonymousUser;

impl Principal for AnonymousUser {
    fn id(&self) -> Option<UserId> {
        None
    }

    fn is_authenticated(&self) -> bool {
        false
    }

    fn is_active(&self) -> bool {
        false
    }

    fn is_staff(&self) -> bool {
        false
    }

    fn in_any_group(&self, _groups: &[Group]) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use rowguard_core::field_lookup;

    use super::*;

    #[test]
    fn user_defaults() {
        let alice = User::new("alice");
        assert!(alice.is_authenticated());
        assert!(alice.is_active());
        assert!(!alice.is_staff());
        assert!(!alice.is_superuser());
        assert!(alice.decision_cache().is_some());
    }

    #[test]
    fn group_membership() {
        let alice = User::new("alice").in_group("editors");
        assert!(alice.in_any_group(&[Group::from("writers"), Group::from("editors")]));
        assert!(!alice.in_any_group(&[Group::from("writers")]));
        assert!(!alice.in_any_group(&[]));
    }

    #[test]
    fn user_is_an_object_referring_to_itself() {
        let alice = User::new("alice").in_group("editors");
        assert_eq!(alice.principal_id(), Some(alice.id));
        assert_eq!(field_lookup(&alice, "username").as_text(), Some("alice"));
        assert_eq!(field_lookup(&alice, "groups").len(), 1);
        assert_eq!(alice.key().model, *USER_MODEL);
    }

    #[test]
    fn anonymous_is_never_authenticated() {
        let anon = AnonymousUser;
        assert!(!anon.is_authenticated());
        assert!(anon.id().is_none());
        assert!(anon.decision_cache().is_none());
    }
}
