use std::any::Any;

use rowguard_core::{Model, Object, field_lookup};

use super::{Action, PermissionLogic, grants};
use crate::settings::{GrantFlags, Settings};
use crate::{Permission, Principal};

/// Grants the author of an object change/delete permissions on it.
///
/// Without an object the decision falls back to the flags alone: with the
/// defaults, `change` and `delete` are granted class-level so that row-level
/// checks get a chance to run.
#[derive(Debug, Clone)]
pub struct AuthorLogic {
    field_name: String,
    flags: GrantFlags,
    model: Option<Model>,
}

impl AuthorLogic {
    pub fn new() -> Self {
        Self::from_settings(&Settings::default())
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            field_name: settings.author_field_name().to_string(),
            flags: settings.author.flags,
            model: None,
        }
    }

    /// Relation path holding the author, e.g. `"owner"` or `"post__author"`.
    #[must_use]
    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = field_name.into();
        self
    }

    grant_flag_setters!(any_permission, change_permission, delete_permission);

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn flags(&self) -> &GrantFlags {
        &self.flags
    }
}

impl Default for AuthorLogic {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionLogic for AuthorLogic {
    fn name(&self) -> &'static str {
        "author"
    }

    fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    fn bind_model(&mut self, model: Model) {
        self.model = Some(model);
    }

    fn has_perm(&self, principal: &dyn Principal, perm: &Permission, obj: Option<&dyn Object>) -> bool {
        if !principal.is_authenticated() {
            return false;
        }

        let actions = [Action::Change, Action::Delete];
        match obj {
            None => grants(&self.flags, self.model(), perm, &actions),
            Some(obj) if principal.is_active() => {
                let Some(id) = principal.id() else {
                    return false;
                };
                field_lookup(obj, &self.field_name).is_principal(id)
                    && grants(&self.flags, self.model(), perm, &actions)
            }
            Some(_) => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rowguard_core::Record;

    use super::*;
    use crate::{AnonymousUser, User};

    fn article_model() -> Model {
        Model::new("blog", "article")
    }

    fn bound(logic: AuthorLogic) -> AuthorLogic {
        let mut logic = logic;
        logic.bind_model(article_model());
        logic
    }

    fn perm(action: &str) -> Permission {
        Permission::for_model(&article_model(), action)
    }

    #[test]
    fn author_may_change_and_delete() {
        let alice = User::new("alice");
        let article = Record::new(article_model(), "1").with("author", alice.id);
        let logic = bound(AuthorLogic::new());

        assert!(logic.has_perm(&alice, &perm("change"), Some(&article)));
        assert!(logic.has_perm(&alice, &perm("delete"), Some(&article)));
        assert!(!logic.has_perm(&alice, &perm("add"), Some(&article)));
        assert!(!logic.has_perm(&alice, &perm("view"), Some(&article)));
    }

    #[test]
    fn other_principals_are_denied() {
        let alice = User::new("alice");
        let bob = User::new("bob");
        let article = Record::new(article_model(), "1").with("author", alice.id);
        let logic = bound(AuthorLogic::new());

        assert!(!logic.has_perm(&bob, &perm("change"), Some(&article)));
    }

    #[test]
    fn class_level_follows_flags_exactly() {
        let alice = User::new("alice");
        let logic = bound(AuthorLogic::new());

        assert!(logic.has_perm(&alice, &perm("change"), None));
        assert!(logic.has_perm(&alice, &perm("delete"), None));
        assert!(!logic.has_perm(&alice, &perm("add"), None));

        let restricted = bound(AuthorLogic::new().change_permission(false).delete_permission(false));
        assert!(!restricted.has_perm(&alice, &perm("change"), None));
        assert!(!restricted.has_perm(&alice, &perm("delete"), None));

        let any = bound(AuthorLogic::new().any_permission(true));
        assert!(any.has_perm(&alice, &perm("add"), None));
    }

    #[test]
    fn anonymous_and_inactive_are_denied() {
        let alice = User::new("alice").inactive();
        let article = Record::new(article_model(), "1").with("author", alice.id);
        let logic = bound(AuthorLogic::new());

        assert!(!logic.has_perm(&AnonymousUser, &perm("change"), None));
        assert!(!logic.has_perm(&AnonymousUser, &perm("change"), Some(&article)));
        assert!(!logic.has_perm(&alice, &perm("change"), Some(&article)));
    }

    #[test]
    fn missing_field_is_no_match() {
        let alice = User::new("alice");
        let article = Record::new(article_model(), "1");
        let logic = bound(AuthorLogic::new());

        assert!(!logic.has_perm(&alice, &perm("change"), Some(&article)));
    }

    #[test]
    fn author_through_a_relation_path() {
        let alice = Arc::new(User::new("alice"));
        let profile = Arc::new(
            Record::new(Model::new("accounts", "profile"), "p1").with("user", alice.clone()),
        );
        let article = Record::new(article_model(), "1").with("owner", profile);
        let logic = bound(AuthorLogic::new().with_field_name("owner__user"));

        assert_eq!(logic.field_name(), "owner__user");
        assert!(logic.has_perm(alice.as_ref(), &perm("change"), Some(&article)));
    }
}
