use std::any::Any;

use rowguard_core::{Model, Object, field_lookup};

use super::{Action, PermissionLogic, grants};
use crate::settings::{GrantFlags, Settings};
use crate::{Permission, Principal};

/// Grants members of an object's collaborator list change/delete permissions.
///
/// Row-level only: without an object there is no list to be a member of.
#[derive(Debug, Clone)]
pub struct CollaboratorsLogic {
    field_name: String,
    flags: GrantFlags,
    model: Option<Model>,
}

impl CollaboratorsLogic {
    pub fn new() -> Self {
        Self::from_settings(&Settings::default())
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            field_name: settings.collaborators_field_name().to_string(),
            flags: settings.collaborators.flags,
            model: None,
        }
    }

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

impl Default for CollaboratorsLogic {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionLogic for CollaboratorsLogic {
    fn name(&self) -> &'static str {
        "collaborators"
    }

    fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    fn bind_model(&mut self, model: Model) {
        self.model = Some(model);
    }

    fn has_perm(&self, principal: &dyn Principal, perm: &Permission, obj: Option<&dyn Object>) -> bool {
        let Some(obj) = obj else {
            return false;
        };
        if !principal.is_authenticated() || !principal.is_active() {
            return false;
        }
        let Some(id) = principal.id() else {
            return false;
        };

        field_lookup(obj, &self.field_name).contains_principal(id)
            && grants(&self.flags, self.model(), perm, &[Action::Change, Action::Delete])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use rowguard_core::{FieldValue, Record};

    use super::*;
    use crate::User;

    fn article_model() -> Model {
        Model::new("blog", "article")
    }

    fn bound(logic: CollaboratorsLogic) -> CollaboratorsLogic {
        let mut logic = logic;
        logic.bind_model(article_model());
        logic
    }

    fn perm(action: &str) -> Permission {
        Permission::for_model(&article_model(), action)
    }

    #[test]
    fn collaborators_may_change_and_delete() {
        let alice = User::new("alice");
        let bob = User::new("bob");
        let carol = User::new("carol");
        let article = Record::new(article_model(), "1").with("collaborators", vec![alice.id, bob.id]);
        let logic = bound(CollaboratorsLogic::new());

        assert!(logic.has_perm(&alice, &perm("change"), Some(&article)));
        assert!(logic.has_perm(&bob, &perm("delete"), Some(&article)));
        assert!(!logic.has_perm(&carol, &perm("change"), Some(&article)));
        assert!(!logic.has_perm(&alice, &perm("add"), Some(&article)));
    }

    #[test]
    fn never_grants_without_an_object() {
        let alice = User::new("alice");
        let logic = bound(CollaboratorsLogic::new().any_permission(true));

        for action in ["add", "change", "delete", "view"] {
            assert!(!logic.has_perm(&alice, &perm(action), None));
        }
    }

    #[test]
    fn empty_or_missing_list_is_no_match() {
        let alice = User::new("alice");
        let logic = bound(CollaboratorsLogic::new());

        let empty = Record::new(article_model(), "1").with("collaborators", FieldValue::Many(vec![]));
        let missing = Record::new(article_model(), "2");

        assert!(!logic.has_perm(&alice, &perm("change"), Some(&empty)));
        assert!(!logic.has_perm(&alice, &perm("change"), Some(&missing)));
    }

    #[test]
    fn a_single_collaborator_value_counts_as_membership() {
        let alice = User::new("alice");
        let article = Record::new(article_model(), "1").with("editors", alice.id);
        let logic = bound(CollaboratorsLogic::new().with_field_name("editors"));

        assert!(logic.has_perm(&alice, &perm("change"), Some(&article)));
    }

    #[test]
    fn inactive_collaborators_are_denied() {
        let alice = User::new("alice").inactive();
        let article = Record::new(article_model(), "1").with("collaborators", vec![alice.id]);
        let logic = bound(CollaboratorsLogic::new());

        assert!(!logic.has_perm(&alice, &perm("change"), Some(&article)));
    }
}
