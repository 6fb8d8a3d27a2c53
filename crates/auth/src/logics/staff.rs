use std::any::Any;

use rowguard_core::{Model, Object};

use super::{Action, PermissionLogic, grants};
use crate::settings::{GrantFlags, Settings};
use crate::{Permission, Principal};

/// Grants staff principals: `add` class-level, `change`/`delete` on objects.
#[derive(Debug, Clone)]
pub struct StaffLogic {
    flags: GrantFlags,
    model: Option<Model>,
}

impl StaffLogic {
    pub fn new() -> Self {
        Self::from_settings(&Settings::default())
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            flags: settings.staff,
            model: None,
        }
    }

    grant_flag_setters!(any_permission, add_permission, change_permission, delete_permission);

    pub fn flags(&self) -> &GrantFlags {
        &self.flags
    }
}

impl Default for StaffLogic {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionLogic for StaffLogic {
    fn name(&self) -> &'static str {
        "staff"
    }

    fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    fn bind_model(&mut self, model: Model) {
        self.model = Some(model);
    }

    fn has_perm(&self, principal: &dyn Principal, perm: &Permission, obj: Option<&dyn Object>) -> bool {
        if !principal.is_authenticated() || !principal.is_staff() {
            return false;
        }

        match obj {
            None => grants(&self.flags, self.model(), perm, &[Action::Add]),
            Some(_) if principal.is_active() => {
                grants(&self.flags, self.model(), perm, &[Action::Change, Action::Delete])
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
    use rowguard_core::Record;

    use super::*;
    use crate::User;

    fn article_model() -> Model {
        Model::new("blog", "article")
    }

    fn bound(logic: StaffLogic) -> StaffLogic {
        let mut logic = logic;
        logic.bind_model(article_model());
        logic
    }

    fn perm(action: &str) -> Permission {
        Permission::for_model(&article_model(), action)
    }

    #[test]
    fn add_is_class_level_only() {
        let sam = User::new("sam").staff();
        let article = Record::new(article_model(), "1");
        let logic = bound(StaffLogic::new());

        assert!(logic.has_perm(&sam, &perm("add"), None));
        assert!(!logic.has_perm(&sam, &perm("add"), Some(&article)));
    }

    #[test]
    fn change_and_delete_require_an_object() {
        let sam = User::new("sam").staff();
        let article = Record::new(article_model(), "1");
        let logic = bound(StaffLogic::new());

        assert!(!logic.has_perm(&sam, &perm("change"), None));
        assert!(!logic.has_perm(&sam, &perm("delete"), None));
        assert!(logic.has_perm(&sam, &perm("change"), Some(&article)));
        assert!(logic.has_perm(&sam, &perm("delete"), Some(&article)));
    }

    #[test]
    fn any_permission_covers_both_levels() {
        let sam = User::new("sam").staff();
        let article = Record::new(article_model(), "1");
        let logic = bound(StaffLogic::new().any_permission(true));

        assert!(logic.has_perm(&sam, &perm("view"), None));
        assert!(logic.has_perm(&sam, &perm("view"), Some(&article)));
    }

    #[test]
    fn non_staff_are_denied() {
        let alice = User::new("alice");
        let article = Record::new(article_model(), "1");
        let logic = bound(StaffLogic::new().any_permission(true));

        assert!(!logic.has_perm(&alice, &perm("add"), None));
        assert!(!logic.has_perm(&alice, &perm("change"), Some(&article)));
    }
}
