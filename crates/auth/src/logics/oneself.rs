use std::any::Any;

use rowguard_core::{Model, Object};

use super::{Action, PermissionLogic, grants};
use crate::settings::{GrantFlags, Settings};
use crate::{Permission, Principal};

/// Grants a principal change/delete permissions on its own account record.
#[derive(Debug, Clone)]
pub struct OneselfLogic {
    flags: GrantFlags,
    model: Option<Model>,
}

impl OneselfLogic {
    pub fn new() -> Self {
        Self::from_settings(&Settings::default())
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            flags: settings.oneself,
            model: None,
        }
    }

    grant_flag_setters!(any_permission, change_permission, delete_permission);

    pub fn flags(&self) -> &GrantFlags {
        &self.flags
    }
}

impl Default for OneselfLogic {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionLogic for OneselfLogic {
    fn name(&self) -> &'static str {
        "oneself"
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
                principal.id().is_some()
                    && obj.principal_id() == principal.id()
                    && grants(&self.flags, self.model(), perm, &actions)
            }
            Some(_) => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
