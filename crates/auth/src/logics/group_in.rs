use std::any::Any;

use rowguard_core::{Model, Object};

use super::{Action, PermissionLogic, grants};
use crate::settings::{GrantFlags, Settings};
use crate::{Group, Permission, Principal};

/// Grants members of the named groups, regardless of the object's content.
///
/// Class-level checks may grant add/change/delete; row-level checks grant
/// change/delete.
#[derive(Debug, Clone)]
pub struct GroupInLogic {
    groups: Vec<Group>,
    flags: GrantFlags,
    model: Option<Model>,
}

impl GroupInLogic {
    pub fn new<I, G>(groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<Group>,
    {
        Self::from_settings(groups, &Settings::default())
    }

    pub fn from_settings<I, G>(groups: I, settings: &Settings) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<Group>,
    {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
            flags: settings.group_in,
            model: None,
        }
    }

    grant_flag_setters!(any_permission, add_permission, change_permission, delete_permission);

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn flags(&self) -> &GrantFlags {
        &self.flags
    }
}

impl PermissionLogic for GroupInLogic {
    fn name(&self) -> &'static str {
        "group_in"
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

        match obj {
            None => {
                principal.in_any_group(&self.groups)
                    && grants(
                        &self.flags,
                        self.model(),
                        perm,
                        &[Action::Add, Action::Change, Action::Delete],
                    )
            }
            Some(_) if principal.is_active() => {
                principal.in_any_group(&self.groups)
                    && grants(&self.flags, self.model(), perm, &[Action::Change, Action::Delete])
            }
            Some(_) => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
