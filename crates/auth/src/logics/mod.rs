//! Permission logics: reusable grant rules attached to models.
//!
//! A logic answers one question: does this principal hold this permission,
//! optionally on this object? Logics never veto each other; a handler grants
//! as soon as one attached logic says yes.
//!
//! | Logic | Grants when |
//! |-------|-------------|
//! | [`AuthorLogic`] | the object's author field is the principal |
//! | [`CollaboratorsLogic`] | the principal is in the object's collaborators |
//! | [`GroupInLogic`] | the principal is in one of the named groups |
//! | [`OneselfLogic`] | the object is the principal |
//! | [`StaffLogic`] | the principal is staff |

use std::any::Any;

use rowguard_core::{Model, Object};

use crate::settings::GrantFlags;
use crate::{Permission, Principal};

macro_rules! grant_flag_setters {
    ($($flag:ident),* $(,)?) => {
        $(
            #[must_use]
            pub fn $flag(mut self, enabled: bool) -> Self {
                self.flags.$flag = enabled;
                self
            }
        )*
    };
}

mod author;
mod collaborators;
mod group_in;
mod oneself;
mod staff;

pub use author::AuthorLogic;
pub use collaborators::CollaboratorsLogic;
pub use group_in::GroupInLogic;
pub use oneself::OneselfLogic;
pub use staff::StaffLogic;

/// A grant rule.
///
/// Configuration is fixed once the logic is attached; `has_perm` only reads
/// it. Implementations must not fail: every "cannot tell" is `false`.
pub trait PermissionLogic: Send + Sync + core::fmt::Debug + 'static {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// The model this logic is attached to, if any.
    fn model(&self) -> Option<&Model>;

    /// Back-reference set once when the logic is attached to `model`.
    fn bind_model(&mut self, model: Model);

    fn has_perm(&self, principal: &dyn Principal, perm: &Permission, obj: Option<&dyn Object>) -> bool;

    fn as_any(&self) -> &dyn Any;
}

/// Actions the built-in logics know how to grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Change,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::Change => "change",
            Action::Delete => "delete",
        }
    }

    fn enabled(self, flags: &GrantFlags) -> bool {
        match self {
            Action::Add => flags.add_permission,
            Action::Change => flags.change_permission,
            Action::Delete => flags.delete_permission,
        }
    }

    /// Returns `true` if `perm` is this action.
    ///
    /// Bound logics compare against the model's full permission string; an
    /// unbound logic can only compare the codename's leading action.
    pub fn matches(self, model: Option<&Model>, perm: &Permission) -> bool {
        match model {
            Some(model) => perm.as_str() == model.permission_string(self.as_str()),
            None => perm.action() == Some(self.as_str()),
        }
    }
}

/// `any_permission`, or one of `actions` is both enabled and requested.
pub(crate) fn grants(flags: &GrantFlags, model: Option<&Model>, perm: &Permission, actions: &[Action]) -> bool {
    flags.any_permission
        || actions
            .iter()
            .any(|action| action.enabled(flags) && action.matches(model, perm))
}
