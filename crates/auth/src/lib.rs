//! `rowguard-auth`: object-level permission resolution engine.
//!
//! Handlers are registered per model (or per namespace) in a
//! [`HandlerRegistry`]; each model carries an ordered list of
//! [`PermissionLogic`]s; the [`ResolutionBackend`] answers
//! `has_perm(principal, perm, obj)` by asking the handlers that claim `perm`.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod attach;
pub mod authorize;
pub mod backend;
pub mod cache;
pub mod catalog;
pub mod group;
pub mod handler;
pub mod logics;
pub mod permission_set;
pub mod permissions;
pub mod principal;
pub mod registry;
pub mod settings;

pub use attach::{LogicSelector, LogicStore};
pub use authorize::{AuthorizationExplanation, AuthzError, explain, require};
pub use backend::{AuthorizationBackend, BackendChain, ResolutionBackend};
pub use cache::{CacheKey, DecisionCache};
pub use catalog::{InMemoryCatalog, PermissionCatalog};
pub use group::Group;
pub use handler::{
    BaseHandler, HandlerContext, HandlerCore, HandlerFactory, HandlerTarget, LogicalHandler, PermissionHandler,
};
pub use logics::{Action, AuthorLogic, CollaboratorsLogic, GroupInLogic, OneselfLogic, PermissionLogic, StaffLogic};
pub use permission_set::{HandlerScope, PermissionSet};
pub use permissions::Permission;
pub use principal::{AnonymousUser, Principal, User};
pub use registry::HandlerRegistry;
pub use settings::{FieldLogicSettings, GrantFlags, HandlerKind, Settings};

pub use rowguard_core::{FieldValue, Model, Object, ObjectKey, PermissionError, PermissionResult, Record, UserId};
