//! `rowguard-core`: permission engine building blocks.
//!
//! This crate contains **pure** primitives (no infrastructure concerns): the
//! identifiers, model descriptors and target-object abstraction the resolution
//! engine reasons about, plus the engine's error model.

pub mod error;
pub mod id;
pub mod lookup;
pub mod model;
pub mod object;

pub use error::{PermissionError, PermissionResult};
pub use id::UserId;
pub use lookup::field_lookup;
pub use model::Model;
pub use object::{FieldValue, Object, ObjectKey, Record};
