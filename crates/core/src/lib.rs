//! `useradmin-core`: shared role-administration primitives.
//!
//! This crate holds the vocabulary every other layer speaks (names, kinds,
//! attribute values, errors) and nothing that touches storage or threads.

pub mod error;
pub mod kind;
pub mod name;
pub mod value;

pub use error::{UserAdminError, UserAdminResult};
pub use kind::RoleKind;
pub use name::{RoleName, USER_ANYONE};
pub use value::AttributeValue;
