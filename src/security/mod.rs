//! Cell-level access control.
//!
//! Every datum carries a [`Visibility`] expression; a caller presents
//! [`Authorizations`] and may read the datum when the expression evaluates to
//! true for them.

/// Caller authorization sets.
pub mod authorizations;

/// Visibility expression parsing and evaluation.
pub mod visibility;

pub use authorizations::Authorizations;
pub use visibility::{can_read, is_valid, Visibility};
