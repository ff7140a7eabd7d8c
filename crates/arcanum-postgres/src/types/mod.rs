//! Shared database types.

mod constraint;

pub use constraint::{
    AccountConstraints, ConstraintCategory, ConstraintViolation, RefreshSessionConstraints,
};
