//! Shade type model.
//!
//! Types are structural values: freely cloned, compared by structure, and
//! immutable once built. Every named type ultimately refers back to a
//! declaration (a [`DeclRef`] carrying a substitution chain); the handful
//! of compiler-known shapes (scalars, vectors, matrices, arrays) get
//! dedicated variants so that equality and unification never need to chase
//! a declaration arena.
//!
//! This crate is the foundation of the workspace: it knows about
//! declaration *identities* ([`DeclId`]) but not about declarations
//! themselves.

mod cost;
mod ids;
mod scalar;
mod subst;
mod ty;
mod val;

pub use cost::ConversionCost;
pub use ids::DeclId;
pub use scalar::ScalarType;
pub use subst::{DeclRef, Subst, SubstArg};
pub use ty::{FuncParam, ParamDirection, QualType, Type};
pub use val::{IntVal, Val};
