//! Shade semantic analysis.
//!
//! Consumes a parsed but unchecked AST for one translation unit and
//! produces a fully type-checked, resolved AST in which every expression
//! carries a concrete type, every name reference carries a resolved
//! declaration reference (with generic substitutions where needed), every
//! implicit conversion is made explicit, and every error is reported to
//! the diagnostic sink.
//!
//! The core is a single-threaded recursive tree transformer driven by a
//! per-declaration state machine ([`checker`]); it leans on the coercion
//! engine ([`coerce`]), the overload resolver ([`overload`]), the generic
//! constraint solver ([`infer`]), and the integer constant folder
//! ([`fold`]).
//!
//! # Entry point
//!
//! ```ignore
//! let mut session = Session::bootstrap(&mut arena, &interner, &mut sink)?;
//! let unit = TranslationUnit::new(module, SourceLanguage::Hlsl);
//! check_translation_unit(&unit, &mut arena, &mut session, &interner, &mut sink, &mut loader)?;
//! ```
//!
//! Checking never unwinds for user-facing errors; the only `Err` is the
//! internal circularity signal, which indicates a cyclic program (or a
//! checker bug) and must surface to the driver.

mod coerce;
mod error;
mod fold;
mod format;
mod infer;
mod lookup;
mod overload;
mod request;
mod session;
mod stdlib;

pub mod checker;

pub use error::{CheckResult, Circularity};
pub use infer::{Constraint, ConstraintSystem};
pub use overload::{CandidateFlavor, CandidateStatus, OverloadCandidate};
pub use request::{CompileFlags, MapLoader, ModuleLoader, NullLoader, SourceLanguage, TranslationUnit};
pub use session::Session;
pub use stdlib::translate_hlsl_type_names;

pub use checker::{check_translation_unit, SemanticsVisitor};
