//! Diagnostic system for the semantic checker.
//!
//! - Error codes for searchability
//! - Clear messages (what went wrong)
//! - Primary span (where it went wrong)
//! - Notes (context the user needs)
//!
//! The sink is append-only: emitting a diagnostic never affects control
//! flow. Rewrite mode ("no checking") mutes the sink, which is the single
//! place suppression happens.

mod diagnostic;
mod error_code;
mod sink;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use error_code::ErrorCode;
pub use sink::DiagnosticSink;
