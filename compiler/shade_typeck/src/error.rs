//! The internal circularity signal.

use shade_types::DeclId;

/// Raised when checking re-enters a declaration whose header is still
/// being checked — a cyclic program (`typedef A B; typedef B A;`) or a
/// checker bug. This is the only non-local exit in the checker: all
/// user-facing failures are reported to the sink and produce error-typed
/// expressions instead.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("circular reference while checking declaration `{name}`")]
pub struct Circularity {
    pub decl: DeclId,
    /// Resolved at construction so the driver can print it without the
    /// name pool.
    pub name: String,
}

/// Result type threaded through every checking entry point.
pub type CheckResult<T> = Result<T, Circularity>;
