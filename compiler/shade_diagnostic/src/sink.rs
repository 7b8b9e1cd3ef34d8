//! The append-only diagnostic sink.

use crate::{Diagnostic, Severity};

/// Collects diagnostics during checking.
///
/// The sink never influences control flow; the checker consults
/// [`DiagnosticSink::error_count`] only at the module-level gate. When the
/// translation unit is checked in rewrite mode the sink is muted and every
/// diagnostic is dropped here, at the single bottleneck.
#[derive(Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    muted: bool,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        DiagnosticSink::default()
    }

    /// Drop (rather than record) everything reported from now on.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Report a diagnostic. Returns whether it was recorded.
    pub fn diagnose(&mut self, diagnostic: Diagnostic) -> bool {
        if self.muted {
            return false;
        }
        if diagnostic.severity == Severity::Error {
            self.error_count += 1;
        }
        self.diagnostics.push(diagnostic);
        true
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Drain everything collected so far.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        self.error_count = 0;
        std::mem::take(&mut self.diagnostics)
    }

    /// True if any recorded diagnostic's message contains `needle`.
    /// Convenience for tests.
    pub fn has_message_containing(&self, needle: &str) -> bool {
        self.diagnostics.iter().any(|d| d.message.contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;
    use shade_ast::Span;

    #[test]
    fn errors_are_counted() {
        let mut sink = DiagnosticSink::new();
        sink.diagnose(Diagnostic::error(ErrorCode::E2001).with_message("a"));
        sink.diagnose(Diagnostic::note(ErrorCode::E2032).with_message("b"));
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.diagnostics().len(), 2);
    }

    #[test]
    fn muted_sink_drops_everything() {
        let mut sink = DiagnosticSink::new();
        sink.set_muted(true);
        let recorded = sink.diagnose(
            Diagnostic::error(ErrorCode::E2001)
                .with_message("suppressed")
                .with_label(Span::new(0, 1), ""),
        );
        assert!(!recorded);
        assert_eq!(sink.error_count(), 0);
        assert!(sink.diagnostics().is_empty());
    }
}
