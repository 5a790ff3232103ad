//! Diagnostic sink for the analysis passes.
//!
//! Diagnostics are collected, not printed: callers decide how to render
//! them. The sink owns the cumulative error counter that gates whether
//! later compilation phases run.

use serde::{Deserialize, Serialize};
use veld_tree::SourceLocation;

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    /// Convert to LSP DiagnosticSeverity number
    pub fn to_lsp_severity(&self) -> u32 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
        }
    }
}

/// A single diagnostic with its source location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub loc: SourceLocation,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}: {}", self.loc, tag, self.message)
    }
}

/// Collecting diagnostic sink.
#[derive(Debug, Default)]
pub struct Diagnostics {
    diags: Vec<Diagnostic>,
    errors: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    /// Report an error at a source location and bump the error counter.
    pub fn error_at(&mut self, loc: &SourceLocation, message: String) {
        self.errors += 1;
        self.diags.push(Diagnostic {
            severity: Severity::Error,
            message,
            loc: loc.clone(),
        });
    }

    pub fn warn_at(&mut self, loc: &SourceLocation, message: String) {
        self.diags.push(Diagnostic {
            severity: Severity::Warning,
            message,
            loc: loc.clone(),
        });
    }

    /// Cumulative error count across every check run through this sink.
    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }

    pub fn all(&self) -> &[Diagnostic] {
        &self.diags
    }
}
