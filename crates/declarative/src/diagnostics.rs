//! Diagnostics reported by lifecycle operations
//!
//! Reconciler errors never escape the lifecycle functions as `Err`; they are
//! converted into [`Diagnostic`]s so one failing resource does not abort the
//! rest of a run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How bad a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// A single reported problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Short, stable headline
    pub summary: String,
    /// Full message, usually including the upstream error text
    pub detail: String,
}

impl Diagnostic {
    /// Create an error diagnostic
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    /// Create a warning diagnostic
    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    /// Convert a reconciler error into an error diagnostic
    pub fn from_error<E: Diagnose + ?Sized>(err: &E) -> Self {
        Self::error(err.summary(), err.detail())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        if self.detail.is_empty() || self.detail == self.summary {
            write!(f, "{level}: {}", self.summary)
        } else {
            write!(f, "{level}: {}: {}", self.summary, self.detail)
        }
    }
}

/// Errors that know how to present themselves as diagnostics
pub trait Diagnose: std::error::Error {
    /// Short, stable headline for the error kind
    fn summary(&self) -> String;

    /// Full message; defaults to the `Display` text
    fn detail(&self) -> String {
        self.to_string()
    }
}

/// An ordered collection of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection holding one error built from `err`
    pub fn from_error<E: Diagnose + ?Sized>(err: &E) -> Self {
        Self(vec![Diagnostic::from_error(err)])
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if any diagnostic is an error
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    /// First error, if any
    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.0.iter().find(|d| d.severity == Severity::Error)
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Gone;

    impl fmt::Display for Gone {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "credential 3 not found")
        }
    }

    impl std::error::Error for Gone {}

    impl Diagnose for Gone {
        fn summary(&self) -> String {
            "Not found".into()
        }
    }

    #[test]
    fn test_from_error_uses_summary_and_display() {
        let diags = Diagnostics::from_error(&Gone);
        assert!(diags.has_errors());
        let first = diags.first_error().unwrap();
        assert_eq!(first.summary, "Not found");
        assert_eq!(first.detail, "credential 3 not found");
    }

    #[test]
    fn test_warnings_are_not_errors() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::warning("Drift", "name changed remotely"));
        assert!(!diags.has_errors());
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_display() {
        let mut diags = Diagnostics::from(Diagnostic::error("Boom", "Boom"));
        diags.push(Diagnostic::warning("Slow", "took 3s"));
        assert_eq!(diags.to_string(), "error: Boom\nwarning: Slow: took 3s");
    }
}
