//! Diagnostics - User-visible errors and warnings of a single operation

use std::fmt;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic reported back to the host
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.summary)
        } else {
            write!(f, "{}: {}", self.summary, self.detail)
        }
    }
}

/// Ordered collection of diagnostics
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn add_error(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Diagnostic::error(summary, detail));
    }

    pub fn add_warning(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Diagnostic::warning(summary, detail));
    }

    /// Log the error and add it as a diagnostic
    pub fn log_and_add_error(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        let diagnostic = Diagnostic::error(summary, detail);
        log::error!("{}", diagnostic);
        self.push(diagnostic);
    }

    /// Log the warning and add it as a diagnostic
    pub fn log_and_add_warning(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        let diagnostic = Diagnostic::warning(summary, detail);
        log::warn!("{}", diagnostic);
        self.push(diagnostic);
    }

    /// Unwrap a result, recording the error under `summary` when it fails
    pub fn capture<T, E: fmt::Display>(&mut self, result: Result<T, E>, summary: &str) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.log_and_add_error(summary, e.to_string());
                None
            }
        }
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn has_error(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.is_error())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
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

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut diags = Diagnostics::new();
        diags.add_warning("deprecated", "use something else");
        assert!(!diags.has_error());
        diags.add_error("failed", "boom");
        assert!(diags.has_error());
        assert_eq!(diags.errors().count(), 1);
    }

    #[test]
    fn capture_records_failure() {
        let mut diags = Diagnostics::new();
        let ok: Option<i32> = diags.capture(Ok::<_, String>(1), "unused");
        assert_eq!(ok, Some(1));
        let failed: Option<i32> = diags.capture(Err("bad input".to_string()), "Reading plan");
        assert!(failed.is_none());
        let first = diags.iter().next().unwrap();
        assert_eq!(first.to_string(), "Reading plan: bad input");
    }
}
