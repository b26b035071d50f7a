//! Compiler diagnostics

use serde::{Deserialize, Serialize};
use std::fmt;
use void_script::Span;

/// Diagnostic severity; errors block a swap, warnings do not
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A message produced while compiling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Source unit name, or a `<...>` pseudo-source for environment problems
    pub source_name: String,
    pub location: Option<Span>,
}

impl Diagnostic {
    /// Create an error
    pub fn error(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            source_name: source_name.into(),
            location: None,
        }
    }

    /// Create a warning
    pub fn warning(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(source_name, message)
        }
    }

    /// Attach a location
    pub fn at(mut self, span: Span) -> Self {
        self.location = Some(span);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    fn sort_key(&self) -> (&str, Option<Span>, Severity, &str) {
        (&self.source_name, self.location, self.severity, &self.message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(span) => write!(
                f,
                "{}: {}:{}: {}",
                self.severity, self.source_name, span, self.message
            ),
            None => write!(f, "{}: {}: {}", self.severity, self.source_name, self.message),
        }
    }
}

/// Whether any diagnostic is an error
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Order by source, then location
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let d = Diagnostic::error("Foo", "Unresolved name 'x'").at(Span::new(3, 7));
        assert_eq!(d.to_string(), "error: Foo:3:7: Unresolved name 'x'");

        let w = Diagnostic::warning("<references>", "something");
        assert_eq!(w.to_string(), "warning: <references>: something");
    }

    #[test]
    fn test_sorting() {
        let mut diagnostics = vec![
            Diagnostic::warning("b", "late").at(Span::new(1, 1)),
            Diagnostic::error("a", "second").at(Span::new(4, 1)),
            Diagnostic::error("a", "first").at(Span::new(2, 5)),
            Diagnostic::error("a", "unlocated"),
        ];
        sort_diagnostics(&mut diagnostics);

        let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["unlocated", "first", "second", "late"]);
        assert!(has_errors(&diagnostics));
        assert!(!has_errors(&diagnostics[3..]));
    }
}
