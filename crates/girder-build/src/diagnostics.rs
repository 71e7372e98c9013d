//! Accumulated non-fatal findings
//!
//! Resolution never interleaves warnings with its own control flow:
//! findings are collected here and surfaced once after the phase
//! completes. Fatal configuration errors go through `BuildError` instead.

/// Finding severity. `Verbose` entries are only shown on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Verbose,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verbose => write!(f, "verbose"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single accumulated finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Ordered collection of findings from one resolution session
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a verbose finding
    pub fn verbose(&mut self, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            severity: Severity::Verbose,
            message: message.into(),
        });
    }

    /// Record a warning
    pub fn warning(&mut self, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    /// All findings in the order they were recorded
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Warnings only
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append another collection's findings, preserving order
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_preserved() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warning("first");
        diagnostics.verbose("second");
        diagnostics.warning("third");

        let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert_eq!(diagnostics.warning_count(), 2);
    }

    #[test]
    fn test_extend() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.verbose("a");

        let mut more = Diagnostics::new();
        more.warning("b");
        diagnostics.extend(more);

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics.warning_count(), 1);
    }
}
