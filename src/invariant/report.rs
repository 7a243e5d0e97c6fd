//! Check reports
//!
//! Structured outcome of a strict baseline check. Failures are data for
//! whatever renders or stores them; each one is also logged at warn
//! level as it is recorded.

use log::warn;

/// Why an expression failed its check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No element matched the expression, exactly or fuzzily
    NoMatch,
    /// The element exists but precedes content it used to follow
    WrongLocation,
}

/// One failed invariant
#[derive(Debug, Clone)]
pub struct Failure {
    /// The expression that failed, without its depth prefix
    pub expression: String,
    /// Failure category
    pub kind: FailureKind,
    /// Human-readable message
    pub message: String,
}

/// Result of checking a baseline against a document
#[derive(Debug, Default)]
pub struct CheckReport {
    failures: Vec<Failure>,
}

impl CheckReport {
    pub fn new() -> Self {
        CheckReport::default()
    }

    /// Record a failure for an expression
    pub(crate) fn add_failure(&mut self, expression: &str, kind: FailureKind) {
        let message = match kind {
            FailureKind::NoMatch => format!("No matching element found: {expression}"),
            FailureKind::WrongLocation => {
                format!("Element found on the wrong location: {expression}")
            }
        };
        warn!("{message}");
        self.failures.push(Failure {
            expression: expression.to_string(),
            kind,
            message,
        });
    }

    /// Whether every invariant held
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// The recorded failures, in check order
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_passes() {
        let report = CheckReport::new();
        assert!(report.passed());
    }

    #[test]
    fn failures_carry_kind_and_message() {
        let mut report = CheckReport::new();
        report.add_failure("//div[@id=\"x\"]", FailureKind::NoMatch);
        report.add_failure("//span", FailureKind::WrongLocation);

        assert!(!report.passed());
        assert_eq!(report.failures().len(), 2);
        assert_eq!(report.failures()[0].kind, FailureKind::NoMatch);
        assert!(report.failures()[0].message.contains("No matching element"));
        assert!(report.failures()[1].message.contains("wrong location"));
    }
}
