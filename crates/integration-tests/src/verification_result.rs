//! Verification result types.

use core::fmt::Debug;

/// Checks performed against one fixture.
#[derive(Debug, Clone)]
pub struct VerificationResult {
    /// Whether all verifications passed
    pub passed: bool,
    /// List of failures
    pub failures: Vec<String>,
    /// List of successes
    pub successes: Vec<String>,
}

impl VerificationResult {
    /// Create a result with nothing checked yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            passed: true,
            failures: Vec::new(),
            successes: Vec::new(),
        }
    }

    /// A result holding a single failure.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        let mut result = Self::new();
        result.add_failure(message);
        result
    }

    /// Add success
    pub fn add_success(&mut self, message: impl Into<String>) {
        self.successes.push(message.into());
    }

    /// Add failure
    pub fn add_failure(&mut self, message: impl Into<String>) {
        self.passed = false;
        self.failures.push(message.into());
    }

    /// Records `what` as passed or failed depending on `condition`.
    pub fn check(&mut self, condition: bool, what: impl Into<String>) {
        if condition {
            self.add_success(what);
        } else {
            self.add_failure(what);
        }
    }

    /// Compares an expected value with the actual one.
    pub fn expect_eq<T>(&mut self, what: &str, expected: &T, actual: &T)
    where
        T: PartialEq + Debug + ?Sized,
    {
        if expected == actual {
            self.add_success(format!("{what}: {actual:?}"));
        } else {
            self.add_failure(format!("{what}: expected {expected:?}, got {actual:?}"));
        }
    }

    /// Merge another result
    pub fn merge(&mut self, other: Self) {
        self.passed &= other.passed;
        self.failures.extend(other.failures);
        self.successes.extend(other.successes);
    }
}

impl Default for VerificationResult {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expect_eq_records_both_sides() {
        let mut result = VerificationResult::new();
        result.expect_eq("ids", &["p1"][..], &["p1"][..]);
        assert!(result.passed);

        result.expect_eq("status", "empty", "collected");
        assert!(!result.passed);
        assert_eq!(
            result.failures,
            [r#"status: expected "empty", got "collected""#]
        );
    }

    #[test]
    fn test_merge_keeps_failure() {
        let mut result = VerificationResult::new();
        result.check(true, "first");
        result.merge(VerificationResult::failed("second"));
        assert!(!result.passed);
        assert_eq!(result.successes, ["first"]);
    }
}
