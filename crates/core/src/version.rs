//! Optimistic concurrency primitives.

use crate::error::{DomainError, DomainResult};

/// The version a write expects to overwrite.
///
/// Entities loaded from storage carry the revision they were read at; a write states
/// that revision so a concurrent writer is detected instead of silently lost.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExpectedVersion(pub u64);

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        self.0 == actual
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "expected version {}, found {actual}",
                self.0
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_only_the_exact_version() {
        assert!(ExpectedVersion(0).matches(0));
        assert!(!ExpectedVersion(0).matches(1));
    }

    #[test]
    fn check_reports_conflict_with_both_versions() {
        assert!(ExpectedVersion(3).check(3).is_ok());
        assert_eq!(
            ExpectedVersion(3).check(4),
            Err(DomainError::Conflict("expected version 3, found 4".to_string()))
        );
    }
}
