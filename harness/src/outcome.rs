use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorKind, HarnessError, Severity};

/// Result of a single step or sub-check.
///
/// Outcomes are the record of a run: every assertion lands here whether it
/// passed or not. They never contain wall-clock data so that repeating a
/// read-only step yields an identical outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub details: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StepOutcome {
    pub fn passed(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            success: true,
            details: IndexMap::new(),
            error: None,
            message: None,
        }
    }

    pub fn failed(step: impl Into<String>, err: &HarnessError) -> Self {
        let outcome = Self {
            step: step.into(),
            success: false,
            details: IndexMap::new(),
            error: Some(err.kind()),
            message: Some(err.to_string()),
        };

        match err {
            HarnessError::WrongChain {
                expected,
                observed,
                source_kind,
            } => outcome
                .with("expected", expected)
                .with("observed", observed)
                .with("source", &source_kind.to_string()),
            HarnessError::ValidationMismatch {
                field,
                expected,
                observed,
            } => outcome
                .with("field", field)
                .with("expected", expected)
                .with("observed", observed),
            HarnessError::SupplyInvariantViolation { expected, observed } => outcome
                .with("expected", expected)
                .with("observed", observed),
            HarnessError::TransferNotReflected {
                token_id,
                expected,
                observed,
            } => outcome
                .with("tokenId", token_id)
                .with("expected", expected)
                .with("observed", observed),
            HarnessError::OwnerUnreadable {
                token_id,
                expected,
                reason,
            } => outcome
                .with("tokenId", token_id)
                .with("expected", expected)
                .with("observed", &format!("read failed: {reason}")),
            HarnessError::TransferRejected { token_id, .. } => outcome.with("tokenId", token_id),
            _ => outcome,
        }
    }

    /// A step that did not run because its precondition was not met
    pub fn skipped(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            success: false,
            details: IndexMap::from([("skipped".to_owned(), Value::Bool(true))]),
            error: None,
            message: Some(reason.into()),
        }
    }

    pub fn with<T: Serialize + ?Sized>(mut self, key: &str, value: &T) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.details.insert(key.to_owned(), value);
    }

    pub fn severity(&self) -> Option<Severity> {
        self.error.map(|kind| kind.severity())
    }

    pub fn is_skipped(&self) -> bool {
        self.details.get("skipped") == Some(&Value::Bool(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_outcome_carries_mismatch_details() {
        let err = HarnessError::ValidationMismatch {
            field: "symbol".to_string(),
            expected: "BVNFT".to_string(),
            observed: "XNFT".to_string(),
        };
        let outcome = StepOutcome::failed("validation.symbol", &err);

        assert!(!outcome.success);
        assert_eq!(outcome.error, Some(ErrorKind::ValidationMismatch));
        assert_eq!(outcome.severity(), Some(Severity::Reported));
        assert_eq!(outcome.details["field"], "symbol");
        assert_eq!(outcome.details["expected"], "BVNFT");
        assert_eq!(outcome.details["observed"], "XNFT");
    }

    #[test]
    fn test_details_keep_insertion_order() {
        let outcome = StepOutcome::passed("mint_one")
            .with("tokenId", &1u64)
            .with("recipient", "0x01")
            .with("gasUsed", &120_000u64);

        let keys: Vec<&str> = outcome.details.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["tokenId", "recipient", "gasUsed"]);
        assert!(outcome.severity().is_none());
    }

    #[test]
    fn test_skipped_outcome() {
        let outcome = StepOutcome::skipped("transfer", "no token minted");
        assert!(outcome.is_skipped());
        assert!(!outcome.success);
        assert!(outcome.error.is_none());

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["message"], "no token minted");
        assert!(json.get("error").is_none());
    }
}
