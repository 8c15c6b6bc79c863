//! Result model shared by the executor, the case runner and the reports

use crate::error::StepError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Outcome payload of one statement. Exactly one of the two shapes is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatementOutcome {
    /// Statement ran; for assertions both values took part in the comparison
    #[serde(rename_all = "camelCase")]
    Compared {
        actual_result: String,
        expected_result: String,
    },
    Error { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementResult {
    pub action: String,
    pub passed: bool,
    #[serde(flatten)]
    pub outcome: StatementOutcome,
}

impl StatementResult {
    pub fn passed(action: &str, actual: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            passed: true,
            outcome: StatementOutcome::Compared {
                actual_result: actual.into(),
                expected_result: expected.into(),
            },
        }
    }

    /// Assertion ran but the values differ
    pub fn mismatch(action: &str, actual: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            passed: false,
            outcome: StatementOutcome::Compared {
                actual_result: actual.into(),
                expected_result: expected.into(),
            },
        }
    }

    pub fn failed(action: &str, error: &StepError) -> Self {
        match error {
            StepError::AssertionMismatch { actual, expected } => {
                Self::mismatch(action, actual.as_str(), expected.as_str())
            }
            other => Self {
                action: action.to_string(),
                passed: false,
                outcome: StatementOutcome::Error {
                    error: other.to_string(),
                },
            },
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            StatementOutcome::Error { error } => Some(error),
            StatementOutcome::Compared { .. } => None,
        }
    }

    pub fn actual_result(&self) -> Option<&str> {
        match &self.outcome {
            StatementOutcome::Compared { actual_result, .. } => Some(actual_result),
            StatementOutcome::Error { .. } => None,
        }
    }

    /// One-line description of why the statement failed
    pub fn failure_message(&self) -> Option<String> {
        if self.passed {
            return None;
        }
        Some(match &self.outcome {
            StatementOutcome::Error { error } => error.clone(),
            StatementOutcome::Compared {
                actual_result,
                expected_result,
            } => format!(
                "Assertion failed: expected {}, but got {}",
                expected_result, actual_result
            ),
        })
    }
}

/// Result of one test case, keyed by statement name in execution order
///
/// `passed` is the AND of every recorded statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub passed: bool,
    pub statements: IndexMap<String, StatementResult>,
}

impl CaseResult {
    pub fn new() -> Self {
        Self {
            passed: true,
            statements: IndexMap::new(),
        }
    }

    /// Record a statement result. Statement names are not unique; repeats
    /// get a ` #2`, ` #3`, ... suffix so no result is overwritten.
    pub fn record(&mut self, name: &str, result: StatementResult) {
        self.passed &= result.passed;

        let mut key = name.to_string();
        let mut n = 1;
        while self.statements.contains_key(&key) {
            n += 1;
            key = format!("{} #{}", name, n);
        }
        self.statements.insert(key, result);
    }

    pub fn failed_statements(&self) -> impl Iterator<Item = (&String, &StatementResult)> {
        self.statements.iter().filter(|(_, r)| !r.passed)
    }
}

impl Default for CaseResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-device counters, one increment per completed test case
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCounters {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
}

impl DeviceCounters {
    pub fn record(&mut self, passed: bool) {
        self.total += 1;
        if passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Final artifact of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub devices: IndexMap<String, DeviceCounters>,
    pub results: IndexMap<String, CaseResult>,
}

impl SuiteReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed case under its id
    pub fn record_case(&mut self, case_id: &str, result: CaseResult) {
        self.total += 1;
        if result.passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.results.insert(case_id.to_string(), result);
    }

    pub fn set_device_counters(&mut self, device_id: &str, counters: DeviceCounters) {
        self.devices.insert(device_id.to_string(), counters);
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Merge per-device reports into one, in the order given.
    ///
    /// For a single-device run the one report is returned unchanged. For a
    /// multi-device run the results are keyed `<deviceId>/<testCaseId>`,
    /// whichever devices actually produced a report.
    pub fn combine(reports: Vec<SuiteReport>, multi_device: bool) -> SuiteReport {
        if !multi_device && reports.len() <= 1 {
            return reports.into_iter().next().unwrap_or_default();
        }

        let mut combined = SuiteReport::new();
        for report in reports {
            let device_id = report.devices.keys().next().cloned().unwrap_or_default();
            combined.total += report.total;
            combined.passed += report.passed;
            combined.failed += report.failed;
            combined.devices.extend(report.devices);
            for (case_id, result) in report.results {
                combined
                    .results
                    .insert(format!("{}/{}", device_id, case_id), result);
            }
        }
        combined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_result_is_and_of_statements() {
        let mut case = CaseResult::new();
        case.record("open", StatementResult::passed("click", "", ""));
        assert!(case.passed);
        case.record(
            "check",
            StatementResult::failed("verifyText", &StepError::UnknownCommand("x".into())),
        );
        case.record("close", StatementResult::passed("click", "", ""));
        assert!(!case.passed);
        assert_eq!(case.failed_statements().count(), 1);
    }

    #[test]
    fn test_duplicate_statement_names_are_kept() {
        let mut case = CaseResult::new();
        case.record("tap", StatementResult::passed("click", "", ""));
        case.record(
            "tap",
            StatementResult::failed("click", &StepError::DriverInvocation("boom".into())),
        );
        let keys: Vec<&str> = case.statements.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["tap", "tap #2"]);
        assert!(!case.passed);
    }

    #[test]
    fn test_statement_result_serialization() {
        let ok = StatementResult::passed("getText", "Hi", "");
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            serde_json::json!({"action": "getText", "passed": true, "actualResult": "Hi", "expectedResult": ""})
        );

        let failed = StatementResult::failed("foo", &StepError::UnknownCommand("foo".into()));
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({"action": "foo", "passed": false, "error": "Unknown command: foo"})
        );

        let back: StatementResult =
            serde_json::from_value(serde_json::to_value(&failed).unwrap()).unwrap();
        assert_eq!(back, failed);
    }

    #[test]
    fn test_mismatch_keeps_both_values() {
        let r = StatementResult::failed(
            "verifyText",
            &StepError::AssertionMismatch {
                actual: "Hi".into(),
                expected: "Welcome".into(),
            },
        );
        assert!(!r.passed);
        assert_eq!(r.actual_result(), Some("Hi"));
        assert_eq!(r.error(), None);
        assert_eq!(
            r.failure_message().unwrap(),
            "Assertion failed: expected Welcome, but got Hi"
        );
    }

    #[test]
    fn test_combine_reports() {
        let mut a = SuiteReport::new();
        a.record_case("TC1", CaseResult::new());
        let mut counters = DeviceCounters::default();
        counters.record(true);
        a.set_device_counters("emu-1", counters);

        let mut b = SuiteReport::new();
        let mut failed = CaseResult::new();
        failed.record(
            "x",
            StatementResult::failed("x", &StepError::UnknownCommand("x".into())),
        );
        b.record_case("TC1", failed);
        let mut counters = DeviceCounters::default();
        counters.record(false);
        b.set_device_counters("emu-2", counters);

        let combined = SuiteReport::combine(vec![a.clone(), b], true);
        assert_eq!((combined.total, combined.passed, combined.failed), (2, 1, 1));
        let keys: Vec<&str> = combined.results.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["emu-1/TC1", "emu-2/TC1"]);

        assert_eq!(SuiteReport::combine(vec![a.clone()], false), a);
    }

    #[test]
    fn test_combine_keeps_device_prefix_when_one_device_survives() {
        let mut a = SuiteReport::new();
        a.record_case("TC1", CaseResult::new());
        let mut counters = DeviceCounters::default();
        counters.record(true);
        a.set_device_counters("emu-1", counters);

        let combined = SuiteReport::combine(vec![a], true);
        let keys: Vec<&str> = combined.results.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["emu-1/TC1"]);
        assert_eq!(combined.devices["emu-1"].total, 1);
    }
}
