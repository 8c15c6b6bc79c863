use serde::{Deserialize, Serialize};

/// One raw row of a test sheet, as exported from the spreadsheet
///
/// Column headers follow the sheet template ("Test Case ID", ...); camelCase
/// keys are accepted too so JSON exports from other tools load unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SheetRow {
    #[serde(rename = "Test Case ID", alias = "testCaseId", default)]
    pub test_case_id: String,

    #[serde(rename = "Test Case Name", alias = "testCaseName", default)]
    pub test_case_name: String,

    #[serde(rename = "Action", alias = "action", default)]
    pub action: String,

    #[serde(rename = "Locator Type", alias = "locatorType", default)]
    pub locator_type: String,

    #[serde(rename = "Locator Value", alias = "locatorValue", default)]
    pub locator_value: String,

    #[serde(rename = "Test Data", alias = "testData", default)]
    pub test_data: Option<String>,

    #[serde(rename = "Expected Result", alias = "expectedResult", default)]
    pub expected_result: Option<String>,
}

/// A single declarative step: one UI action or check
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStatement {
    pub test_case_id: String,
    pub test_case_name: String,
    pub action: String,
    pub locator_type: String,
    pub locator_value: String,
    /// Argument passed to the action handler (may be empty)
    pub test_data: String,
    /// Comparison target for assertion commands (may be empty)
    pub expected_result: String,
}

impl TestStatement {
    /// Build a statement from a raw row. Returns `None` when the row has no
    /// test case id.
    pub fn from_row(row: SheetRow) -> Option<Self> {
        let test_case_id = row.test_case_id.trim().to_string();
        if test_case_id.is_empty() {
            return None;
        }

        Some(Self {
            test_case_id,
            test_case_name: row.test_case_name.trim().to_string(),
            action: row.action.trim().to_string(),
            locator_type: row.locator_type.trim().to_string(),
            locator_value: row.locator_value.trim().to_string(),
            test_data: row.test_data.unwrap_or_default(),
            expected_result: row.expected_result.unwrap_or_default(),
        })
    }

    /// Label used in logs and as the key in case results
    pub fn display_name(&self) -> String {
        if self.test_case_name.is_empty() {
            self.action.clone()
        } else {
            self.test_case_name.clone()
        }
    }
}

/// Ordered group of statements sharing one test case id
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    id: String,
    statements: Vec<TestStatement>,
}

impl TestCase {
    pub fn new(id: impl Into<String>, statements: Vec<TestStatement>) -> Self {
        Self {
            id: id.into(),
            statements,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn statements(&self) -> &[TestStatement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
