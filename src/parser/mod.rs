pub mod sheet;
pub mod types;

pub use sheet::{filter_cases, group_into_cases, load_test_cases};
pub use types::{SheetRow, TestCase, TestStatement};
