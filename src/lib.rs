pub mod commands;
pub mod driver;
pub mod error;
pub mod parser;
pub mod report;
pub mod runner;
pub mod utils;

// Re-export common items
pub use commands::{CommandHandler, CommandKind, CommandRegistry, Element};
pub use driver::list_devices;
pub use error::{DriverError, RunError, StepError};
pub use report::generate_report;
pub use runner::{run_tests, RunOptions, RunOutcome};
