pub mod case;
pub mod context;
pub mod events;
pub mod executor;
pub mod state;
pub mod suite;

use crate::commands::CommandRegistry;
use crate::driver::traits::SessionFactory;
use crate::error::RunError;
use crate::parser;
use crate::utils::config::DeviceConfig;
use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

pub use context::{CasePolicy, RunContext};
pub use events::*;
pub use state::*;

/// Options for one invocation of the runner
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Sheet file or directory of sheets
    pub path: PathBuf,
    pub devices: Vec<DeviceConfig>,
    /// Only run these test case ids (all when empty)
    pub case_ids: Vec<String>,
    pub policy: CasePolicy,
    /// Run devices concurrently, one task per device
    pub parallel: bool,
    /// Output directory for reports and screenshots
    pub output: PathBuf,
    /// Write `results.json` and `junit.xml` after the run
    pub report: bool,
}

/// Everything a run produced
#[derive(Debug)]
pub struct RunOutcome {
    /// Combined report of every case that completed, on every device
    pub report: SuiteReport,
    /// Run-level failures, one per affected device
    pub errors: Vec<RunError>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.report.is_success()
    }
}

/// Load the suite and run it on every device
pub async fn run_tests(
    options: &RunOptions,
    factory: Arc<dyn SessionFactory>,
    registry: Arc<CommandRegistry>,
    emitter: EventEmitter,
) -> Result<RunOutcome> {
    let cases = parser::load_test_cases(&options.path)?;
    let cases = parser::filter_cases(cases, &options.case_ids)?;

    if cases.is_empty() {
        println!("{} No test cases found.", "ℹ".blue());
        return Ok(RunOutcome {
            report: SuiteReport::new(),
            errors: Vec::new(),
        });
    }

    if options.devices.is_empty() {
        anyhow::bail!("No devices available for execution");
    }

    log::info!(
        "Loaded {} test case(s) from {}",
        cases.len(),
        options.path.display()
    );

    let results = if options.parallel && options.devices.len() > 1 {
        println!(
            "{} Parallel execution enabled across {} devices",
            "🚀".yellow(),
            options.devices.len()
        );

        let cases = Arc::new(cases);
        let mut handles = Vec::new();
        for device in options.devices.clone() {
            let factory = factory.clone();
            let registry = registry.clone();
            let cases = cases.clone();
            let emitter = emitter.clone();
            let policy = options.policy;

            let handle = tokio::spawn(async move {
                suite::run_device(factory.as_ref(), &device, registry, &cases, policy, emitter)
                    .await
            });
            handles.push(handle);
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await?);
        }
        results
    } else {
        let mut results = Vec::with_capacity(options.devices.len());
        for device in &options.devices {
            results.push(
                suite::run_device(
                    factory.as_ref(),
                    device,
                    registry.clone(),
                    &cases,
                    options.policy,
                    emitter.clone(),
                )
                .await,
            );
        }
        results
    };

    // Single writer: per-device reports are merged only after every run ended
    let mut reports = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                if let Some(partial) = e.partial_report() {
                    reports.push(partial.clone());
                }
                errors.push(e);
            }
        }
    }

    let report = SuiteReport::combine(reports, options.devices.len() > 1);

    emitter.emit(TestEvent::Log {
        message: format!(
            "{} test case(s) run: {} passed, {} failed",
            report.total, report.passed, report.failed
        ),
    });
    for e in &errors {
        emitter.emit(TestEvent::Log {
            message: e.to_string(),
        });
    }

    if options.report {
        crate::report::write_reports(&report, &options.output)?;
    }

    Ok(RunOutcome { report, errors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::{MockFactory, MockSession};
    use std::io::Write;

    fn sheet() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(
            file,
            "Test Case ID,Test Case Name,Action,Locator Type,Locator Value,Test Data,Expected Result"
        )
        .unwrap();
        writeln!(file, "TC1,Enter user,inputText,id,username,testUser,").unwrap();
        writeln!(file, "TC2,Welcome shown,verifyText,xpath,welcome,,Welcome").unwrap();
        writeln!(file, "TC1,Submit,click,id,submit,,").unwrap();
        file
    }

    fn options(path: PathBuf, devices: &[&str], parallel: bool) -> RunOptions {
        RunOptions {
            path,
            devices: devices
                .iter()
                .map(|id| DeviceConfig {
                    id: Some(id.to_string()),
                    ..Default::default()
                })
                .collect(),
            case_ids: Vec::new(),
            policy: CasePolicy::default(),
            parallel,
            output: PathBuf::from("."),
            report: false,
        }
    }

    fn factory() -> Arc<MockFactory> {
        Arc::new(MockFactory::new(
            MockSession::new("template")
                .with_element("username", "")
                .with_element("submit", "")
                .with_element("welcome", "Welcome"),
        ))
    }

    #[tokio::test]
    async fn test_single_device_run() {
        let file = sheet();
        let factory = factory();

        let outcome = run_tests(
            &options(file.path().to_path_buf(), &["emu-1"], false),
            factory.clone(),
            Arc::new(CommandRegistry::new()),
            EventEmitter::default(),
        )
        .await
        .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.report.devices["emu-1"].total, 2);
        let ids: Vec<&str> = outcome.report.results.keys().map(|k| k.as_str()).collect();
        assert_eq!(ids, vec!["TC1", "TC2"]);
        let statements: Vec<&str> = outcome.report.results["TC1"]
            .statements
            .keys()
            .map(|k| k.as_str())
            .collect();
        assert_eq!(statements, vec!["Enter user", "Submit"]);
    }

    #[tokio::test]
    async fn test_parallel_devices_have_independent_sessions() {
        let file = sheet();
        let factory = factory();

        let outcome = run_tests(
            &options(file.path().to_path_buf(), &["emu-1", "emu-2"], true),
            factory.clone(),
            Arc::new(CommandRegistry::new()),
            EventEmitter::default(),
        )
        .await
        .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.report.total, 4);
        assert_eq!(outcome.report.devices.len(), 2);
        assert_eq!(outcome.report.devices["emu-2"].total, 2);
        assert!(outcome.report.results.contains_key("emu-2/TC1"));

        let states = factory.states();
        assert_eq!(states.len(), 2);
        for state in states {
            assert_eq!(state.lock().unwrap().closed, 1);
        }
    }

    #[tokio::test]
    async fn test_unreachable_device_is_reported() {
        let file = sheet();

        let outcome = run_tests(
            &options(file.path().to_path_buf(), &["emu-1"], false),
            Arc::new(MockFactory::refusing()),
            Arc::new(CommandRegistry::new()),
            EventEmitter::default(),
        )
        .await
        .unwrap();

        assert!(!outcome.is_success());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.report.total, 0);
    }

    /// Connects every device except `refused`
    struct PartlyRefusing {
        inner: MockFactory,
        refused: &'static str,
    }

    #[async_trait::async_trait]
    impl SessionFactory for PartlyRefusing {
        async fn connect(
            &self,
            device: &DeviceConfig,
        ) -> crate::driver::DriverResult<Box<dyn crate::driver::DriverSession>> {
            if device.id() == self.refused {
                return Err(crate::error::DriverError::Connect("connection refused".into()));
            }
            self.inner.connect(device).await
        }
    }

    #[tokio::test]
    async fn test_device_prefix_kept_when_one_device_fails_to_connect() {
        let file = sheet();
        let factory = Arc::new(PartlyRefusing {
            inner: MockFactory::new(
                MockSession::new("template")
                    .with_element("username", "")
                    .with_element("submit", "")
                    .with_element("welcome", "Welcome"),
            ),
            refused: "emu-2",
        });

        let outcome = run_tests(
            &options(file.path().to_path_buf(), &["emu-1", "emu-2"], false),
            factory,
            Arc::new(CommandRegistry::new()),
            EventEmitter::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.errors.len(), 1);
        let keys: Vec<&str> = outcome.report.results.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["emu-1/TC1", "emu-1/TC2"]);
    }

    #[tokio::test]
    async fn test_reports_written_when_enabled() {
        let file = sheet();
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(file.path().to_path_buf(), &["emu-1"], false);
        opts.output = dir.path().to_path_buf();
        opts.report = true;
        opts.case_ids = vec!["TC2".to_string()];

        let outcome = run_tests(
            &opts,
            factory(),
            Arc::new(CommandRegistry::new()),
            EventEmitter::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.report.total, 1);
        assert!(dir.path().join(crate::report::json::REPORT_FILE).exists());
        assert!(dir.path().join(crate::report::junit::REPORT_FILE).exists());
    }
}
