use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use sheet_tester::commands::CommandRegistry;
use sheet_tester::driver::AppiumFactory;
use sheet_tester::runner::{CasePolicy, ConsoleEventListener, EventEmitter, RunOptions};
use sheet_tester::utils::config::RunConfig;
use sheet_tester::utils::logging;
use sheet_tester::{driver, report, runner};

#[derive(Parser)]
#[command(name = "sheet-tester")]
#[command(version = "0.1.0")]
#[command(about = "Data-driven UI test runner for spreadsheet test suites", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a test sheet (CSV/JSON) or a directory of sheets
    Run {
        /// Path to test sheet or directory
        path: PathBuf,

        /// Run configuration (devices, Appium server)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Device id(s) to run on. Can be specified multiple times.
        #[arg(short, long)]
        device: Vec<String>,

        /// Appium server URL (overrides the config file)
        #[arg(long)]
        server_url: Option<String>,

        /// Run tests in parallel across multiple devices
        #[arg(long, default_value = "false")]
        parallel: bool,

        /// Stop a test case at its first failing statement
        #[arg(long, default_value = "false")]
        fail_fast: bool,

        /// Only run these test case ids. Can be specified multiple times.
        #[arg(long = "case")]
        cases: Vec<String>,

        /// Output directory for reports, screenshots and the run log
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Generate reports (JSON, JUnit)
        #[arg(long, default_value = "false")]
        report: bool,

        /// Echo the run log to stderr
        #[arg(short, long, default_value = "false")]
        verbose: bool,
    },

    /// List configured devices
    Devices {
        /// Run configuration (devices, Appium server)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Generate report from saved results
    Report {
        /// Path to results.json
        results: PathBuf,

        /// Output format (json, junit)
        #[arg(short, long, default_value = "junit")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            path,
            config,
            device,
            server_url,
            parallel,
            fail_fast,
            cases,
            output,
            report,
            verbose,
        } => {
            let config = RunConfig::load_or_default(config.as_deref())?;
            let log_path = logging::init(&output, &config.log_file(), verbose)?;

            let devices = config.select_devices(&device);
            let server_url = server_url.unwrap_or_else(|| config.server_url().to_string());
            let policy = if fail_fast || !config.continue_on_failure {
                CasePolicy::fail_fast()
            } else {
                CasePolicy::default()
            };

            println!(
                "{} Running tests from: {}",
                "▶".green().bold(),
                path.display()
            );
            println!("  Server: {}", server_url.cyan());
            println!(
                "  Devices: {}",
                devices
                    .iter()
                    .map(|d| d.id())
                    .collect::<Vec<_>>()
                    .join(", ")
                    .cyan()
            );
            if parallel {
                println!("  Parallel: {}", "Enabled".yellow());
            }
            if fail_fast {
                println!("  Fail fast: {}", "Enabled".yellow());
            }
            if !cases.is_empty() {
                println!("  Cases: {}", cases.join(", ").yellow());
            }
            println!("  Output: {}", output.display().to_string().cyan());
            println!("  Log: {}", log_path.display().to_string().dimmed());
            if report {
                println!("  Reports: {}", "Enabled".green());
            }

            let options = RunOptions {
                path,
                devices,
                case_ids: cases,
                policy,
                parallel,
                output: output.clone(),
                report,
            };

            let (emitter, receiver) = EventEmitter::new();
            let listener = tokio::spawn(ConsoleEventListener::listen(receiver));

            let factory = Arc::new(AppiumFactory::new(&server_url));
            let registry = Arc::new(CommandRegistry::with_output_dir(&output));
            let outcome = runner::run_tests(&options, factory, registry, emitter).await;

            // Listener exits once the last emitter is dropped
            let _ = listener.await;

            let outcome = outcome?;
            println!(
                "\n{} {} total, {} passed, {} failed",
                "■".bold(),
                outcome.report.total,
                outcome.report.passed.to_string().green(),
                outcome.report.failed.to_string().red()
            );
            for e in &outcome.errors {
                println!("  {} {}", "✗".red(), e);
            }

            if !outcome.is_success() {
                std::process::exit(1);
            }
        }

        Commands::Devices { config } => {
            println!("{} Listing configured devices...", "🔍".to_string().blue());
            let config = RunConfig::load_or_default(config.as_deref())?;
            driver::list_devices(&config);
        }

        Commands::Report {
            results,
            format,
            output,
        } => {
            println!(
                "{} Generating {} report from: {}",
                "📊".to_string().blue(),
                format.cyan(),
                results.display()
            );
            report::generate_report(&results, &format, output.as_deref()).await?;
        }
    }

    Ok(())
}
