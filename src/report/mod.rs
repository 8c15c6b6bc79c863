pub mod json;
pub mod junit;

use crate::runner::state::SuiteReport;
use anyhow::Result;
use std::path::Path;

/// Regenerate a report from a saved `results.json`
pub async fn generate_report(
    results_path: &Path,
    format: &str,
    output: Option<&Path>,
) -> Result<()> {
    let report = json::read_report(results_path)?;

    match format {
        "json" => json::generate(&report, output).await,
        "junit" => {
            let xml = junit::generate_junit_xml(&report)?;
            if let Some(path) = output {
                std::fs::write(path, xml)?;
                println!("JUnit report saved to: {}", path.display());
            } else {
                println!("{}", xml);
            }
            Ok(())
        }
        _ => anyhow::bail!("Unknown format: {}", format),
    }
}

/// Write every report format into the output directory
pub fn write_reports(report: &SuiteReport, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;
    json::write_report(report, output_dir)?;
    junit::write_report(report, output_dir)?;
    Ok(())
}
