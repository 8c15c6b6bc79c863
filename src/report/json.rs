use crate::runner::state::SuiteReport;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const REPORT_FILE: &str = "results.json";

/// Print the report as JSON, or save it when an output path is given
pub async fn generate(report: &SuiteReport, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;

    if let Some(path) = output {
        std::fs::write(path, json)?;
        println!("JSON report saved to: {}", path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

/// Write `results.json` into the output directory
pub fn write_report(report: &SuiteReport, output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join(REPORT_FILE);
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    println!("    Generated JSON report: {}", path.display());
    Ok(path)
}

/// Load a report previously written by [`write_report`]
pub fn read_report(path: &Path) -> Result<SuiteReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read results file: {}", path.display()))?;
    let report = serde_json::from_str(&content)
        .with_context(|| format!("Invalid results file: {}", path.display()))?;
    Ok(report)
}
