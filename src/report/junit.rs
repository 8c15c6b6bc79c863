use crate::runner::state::{CaseResult, SuiteReport};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub const REPORT_FILE: &str = "junit.xml";

/// Generate JUnit XML from a suite report.
///
/// Each device gets its own `<testsuite>`. Reports without device counters
/// (hand-built or from an older run) land in a single `default` suite.
pub fn generate_junit_xml(report: &SuiteReport) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "sheet-tester-run"));
    suites_start.push_attribute(("tests", report.total.to_string().as_str()));
    suites_start.push_attribute(("failures", report.failed.to_string().as_str()));
    writer.write_event(Event::Start(suites_start))?;

    for (name, cases) in group_by_suite(report) {
        let failures = cases.iter().filter(|(_, c)| !c.passed).count();

        let mut suite_start = BytesStart::new("testsuite");
        suite_start.push_attribute(("name", name.as_str()));
        suite_start.push_attribute(("tests", cases.len().to_string().as_str()));
        suite_start.push_attribute(("failures", failures.to_string().as_str()));
        suite_start.push_attribute(("skipped", "0"));
        writer.write_event(Event::Start(suite_start))?;

        for (case_id, result) in cases {
            write_test_case(&mut writer, &name, case_id, result)?;
        }

        writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let result = writer.into_inner().into_inner();
    let xml = String::from_utf8(result)?;
    Ok(xml)
}

/// Split results per device. Combined reports key results as
/// `<deviceId>/<testCaseId>`; a single-device report uses bare case ids.
fn group_by_suite(report: &SuiteReport) -> Vec<(String, Vec<(&str, &CaseResult)>)> {
    if report.devices.len() <= 1 {
        let name = report
            .devices
            .keys()
            .next()
            .cloned()
            .unwrap_or_else(|| "default".to_string());
        // a multi-device run where only one device reported keeps its prefix
        let prefix = format!("{}/", name);
        let cases = report
            .results
            .iter()
            .map(|(id, r)| (id.strip_prefix(prefix.as_str()).unwrap_or(id), r))
            .collect();
        return vec![(name, cases)];
    }

    report
        .devices
        .keys()
        .map(|device_id| {
            let prefix = format!("{}/", device_id);
            let cases = report
                .results
                .iter()
                .filter_map(|(key, r)| key.strip_prefix(prefix.as_str()).map(|id| (id, r)))
                .collect();
            (device_id.clone(), cases)
        })
        .collect()
}

fn write_test_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    suite: &str,
    case_id: &str,
    result: &CaseResult,
) -> Result<()> {
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", case_id));
    case_start.push_attribute(("classname", suite));
    writer.write_event(Event::Start(case_start))?;

    if !result.passed {
        let lines: Vec<String> = result
            .failed_statements()
            .map(|(name, statement)| {
                format!(
                    "{} ({}): {}",
                    name,
                    statement.action,
                    statement.failure_message().unwrap_or_default()
                )
            })
            .collect();

        let message = format!("{} statement(s) failed", lines.len());
        let mut fail_start = BytesStart::new("failure");
        fail_start.push_attribute(("message", message.as_str()));
        fail_start.push_attribute(("type", "AssertionError"));
        writer.write_event(Event::Start(fail_start))?;
        writer.write_event(Event::Text(BytesText::new(&lines.join("\n"))))?;
        writer.write_event(Event::End(BytesEnd::new("failure")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Write `junit.xml` into the output directory
pub fn write_report(report: &SuiteReport, output_dir: &Path) -> Result<PathBuf> {
    let xml = generate_junit_xml(report)?;
    let path = output_dir.join(REPORT_FILE);
    std::fs::write(&path, xml)?;
    println!("    Generated JUnit report: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::state::{DeviceCounters, StatementResult};

    fn case(passed: bool) -> CaseResult {
        let mut result = CaseResult::new();
        result.record("Open login", StatementResult::passed("click", "", ""));
        if !passed {
            result.record(
                "Check title",
                StatementResult::mismatch("verifyText", "Hello", "Welcome"),
            );
        }
        result
    }

    fn device_report(device: &str) -> SuiteReport {
        let mut report = SuiteReport::new();
        report.record_case("TC_LOGIN", case(true));
        report.record_case("TC_CHECKOUT", case(false));
        let mut counters = DeviceCounters::default();
        counters.record(true);
        counters.record(false);
        report.set_device_counters(device, counters);
        report
    }

    #[test]
    fn test_generate_junit_xml() {
        let xml = generate_junit_xml(&device_report("emulator-5554")).expect("Failed to generate XML");

        assert!(xml.contains(r#"<testsuites name="sheet-tester-run""#));
        assert!(xml.contains(r#"<testsuite name="emulator-5554""#));
        assert!(xml.contains(r#"tests="2""#));
        assert!(xml.contains(r#"failures="1""#));
        assert!(xml.contains(r#"<testcase name="TC_LOGIN""#));
        assert!(xml.contains(r#"message="1 statement(s) failed""#));
        assert!(xml.contains("Check title (verifyText): Assertion failed: expected Welcome, but got Hello"));
    }

    #[test]
    fn test_one_suite_per_device() {
        let combined = SuiteReport::combine(vec![device_report("emu-1"), device_report("emu-2")], true);
        let xml = generate_junit_xml(&combined).unwrap();

        assert!(xml.contains(r#"<testsuite name="emu-1""#));
        assert!(xml.contains(r#"<testsuite name="emu-2""#));
        assert_eq!(xml.matches("<testcase ").count(), 4);
        assert!(xml.contains(r#"<testcase name="TC_CHECKOUT" classname="emu-2""#));
    }

    #[test]
    fn test_single_surviving_device_uses_bare_case_ids() {
        let combined = SuiteReport::combine(vec![device_report("emu-1")], true);
        let xml = generate_junit_xml(&combined).unwrap();

        assert!(xml.contains(r#"<testcase name="TC_LOGIN" classname="emu-1""#));
        assert!(!xml.contains("emu-1/TC_LOGIN"));
    }

    #[test]
    fn test_report_without_devices() {
        let mut report = SuiteReport::new();
        report.record_case("TC1", case(true));
        let xml = generate_junit_xml(&report).unwrap();

        assert!(xml.contains(r#"<testsuite name="default""#));
        assert!(!xml.contains("<failure"));
    }
}
