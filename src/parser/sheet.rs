//! Row source: loads test sheets (Excel workbooks, CSV or JSON exports) and
//! groups their rows into test cases.
//!
//! Every worksheet of a workbook is one sheet, read in workbook order.

use super::types::{SheetRow, TestCase, TestStatement};
use anyhow::{Context, Result};
use calamine::{Data, Range, Reader};
use indexmap::IndexMap;
use std::fs::File;
use std::path::{Path, PathBuf};

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

/// A parsed row and where it came from
struct SourceRow {
    /// e.g. `line 3 of suite.csv` or `row 3 of sheet 'Login' in suite.xlsx`
    location: String,
    row: SheetRow,
}

/// Load every statement from a sheet file or a directory of sheets
pub fn load_statements(path: &Path) -> Result<Vec<TestStatement>> {
    let files = collect_sheet_files(path)?;
    if files.is_empty() {
        anyhow::bail!(
            "No test sheets (.xlsx, .csv, .json) found in {}",
            path.display()
        );
    }

    let mut statements = Vec::new();
    for file in &files {
        let rows = read_sheet(file)?;
        log::debug!("Loaded {} rows from {}", rows.len(), file.display());
        statements.extend(rows_to_statements(rows)?);
    }

    Ok(statements)
}

/// Load a sheet (or directory of sheets) and group it into test cases
pub fn load_test_cases(path: &Path) -> Result<Vec<TestCase>> {
    Ok(group_into_cases(load_statements(path)?))
}

/// Group statements by test case id.
///
/// Cases come out in the order their id was first seen; statements inside a
/// case keep their row order.
pub fn group_into_cases(statements: impl IntoIterator<Item = TestStatement>) -> Vec<TestCase> {
    let mut grouped: IndexMap<String, Vec<TestStatement>> = IndexMap::new();
    for statement in statements {
        grouped
            .entry(statement.test_case_id.clone())
            .or_default()
            .push(statement);
    }

    grouped
        .into_iter()
        .map(|(id, statements)| TestCase::new(id, statements))
        .collect()
}

/// Keep only the requested cases, in their original order
pub fn filter_cases(cases: Vec<TestCase>, ids: &[String]) -> Result<Vec<TestCase>> {
    if ids.is_empty() {
        return Ok(cases);
    }

    if let Some(missing) = ids.iter().find(|id| !cases.iter().any(|c| c.id() == id.as_str())) {
        anyhow::bail!(
            "Test case '{}' not found. Available test cases: {}",
            missing,
            cases.iter().map(|c| c.id()).collect::<Vec<_>>().join(", ")
        );
    }

    Ok(cases
        .into_iter()
        .filter(|c| ids.iter().any(|id| id == c.id()))
        .collect())
}

fn collect_sheet_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        if !path.exists() {
            anyhow::bail!("Test sheet not found: {}", path.display());
        }
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_sheet(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    Ok(files)
}

fn is_sheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| {
            ext == "csv" || ext == "json" || WORKBOOK_EXTENSIONS.contains(&ext)
        })
}

fn read_sheet(path: &Path) -> Result<Vec<SourceRow>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => read_json_sheet(path),
        Some(ext) if WORKBOOK_EXTENSIONS.contains(&ext) => read_workbook(path),
        _ => read_csv_sheet(path),
    }
}

fn read_csv_sheet(path: &Path) -> Result<Vec<SourceRow>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open test sheet {}", path.display()))?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(file);
    let headers = rdr
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .clone();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record =
            result.with_context(|| format!("Failed to read test sheet {}", path.display()))?;
        let line = record.position().map_or(0, |p| p.line());
        let location = format!("line {} of {}", line, path.display());
        let row: SheetRow = record
            .deserialize(Some(&headers))
            .with_context(|| format!("Failed to parse {}", location))?;
        rows.push(SourceRow { location, row });
    }
    Ok(rows)
}

/// JSON exports keep numeric cells as numbers ("Test Case ID": 1), so every
/// cell is stringified before mapping onto [`SheetRow`].
fn read_json_sheet(path: &Path) -> Result<Vec<SourceRow>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read test sheet {}", path.display()))?;
    let raw: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(&content)
        .with_context(|| format!("Expected an array of row objects in {}", path.display()))?;

    raw.into_iter()
        .enumerate()
        .map(|(i, obj)| {
            let location = format!("row {} of {}", i + 1, path.display());
            let cells = obj
                .into_iter()
                .filter_map(|(k, v)| json_cell_text(v).map(|s| (k, s)));
            let row = row_from_cells(cells)
                .with_context(|| format!("Failed to parse {}", location))?;
            Ok(SourceRow { location, row })
        })
        .collect()
}

fn json_cell_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Read every worksheet of a workbook, in workbook order
fn read_workbook(path: &Path) -> Result<Vec<SourceRow>> {
    let mut workbook = calamine::open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?;

    let mut rows = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name).with_context(|| {
            format!("Failed to read sheet '{}' in {}", name, path.display())
        })?;
        let label = format!("sheet '{}' in {}", name, path.display());
        let sheet_rows = rows_from_range(&range, &label)?;
        log::debug!("Sheet '{}': {} rows", name, sheet_rows.len());
        rows.extend(sheet_rows);
    }
    Ok(rows)
}

/// Map a worksheet onto rows. The first row of the used range is the header.
fn rows_from_range(range: &Range<Data>, label: &str) -> Result<Vec<SourceRow>> {
    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    let mut iter = range.rows();
    let headers: Vec<String> = match iter.next() {
        Some(cells) => cells
            .iter()
            .map(|c| workbook_cell_text(c).unwrap_or_default().trim().to_string())
            .collect(),
        None => return Ok(Vec::new()),
    };

    iter.enumerate()
        .map(|(i, cells)| {
            // spreadsheet rows are 1-based and the header takes one
            let location = format!("row {} of {}", first_row + i + 2, label);
            let named = headers
                .iter()
                .zip(cells)
                .filter(|(header, _)| !header.is_empty())
                .filter_map(|(header, cell)| workbook_cell_text(cell).map(|s| (header.clone(), s)));
            let row = row_from_cells(named)
                .with_context(|| format!("Failed to parse {}", location))?;
            Ok(SourceRow { location, row })
        })
        .collect()
}

/// Whole-number cells come back as floats (`1.0`); sheets mean `1`
fn workbook_cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(s.clone()),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", *f as i64)),
        other => Some(other.to_string()),
    }
}

fn row_from_cells(cells: impl Iterator<Item = (String, String)>) -> Result<SheetRow> {
    let object: serde_json::Map<String, serde_json::Value> = cells
        .map(|(k, v)| (k, serde_json::Value::String(v)))
        .collect();
    Ok(serde_json::from_value(serde_json::Value::Object(object))?)
}

fn rows_to_statements(rows: Vec<SourceRow>) -> Result<Vec<TestStatement>> {
    let mut statements = Vec::with_capacity(rows.len());
    for SourceRow { location, row } in rows {
        if is_blank(&row) {
            continue;
        }
        let action = row.action.clone();
        match TestStatement::from_row(row) {
            Some(statement) => statements.push(statement),
            None => anyhow::bail!(
                "Missing Test Case ID at {} (action '{}')",
                location,
                action
            ),
        }
    }
    Ok(statements)
}

fn is_blank(row: &SheetRow) -> bool {
    row.test_case_id.trim().is_empty()
        && row.test_case_name.trim().is_empty()
        && row.action.trim().is_empty()
        && row.locator_value.trim().is_empty()
}
