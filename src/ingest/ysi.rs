/// YSI sonde profile exports.
///
/// Handheld YSI units (ProDSS / EXO) export one CSV per survey. Column sets
/// differ between firmware versions and probe loadouts, and older exports are
/// written in ISO-8859-1, so the degree sign in `°C` is a single 0xB0 byte.
///
/// Lines whose field count does not match the header are skipped and counted,
/// the same tolerance the field team's spreadsheets relied on.

use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::{load_records, LoadReport, RawRecord};
use crate::logging::{self, Stage};
use crate::model::{ProfileError, RecordFault};

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decodes file bytes as UTF-8, falling back to ISO-8859-1.
///
/// Every byte is a valid Latin-1 code point, so the fallback cannot fail.
pub fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Splits CSV text into records, honouring double-quoted fields and `""`
/// escapes. A quoted field may span line breaks. Each record carries the
/// 1-based line it starts on; blank lines produce no record.
fn split_records(text: &str) -> Vec<(usize, Vec<String>)> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut line_no = 1;
    let mut start_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if in_quotes => {
                current.push('\n');
                line_no += 1;
            }
            '\n' => {
                fields.push(std::mem::take(&mut current));
                push_record(&mut records, start_line, std::mem::take(&mut fields));
                line_no += 1;
                start_line = line_no;
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() || !fields.is_empty() {
        fields.push(current);
        push_record(&mut records, start_line, fields);
    }

    records
}

fn push_record(records: &mut Vec<(usize, Vec<String>)>, line_no: usize, fields: Vec<String>) {
    let blank = fields.len() == 1 && fields[0].trim().is_empty();
    if !blank {
        records.push((line_no, fields));
    }
}

// ---------------------------------------------------------------------------
// CSV parsing
// ---------------------------------------------------------------------------

/// A parsed CSV body: usable rows plus the line numbers that were skipped.
#[derive(Debug, Default)]
pub struct CsvTable {
    pub records: Vec<RawRecord>,
    pub skipped_lines: Vec<usize>,
}

/// Parses CSV text with a header line into raw records.
///
/// Blank lines are ignored and a leading UTF-8 byte-order mark is stripped.
/// A row with more fields than the header is skipped. A short row is padded
/// with blank cells, so its missing trailing columns read as absent.
pub fn parse_csv(text: &str) -> CsvTable {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut table = CsvTable::default();
    let mut records = split_records(text).into_iter();

    let Some((_, header)) = records.next() else {
        return table;
    };
    let columns: Vec<String> = header.into_iter().map(|f| f.trim().to_string()).collect();

    for (line_no, mut fields) in records {
        if fields.len() > columns.len() {
            table.skipped_lines.push(line_no);
            continue;
        }
        fields.resize(columns.len(), String::new());

        let pairs = columns.iter().cloned().zip(fields).collect();
        table.records.push(RawRecord::new(line_no, pairs));
    }

    table
}

/// Parses CSV text straight into readings.
pub fn load_str(text: &str) -> LoadReport {
    let table = parse_csv(text);
    let skipped = table.skipped_lines.len();
    let mut report = load_records(table.records);
    for _ in 0..skipped {
        report.record_drop(RecordFault::FieldCount);
    }
    report
}

// ---------------------------------------------------------------------------
// File and directory loading
// ---------------------------------------------------------------------------

/// Loads one export file.
pub fn load_file(path: impl AsRef<Path>) -> Result<LoadReport, ProfileError> {
    let path = path.as_ref();
    let bytes = fs::read(path)
        .map_err(|e| ProfileError::Io(format!("cannot read {}: {}", path.display(), e)))?;

    let mut report = load_str(&decode(&bytes));
    report.files = 1;

    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
    let context = file_name.as_deref();
    logging::debug(
        Stage::Loader,
        context,
        &format!("{} readings, {} row(s) dropped", report.readings.len(), report.dropped),
    );
    logging::log_drop_reasons(context, &report.drop_reasons);

    Ok(report)
}

/// Lists the `*.csv` files of a directory, sorted by file name so repeated
/// runs see the readings in the same order.
pub fn csv_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, ProfileError> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir)
        .map_err(|e| ProfileError::Io(format!("cannot list {}: {}", dir.display(), e)))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| ProfileError::Io(format!("cannot list {}: {}", dir.display(), e)))?
            .path();
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Loads every CSV export in `dir`, concatenating readings in file-name
/// order. An unreadable directory or file is an error; bad rows are not.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<LoadReport, ProfileError> {
    let dir = dir.as_ref();
    let mut report = LoadReport::default();

    for path in csv_files(dir)? {
        report.merge(load_file(&path)?);
    }

    logging::log_load_summary(report.files, report.readings.len(), report.dropped);
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
