//! CSV export/import of the collector log.
//!
//! This is the persisted-state contract an external "latest readings" viewer
//! consumes: one row per received reading with the fixed columns
//! `Timestamp,Temperature,Moisture,Humidity,Light,Ph`, missing fields
//! written as `N/A`, and the freshest state being the row with the maximum
//! parsed timestamp. Values are written with `f64`'s shortest round-trip
//! formatting so an export→import cycle reproduces the records exactly.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::simulation::types::LogRecord;

/// Timestamp format shared by export and import.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// CSV columns after `Timestamp`, paired with their reading keys.
const COLUMNS: &[(&str, &str)] = &[
    ("Temperature", "temperature"),
    ("Moisture", "moisture"),
    ("Humidity", "humidity"),
    ("Light", "light"),
    ("Ph", "ph"),
];

const MISSING_FIELD: &str = "N/A";

/// Error type for CSV log reading failures.
#[derive(Debug)]
pub enum CsvLogError {
    FileReadError(String),
    /// The file exists but contains no data at all.
    EmptyFile,
    InvalidHeader(String),
}

impl std::fmt::Display for CsvLogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CsvLogError::FileReadError(msg) => write!(f, "Failed to read file: {}", msg),
            CsvLogError::EmptyFile => write!(f, "The CSV file is empty"),
            CsvLogError::InvalidHeader(line) => write!(f, "Unexpected CSV header: {}", line),
        }
    }
}

impl std::error::Error for CsvLogError {}

/// One parsed CSV row: timestamp plus whichever reading fields were present.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    pub timestamp: NaiveDateTime,
    /// Present fields keyed by reading name (`temperature`, `moisture`, ...).
    pub values: BTreeMap<&'static str, f64>,
}

fn header_line() -> String {
    let mut header = String::from("Timestamp");
    for (column, _) in COLUMNS {
        header.push(',');
        header.push_str(column);
    }
    header
}

/// Export the collector log to `path`, one row per record.
///
/// Fields a record does not carry (every record carries only its node's
/// reading keys) are written as `N/A`.
pub fn export_log(path: &Path, records: &[LogRecord]) -> std::io::Result<()> {
    let mut out = header_line();
    out.push('\n');
    for record in records {
        out.push_str(&record.timestamp.format(TIMESTAMP_FORMAT).to_string());
        for (_, key) in COLUMNS {
            out.push(',');
            match record.readings.get(key) {
                Some(value) => out.push_str(&value.to_string()),
                None => out.push_str(MISSING_FIELD),
            }
        }
        out.push('\n');
    }
    fs::write(path, out)
}

/// Import a previously exported log.
///
/// Rows that fail to parse are skipped with a warning rather than failing
/// the whole import; a missing or unreadable file is an error the boundary
/// reports as "no data".
pub fn import_log(path: &Path) -> Result<Vec<CsvRow>, CsvLogError> {
    let data = fs::read_to_string(path).map_err(|e| CsvLogError::FileReadError(e.to_string()))?;

    let mut lines = data.lines().filter(|line| !line.trim().is_empty());
    let Some(header) = lines.next() else {
        return Err(CsvLogError::EmptyFile);
    };
    if header.trim() != header_line() {
        return Err(CsvLogError::InvalidHeader(header.to_string()));
    }

    let mut rows = Vec::new();
    for line in lines {
        match parse_row(line) {
            Some(row) => rows.push(row),
            None => log::warn!("Skipping malformed CSV row: {line}"),
        }
    }
    Ok(rows)
}

fn parse_row(line: &str) -> Option<CsvRow> {
    let mut fields = line.split(',');
    let timestamp = NaiveDateTime::parse_from_str(fields.next()?.trim(), TIMESTAMP_FORMAT).ok()?;
    let mut values = BTreeMap::new();
    for (_, key) in COLUMNS {
        let field = fields.next()?.trim();
        if field != MISSING_FIELD {
            values.insert(*key, field.parse::<f64>().ok()?);
        }
    }
    // Trailing extra fields mean the row doesn't match the schema
    if fields.next().is_some() {
        return None;
    }
    Some(CsvRow { timestamp, values })
}

/// The row with the maximum parsed timestamp: the viewer's "latest
/// field conditions".
pub fn latest_row(rows: &[CsvRow]) -> Option<&CsvRow> {
    rows.iter().max_by_key(|row| row.timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(hour: u32, min: u32, sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(hour, min, sec).unwrap()
    }

    fn record(node_id: u32, timestamp: NaiveDateTime, key: &'static str, value: f64) -> LogRecord {
        let mut readings = BTreeMap::new();
        readings.insert(key, value);
        LogRecord { node_id, timestamp, readings }
    }

    #[test]
    fn export_import_round_trip_preserves_records() {
        let records = vec![
            record(0, ts(10, 0, 0), "moisture", 43.217848103),
            record(1, ts(10, 0, 2), "temperature", 22.5),
            record(4, ts(10, 0, 4), "ph", 6.95),
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wsn_data.csv");
        export_log(&path, &records).unwrap();

        let rows = import_log(&path).unwrap();
        assert_eq!(rows.len(), 3);
        for (row, rec) in rows.iter().zip(&records) {
            assert_eq!(row.timestamp, rec.timestamp);
            assert_eq!(row.values, rec.readings);
        }

        let latest = latest_row(&rows).unwrap();
        assert_eq!(latest.timestamp, ts(10, 0, 4));
        assert_eq!(latest.values["ph"], 6.95);
    }

    #[test]
    fn missing_fields_are_written_and_read_as_na() {
        let records = vec![record(2, ts(9, 30, 0), "humidity", 61.0)];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wsn_data.csv");
        export_log(&path, &records).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next().unwrap(), "Timestamp,Temperature,Moisture,Humidity,Light,Ph");
        assert_eq!(text.lines().nth(1).unwrap(), "2025-06-01 09:30:00,N/A,N/A,61,N/A,N/A");

        let rows = import_log(&path).unwrap();
        assert_eq!(rows[0].values.len(), 1);
        assert_eq!(rows[0].values["humidity"], 61.0);
    }

    #[test]
    fn latest_row_is_order_independent() {
        let records = vec![
            record(0, ts(12, 0, 0), "light", 500.0),
            record(1, ts(11, 0, 0), "light", 400.0),
            record(2, ts(13, 0, 0), "light", 600.0),
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wsn_data.csv");
        export_log(&path, &records).unwrap();
        let rows = import_log(&path).unwrap();
        assert_eq!(latest_row(&rows).unwrap().values["light"], 600.0);
    }

    #[test]
    fn empty_and_malformed_files_are_soft_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("nope.csv");
        assert!(matches!(import_log(&missing), Err(CsvLogError::FileReadError(_))));

        let empty = dir.path().join("empty.csv");
        fs::write(&empty, "").unwrap();
        assert!(matches!(import_log(&empty), Err(CsvLogError::EmptyFile)));

        let garbled = dir.path().join("garbled.csv");
        fs::write(&garbled, "not,a,log\n").unwrap();
        assert!(matches!(import_log(&garbled), Err(CsvLogError::InvalidHeader(_))));
    }

    #[test]
    fn malformed_rows_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wsn_data.csv");
        let mut text = String::from("Timestamp,Temperature,Moisture,Humidity,Light,Ph\n");
        text.push_str("2025-06-01 10:00:00,21.5,N/A,N/A,N/A,N/A\n");
        text.push_str("garbage line\n");
        text.push_str("2025-06-01 10:00:02,N/A,55,N/A,N/A,N/A\n");
        fs::write(&path, text).unwrap();

        let rows = import_log(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].values["moisture"], 55.0);
    }
}
