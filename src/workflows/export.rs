//! Delimited-text export of tabular collections.
//!
//! Every field is double-quoted and embedded quotes are doubled. Headers are
//! either supplied by the caller or taken from the key order of the first
//! record. An empty collection produces no file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use super::licenses::{format_expiry, search, License, LicenseListingView};
use super::staff::{AttendanceDay, LeaveCategory, LeaveLedger};

pub const NOTHING_TO_EXPORT: &str = "Nothing to export.";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write delimited text: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write export file: {0}")]
    Io(#[from] io::Error),
    #[error("record {index} does not serialize to an object")]
    NotAnObject { index: usize },
}

/// A rendered export, not yet written anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub contents: String,
}

impl ExportFile {
    pub fn mime(&self) -> mime::Mime {
        mime::TEXT_CSV_UTF_8
    }

    /// Writes the file into `dir` under its own name.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.contents)?;
        info!(path = %path.display(), bytes = self.contents.len(), "export written");
        Ok(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Exported(ExportFile),
    NothingToExport,
}

impl ExportOutcome {
    pub fn file(&self) -> Option<&ExportFile> {
        match self {
            Self::Exported(file) => Some(file),
            Self::NothingToExport => None,
        }
    }

    /// Message shown to the user once the export finishes.
    pub fn message(&self) -> String {
        match self {
            Self::Exported(file) => format!("Exported {}.", file.file_name),
            Self::NothingToExport => NOTHING_TO_EXPORT.to_string(),
        }
    }
}

/// Formats pre-rendered rows under an explicit header row.
pub fn export_rows(
    file_name: &str,
    headers: &[&str],
    rows: &[Vec<String>],
) -> Result<ExportOutcome, ExportError> {
    if rows.is_empty() {
        return Ok(ExportOutcome::NothingToExport);
    }

    let mut writer = writer();
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    finish(file_name, writer)
}

/// Formats any serializable collection.
///
/// With `columns` the given header list is used; otherwise headers are the
/// field order of the first record. Fields a record lacks, or holds as null,
/// are written empty.
pub fn export_records<T: Serialize>(
    file_name: &str,
    records: &[T],
    columns: Option<&[&str]>,
) -> Result<ExportOutcome, ExportError> {
    if records.is_empty() {
        return Ok(ExportOutcome::NothingToExport);
    }

    let mut objects = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        match serde_json::to_value(record).map_err(|_| ExportError::NotAnObject { index })? {
            serde_json::Value::Object(map) => objects.push(map),
            _ => return Err(ExportError::NotAnObject { index }),
        }
    }

    let headers: Vec<String> = match columns {
        Some(columns) => columns.iter().map(|column| column.to_string()).collect(),
        None => objects
            .first()
            .map(|first| first.keys().cloned().collect())
            .unwrap_or_default(),
    };

    let rows: Vec<Vec<String>> = objects
        .iter()
        .map(|object| {
            headers
                .iter()
                .map(|header| object.get(header).map(cell).unwrap_or_default())
                .collect()
        })
        .collect();

    let headers: Vec<&str> = headers.iter().map(String::as_str).collect();
    export_rows(file_name, &headers, &rows)
}

const LICENSE_HEADERS: [&str; 6] = [
    "Name",
    "Expiry Date",
    "Status",
    "License Number",
    "Issuing Authority",
    "Notes",
];

/// Licenses in listing order (ascending expiry), each with its current status.
pub fn license_report(
    file_name: &str,
    now: DateTime<Utc>,
    licenses: &[License],
) -> Result<ExportOutcome, ExportError> {
    let rows: Vec<Vec<String>> = search(licenses, "")
        .into_iter()
        .map(|license| {
            let view = LicenseListingView::from_license(now, license);
            vec![
                view.name,
                format_expiry(license.expiry_date),
                view.status_label.to_string(),
                view.license_number,
                view.issuing_authority,
                view.notes,
            ]
        })
        .collect();
    export_rows(file_name, &LICENSE_HEADERS, &rows)
}

/// One row per staff member with total, taken, and balance per category.
pub fn leave_balance_report(
    file_name: &str,
    ledger: &LeaveLedger,
) -> Result<ExportOutcome, ExportError> {
    let mut headers = vec!["Staff Name".to_string(), "Store".to_string()];
    for category in LeaveCategory::ordered() {
        let code = category.code();
        headers.push(format!("{code} Total"));
        headers.push(format!("{code} Taken"));
        headers.push(format!("{code} Balance"));
    }

    let rows: Vec<Vec<String>> = ledger
        .balances
        .iter()
        .map(|entry| {
            let mut row = vec![entry.staff_name.clone(), entry.store.clone()];
            for category in LeaveCategory::ordered() {
                let balance = entry.get(category);
                row.push(balance.total.to_string());
                row.push(balance.taken.to_string());
                row.push(balance.balance.to_string());
            }
            row
        })
        .collect();
    let headers: Vec<&str> = headers.iter().map(String::as_str).collect();
    export_rows(file_name, &headers, &rows)
}

const ATTENDANCE_HEADERS: [&str; 4] = ["Date", "Staff Name", "Store", "Status"];

pub fn attendance_report(file_name: &str, day: &AttendanceDay) -> Result<ExportOutcome, ExportError> {
    let date = day.date.format("%Y-%m-%d").to_string();
    let rows: Vec<Vec<String>> = day
        .entries
        .iter()
        .map(|entry| {
            vec![
                date.clone(),
                entry.staff_name.clone(),
                entry.store.clone(),
                entry.status_label.to_string(),
            ]
        })
        .collect();
    export_rows(file_name, &ATTENDANCE_HEADERS, &rows)
}

/// Default file name for a dated report, e.g. `leave-balances-2025-10-14.csv`.
pub fn dated_file_name(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}-{}.csv", date.format("%Y-%m-%d"))
}

fn writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new())
}

fn finish(file_name: &str, writer: csv::Writer<Vec<u8>>) -> Result<ExportOutcome, ExportError> {
    let bytes = writer.into_inner().map_err(|err| {
        let cause = err.error();
        ExportError::Io(io::Error::new(cause.kind(), cause.to_string()))
    })?;
    let contents = String::from_utf8(bytes)
        .map_err(|err| ExportError::Io(io::Error::new(io::ErrorKind::InvalidData, err)))?;
    Ok(ExportOutcome::Exported(ExportFile {
        file_name: file_name.to_string(),
        contents,
    }))
}

fn cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::licenses::ExpiryStatus;
    use crate::workflows::staff::{LeaveKind, LeaveRecord, LeaveUnitPolicy, StaffMember};
    use chrono::TimeZone;
    use serde_json::json;

    fn contents(outcome: ExportOutcome) -> String {
        match outcome {
            ExportOutcome::Exported(file) => file.contents,
            ExportOutcome::NothingToExport => panic!("expected a file"),
        }
    }

    fn parse(text: &str) -> (Vec<String>, Vec<Vec<String>>) {
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let headers = reader
            .headers()
            .expect("headers")
            .iter()
            .map(str::to_string)
            .collect();
        let rows = reader
            .records()
            .map(|row| row.expect("row").iter().map(str::to_string).collect())
            .collect();
        (headers, rows)
    }

    #[test]
    fn every_field_is_quoted() {
        let rows = vec![vec!["a".to_string(), "1".to_string()]];
        let text = contents(export_rows("out.csv", &["x", "y"], &rows).expect("export"));
        assert_eq!(text, "\"x\",\"y\"\n\"a\",\"1\"\n");
    }

    #[test]
    fn embedded_quotes_and_commas_survive_a_round_trip() {
        let records = vec![
            json!({ "name": "Drug \"Schedule H\" licence", "notes": "renew, then file" }),
            json!({ "name": "Plain", "notes": "" }),
        ];
        let text = contents(export_records("licenses.csv", &records, None).expect("export"));
        assert!(text.contains("\"Drug \"\"Schedule H\"\" licence\""));

        let (headers, rows) = parse(&text);
        assert_eq!(headers, vec!["name", "notes"]);
        assert_eq!(rows[0], vec!["Drug \"Schedule H\" licence", "renew, then file"]);
        assert_eq!(rows[1], vec!["Plain", ""]);
    }

    #[test]
    fn inferred_headers_follow_the_first_record() {
        let records = vec![
            json!({ "staffName": "Ritu", "date": "2025-10-01" }),
            json!({ "date": "2025-10-02", "reason": null }),
        ];
        let text = contents(export_records("leave.csv", &records, None).expect("export"));
        let (headers, rows) = parse(&text);
        assert_eq!(headers, vec!["staffName", "date"]);
        assert_eq!(rows[1], vec!["", "2025-10-02"]);
    }

    #[test]
    fn explicit_columns_fill_missing_values_with_empty() {
        let records = vec![json!({ "name": "Ritu", "days": 2 })];
        let text = contents(
            export_records("staff.csv", &records, Some(&["name", "store", "days"])).expect("export"),
        );
        let (headers, rows) = parse(&text);
        assert_eq!(headers, vec!["name", "store", "days"]);
        assert_eq!(rows[0], vec!["Ritu", "", "2"]);
    }

    #[test]
    fn empty_collections_export_nothing() {
        let empty: Vec<serde_json::Value> = Vec::new();
        let outcome = export_records("empty.csv", &empty, None).expect("export");
        assert_eq!(outcome, ExportOutcome::NothingToExport);
        assert_eq!(outcome.message(), NOTHING_TO_EXPORT);

        let ledger = LeaveLedger::compute(&[], &[], LeaveUnitPolicy::PerRecord);
        assert_eq!(
            leave_balance_report("balances.csv", &ledger).expect("export"),
            ExportOutcome::NothingToExport
        );
    }

    #[test]
    fn non_object_records_are_rejected() {
        let outcome = export_records("numbers.csv", &[1, 2], None);
        assert!(matches!(outcome, Err(ExportError::NotAnObject { index: 0 })));
    }

    #[test]
    fn leave_balance_report_lists_each_category() {
        let staff = vec![StaffMember {
            id: "s1".to_string(),
            name: "Ritu".to_string(),
            store: "Main Store".to_string(),
            total_cl: 2,
            total_sl: 0,
            total_el: 5,
        }];
        let start = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        let records = vec![LeaveRecord {
            id: "l1".to_string(),
            staff_id: "s1".to_string(),
            staff_name: "Ritu".to_string(),
            leave_type: LeaveKind::Known(LeaveCategory::Sick),
            start_date: Some(start),
            end_date: Some(start),
            reason: String::new(),
        }];
        let ledger = LeaveLedger::compute(&staff, &records, LeaveUnitPolicy::PerRecord);

        let text = contents(leave_balance_report("balances.csv", &ledger).expect("export"));
        let (headers, rows) = parse(&text);
        assert_eq!(headers.len(), 11);
        assert_eq!(headers[5], "SL Taken");
        assert_eq!(
            rows[0],
            vec!["Ritu", "Main Store", "2", "0", "2", "0", "1", "-1", "5", "0", "5"]
        );
    }

    #[test]
    fn license_report_orders_by_expiry_and_labels_status() {
        let now = Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap();
        let license = |name: &str, days: i64| License {
            id: name.to_string(),
            name: name.to_string(),
            expiry_date: Some(now + chrono::Duration::days(days)),
            license_number: String::new(),
            issuing_authority: String::new(),
            notes: String::new(),
            file_url: String::new(),
            file_name: String::new(),
        };
        let licenses = vec![license("Trade", 90), license("Drug", -2), license("FSSAI", 10)];

        let text = contents(license_report("licenses.csv", now, &licenses).expect("export"));
        let (_, rows) = parse(&text);
        let names: Vec<&str> = rows.iter().map(|row| row[0].as_str()).collect();
        assert_eq!(names, vec!["Drug", "FSSAI", "Trade"]);
        assert_eq!(rows[0][1], "2025-09-29");
        assert_eq!(rows[0][2], ExpiryStatus::Expired.label());
        assert_eq!(rows[1][2], ExpiryStatus::ExpiringSoon.label());
    }

    #[test]
    fn files_are_written_under_their_name() {
        let dir = std::env::temp_dir().join(format!("pharmacy-ops-export-{}", uuid::Uuid::new_v4()));
        let file = ExportFile {
            file_name: "report.csv".to_string(),
            contents: "\"a\"\n".to_string(),
        };
        let path = file.write_to(&dir).expect("written");
        assert_eq!(fs::read_to_string(&path).expect("read back"), "\"a\"\n");
        fs::remove_dir_all(&dir).ok();
    }
}
