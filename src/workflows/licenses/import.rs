use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::domain::License;
use super::form::parse_expiry;

#[derive(Debug, thiserror::Error)]
pub enum LicenseImportError {
    #[error("failed to read license export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid license CSV data: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Deserialize)]
struct LicenseRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(
        rename = "Expiry Date",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    expiry_date: Option<String>,
    #[serde(rename = "License Number", default)]
    license_number: String,
    #[serde(rename = "Issuing Authority", default)]
    issuing_authority: String,
    #[serde(rename = "Notes", default)]
    notes: String,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Reads licenses from a CSV export with `Name`, `Expiry Date`, and optional
/// `License Number`, `Issuing Authority`, `Notes` columns.
///
/// Rows are numbered `row-N` in file order. A blank or unparseable expiry
/// yields a license without an expiry date rather than an error.
pub struct LicenseCsvImporter;

impl LicenseCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<License>, LicenseImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<License>, LicenseImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut licenses = Vec::new();

        for (index, row) in csv_reader.deserialize::<LicenseRow>().enumerate() {
            let row = row?;
            if row.name.trim().is_empty() {
                continue;
            }

            licenses.push(License {
                id: format!("row-{}", index + 1),
                name: row.name,
                expiry_date: row.expiry_date.as_deref().and_then(parse_expiry),
                license_number: row.license_number,
                issuing_authority: row.issuing_authority,
                notes: row.notes,
                file_url: String::new(),
                file_name: String::new(),
            });
        }

        Ok(licenses)
    }
}
