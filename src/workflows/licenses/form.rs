use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::workflows::ValidationError;

const REQUIRED_FIELDS: &str = "License Name and Expiry Date are required.";

/// Uploaded file accompanying a license form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Raw license form input, as typed by the user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LicenseForm {
    pub name: String,
    pub expiry_date: String,
    pub license_number: String,
    pub issuing_authority: String,
    pub notes: String,
    #[serde(skip)]
    pub attachment: Option<Attachment>,
}

/// A form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLicense {
    pub name: String,
    pub expiry_date: DateTime<Utc>,
    pub license_number: String,
    pub issuing_authority: String,
    pub notes: String,
    pub attachment: Option<Attachment>,
}

impl LicenseForm {
    pub fn validate(self) -> Result<ValidatedLicense, ValidationError> {
        let name = self.name.trim().to_string();
        let raw_expiry = self.expiry_date.trim();
        if name.is_empty() || raw_expiry.is_empty() {
            return Err(ValidationError::MissingFields(REQUIRED_FIELDS));
        }

        let expiry_date = parse_expiry(raw_expiry).ok_or_else(|| ValidationError::InvalidDate {
            field: "expiryDate",
            value: raw_expiry.to_string(),
        })?;

        let attachment = self
            .attachment
            .filter(|attachment| !attachment.file_name.trim().is_empty());

        Ok(ValidatedLicense {
            name,
            expiry_date,
            license_number: self.license_number.trim().to_string(),
            issuing_authority: self.issuing_authority.trim().to_string(),
            notes: self.notes.trim().to_string(),
            attachment,
        })
    }
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_expiry(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(instant.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
