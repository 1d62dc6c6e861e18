use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::form::parse_expiry;
use crate::workflows::records::lenient_field;

/// A regulatory license held by the pharmacy.
///
/// A renewal keeps the same id and name and changes the expiry and
/// attachment in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub name: String,
    /// `None` for records written outside this crate without a readable
    /// expiry; such licenses are listed but never classified.
    #[serde(default, deserialize_with = "lenient_expiry")]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub license_number: String,
    #[serde(default)]
    pub issuing_authority: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, rename = "fileURL")]
    pub file_url: String,
    #[serde(default)]
    pub file_name: String,
}

impl License {
    pub fn has_attachment(&self) -> bool {
        !self.file_url.is_empty()
    }
}

fn lenient_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_field(deserializer, "expiryDate", parse_expiry)
}

/// Fields patched on renewal. The name is deliberately absent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LicenseRenewal {
    pub expiry_date: DateTime<Utc>,
    pub license_number: String,
    pub issuing_authority: String,
    pub notes: String,
    #[serde(rename = "fileURL")]
    pub file_url: String,
    pub file_name: String,
}

/// Expiry state of a single license relative to a reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    Expired,
    ExpiringSoon,
    Valid,
    /// No expiry date on record.
    Unscheduled,
}

impl ExpiryStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Expired => "Expired",
            Self::ExpiringSoon => "Expiring Soon",
            Self::Valid => "Valid",
            Self::Unscheduled => "No Expiry Date",
        }
    }
}
