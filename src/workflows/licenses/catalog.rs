use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::domain::{ExpiryStatus, License};
use super::expiry::{classify_expiry, partition};

pub const NO_LICENSES_MESSAGE: &str = "No licenses added yet.";
pub const NO_MATCHES_MESSAGE: &str = "No licenses match your search.";

/// Calendar form used in notices and exports.
pub fn format_expiry(expiry: Option<DateTime<Utc>>) -> String {
    match expiry {
        Some(instant) => instant.date_naive().format("%Y-%m-%d").to_string(),
        None => "N/A".to_string(),
    }
}

/// Case-insensitive name search, ordered by soonest expiry. Licenses without
/// an expiry date sort last.
pub fn search<'a>(licenses: &'a [License], term: &str) -> Vec<&'a License> {
    let needle = term.trim().to_lowercase();
    let mut matches: Vec<&License> = licenses
        .iter()
        .filter(|license| license.name.to_lowercase().contains(&needle))
        .collect();

    matches.sort_by(|a, b| match (a.expiry_date, b.expiry_date) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    matches
}

/// Message shown when a search yields nothing.
pub fn empty_state_message(total: usize) -> &'static str {
    if total > 0 {
        NO_MATCHES_MESSAGE
    } else {
        NO_LICENSES_MESSAGE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseNotice {
    pub license_id: String,
    pub name: String,
    pub status: ExpiryStatus,
    pub expiry_date: Option<NaiveDate>,
    pub message: String,
}

/// Renewal reminders: every expired license first, then every one expiring
/// soon.
pub fn renewal_notices(now: DateTime<Utc>, licenses: &[License]) -> Vec<LicenseNotice> {
    let buckets = partition(now, licenses);

    let expired = buckets.expired.into_iter().map(|license| LicenseNotice {
        license_id: license.id.clone(),
        name: license.name.clone(),
        status: ExpiryStatus::Expired,
        expiry_date: license.expiry_date.map(|instant| instant.date_naive()),
        message: format!(
            "\"{}\" expired on {}. Please renew it immediately.",
            license.name,
            format_expiry(license.expiry_date)
        ),
    });

    let expiring = buckets.expiring_soon.into_iter().map(|license| LicenseNotice {
        license_id: license.id.clone(),
        name: license.name.clone(),
        status: ExpiryStatus::ExpiringSoon,
        expiry_date: license.expiry_date.map(|instant| instant.date_naive()),
        message: format!(
            "\"{}\" will expire on {}. Don't forget to renew.",
            license.name,
            format_expiry(license.expiry_date)
        ),
    });

    expired.chain(expiring).collect()
}

/// Row in the license list with its current classification.
#[derive(Debug, Clone, Serialize)]
pub struct LicenseListingView {
    pub id: String,
    pub name: String,
    pub expiry_date: Option<NaiveDate>,
    pub license_number: String,
    pub issuing_authority: String,
    pub notes: String,
    pub status: ExpiryStatus,
    pub status_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<AttachmentView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttachmentView {
    pub file_name: String,
    pub url: String,
}

impl LicenseListingView {
    pub fn from_license(now: DateTime<Utc>, license: &License) -> Self {
        let status = classify_expiry(now, license.expiry_date);
        let document = license.has_attachment().then(|| AttachmentView {
            file_name: license.file_name.clone(),
            url: license.file_url.clone(),
        });

        Self {
            id: license.id.clone(),
            name: license.name.clone(),
            expiry_date: license.expiry_date.map(|instant| instant.date_naive()),
            license_number: license.license_number.clone(),
            issuing_authority: license.issuing_authority.clone(),
            notes: license.notes.clone(),
            status,
            status_label: status.label(),
            document,
        }
    }
}
