use chrono::{DateTime, Duration, Utc};

use super::domain::{ExpiryStatus, License};

/// Lookahead for flagging licenses that need renewal, in milliseconds.
pub const EXPIRING_SOON_WINDOW_MS: i64 = 30 * 24 * 60 * 60 * 1000;

pub fn expiring_soon_window() -> Duration {
    Duration::milliseconds(EXPIRING_SOON_WINDOW_MS)
}

/// Classifies one expiry instant against `now`.
///
/// `expiry < now` is expired; `0 < expiry - now <= 30d` is expiring soon.
/// An expiry exactly at `now` lands in neither bucket.
pub fn classify_expiry(now: DateTime<Utc>, expiry: Option<DateTime<Utc>>) -> ExpiryStatus {
    let Some(expiry) = expiry else {
        return ExpiryStatus::Unscheduled;
    };

    let remaining = expiry - now;
    if expiry < now {
        ExpiryStatus::Expired
    } else if remaining > Duration::zero() && remaining <= expiring_soon_window() {
        ExpiryStatus::ExpiringSoon
    } else {
        ExpiryStatus::Valid
    }
}

/// Licenses split into the two alert buckets, input order preserved.
#[derive(Debug, Default)]
pub struct ExpiryPartition<'a> {
    pub expired: Vec<&'a License>,
    pub expiring_soon: Vec<&'a License>,
}

impl ExpiryPartition<'_> {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.expiring_soon.is_empty()
    }
}

/// Partitions licenses by expiry. Pure in `(now, licenses)`; callers re-run
/// it on every data change and at least once per day boundary.
pub fn partition(now: DateTime<Utc>, licenses: &[License]) -> ExpiryPartition<'_> {
    let mut result = ExpiryPartition::default();

    for license in licenses {
        match classify_expiry(now, license.expiry_date) {
            ExpiryStatus::Expired => result.expired.push(license),
            ExpiryStatus::ExpiringSoon => result.expiring_soon.push(license),
            ExpiryStatus::Valid | ExpiryStatus::Unscheduled => {}
        }
    }

    result
}
