use chrono::{DateTime, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use pharmacy_ops::config::DashboardConfig;
use pharmacy_ops::workflows::licenses::parse_expiry;
use serde::Deserialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) dashboard: Arc<DashboardConfig>,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (UTC midnight).
pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_expiry(raw)
        .ok_or_else(|| format!("failed to parse '{raw}' as an RFC 3339 timestamp or YYYY-MM-DD"))
}

pub(crate) fn deserialize_optional_instant<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_instant(&value).map_err(serde::de::Error::custom))
        .transpose()
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn instants_accept_dates_and_timestamps() {
        assert_eq!(
            parse_instant("2025-10-14"),
            Ok(Utc.with_ymd_and_hms(2025, 10, 14, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_instant("2025-10-14T09:30:00+05:30"),
            Ok(Utc.with_ymd_and_hms(2025, 10, 14, 4, 0, 0).unwrap())
        );
        assert!(parse_instant("14/10/2025").is_err());
    }
}
