use crate::infra::{deserialize_optional_date, deserialize_optional_instant, AppState};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use chrono::{DateTime, Local, NaiveDate, Utc};
use pharmacy_ops::error::AppError;
use pharmacy_ops::workflows::export::{dated_file_name, leave_balance_report, ExportOutcome};
use pharmacy_ops::workflows::licenses::{
    partition, renewal_notices, License, LicenseCsvImporter, LicenseListingView, LicenseNotice,
};
use pharmacy_ops::workflows::staff::{LeaveLedger, LeaveRecord, LeaveUnitPolicy, StaffMember};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LicenseAlertsRequest {
    #[serde(default)]
    pub(crate) licenses: Vec<License>,
    /// License CSV export, appended to `licenses`.
    #[serde(default)]
    pub(crate) licenses_csv: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_instant")]
    pub(crate) now: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LicenseAlertsResponse {
    pub(crate) now: DateTime<Utc>,
    pub(crate) total: usize,
    pub(crate) expired: Vec<LicenseListingView>,
    pub(crate) expiring_soon: Vec<LicenseListingView>,
    pub(crate) notices: Vec<LicenseNotice>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LeaveBalancesRequest {
    #[serde(default)]
    pub(crate) staff: Vec<StaffMember>,
    #[serde(default)]
    pub(crate) leave_records: Vec<LeaveRecord>,
    /// Overrides the configured leave unit policy for this request.
    #[serde(default)]
    pub(crate) leave_units: Option<LeaveUnitPolicy>,
    /// Date stamped into the export file name; defaults to today.
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) as_of: Option<NaiveDate>,
}

impl LeaveBalancesRequest {
    fn ledger(&self, state: &AppState) -> LeaveLedger {
        let policy = self.leave_units.unwrap_or(state.dashboard.leave_units);
        LeaveLedger::compute(&self.staff, &self.leave_records, policy)
    }
}

pub(crate) fn router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/licenses/alerts",
            axum::routing::post(license_alerts_endpoint),
        )
        .route(
            "/api/v1/leave/balances",
            axum::routing::post(leave_balances_endpoint),
        )
        .route(
            "/api/v1/leave/balances/export",
            axum::routing::post(leave_balances_export_endpoint),
        )
        .layer(Extension(state))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn license_alerts_endpoint(
    Json(payload): Json<LicenseAlertsRequest>,
) -> Result<Json<LicenseAlertsResponse>, AppError> {
    let LicenseAlertsRequest {
        mut licenses,
        licenses_csv,
        now,
    } = payload;

    if let Some(csv) = licenses_csv {
        let reader = Cursor::new(csv.into_bytes());
        licenses.extend(LicenseCsvImporter::from_reader(reader)?);
    }

    let now = now.unwrap_or_else(Utc::now);
    let buckets = partition(now, &licenses);
    let expired = buckets
        .expired
        .iter()
        .map(|license| LicenseListingView::from_license(now, license))
        .collect();
    let expiring_soon = buckets
        .expiring_soon
        .iter()
        .map(|license| LicenseListingView::from_license(now, license))
        .collect();

    Ok(Json(LicenseAlertsResponse {
        now,
        total: licenses.len(),
        expired,
        expiring_soon,
        notices: renewal_notices(now, &licenses),
    }))
}

pub(crate) async fn leave_balances_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<LeaveBalancesRequest>,
) -> Json<LeaveLedger> {
    Json(payload.ledger(&state))
}

pub(crate) async fn leave_balances_export_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<LeaveBalancesRequest>,
) -> Result<Response, AppError> {
    let as_of = payload
        .as_of
        .unwrap_or_else(|| Local::now().date_naive());
    let file_name = dated_file_name("leave-balances", as_of);

    match leave_balance_report(&file_name, &payload.ledger(&state))? {
        ExportOutcome::Exported(file) => {
            info!(file_name = %file.file_name, "leave balance export generated");
            let disposition = format!("attachment; filename=\"{}\"", file.file_name);
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, file.mime().to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                file.contents,
            )
                .into_response())
        }
        outcome @ ExportOutcome::NothingToExport => {
            Ok(Json(json!({ "message": outcome.message() })).into_response())
        }
    }
}
