pub mod clock;
pub mod export;
pub mod licenses;
pub mod session;
pub mod staff;

mod records;

use crate::backend::{BlobError, IdentityError, StoreError};

/// Input rejected before any backend call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0}")]
    MissingFields(&'static str),
    #[error("Invalid date format.")]
    InvalidDate { field: &'static str, value: String },
    #[error("a license named \"{0}\" already exists")]
    DuplicateLicenseName(String),
    #[error("license name cannot change on renewal (was \"{existing}\", got \"{requested}\")")]
    LicenseRenamed { existing: String, requested: String },
    #[error("license {0} not found")]
    UnknownLicense(String),
    #[error("store \"{0}\" is not one of the configured stores")]
    UnknownStore(String),
    #[error("staff member {0} not found")]
    UnknownStaff(String),
    #[error("leave type \"{0}\" is not one of CL, SL, EL")]
    UnknownLeaveType(String),
    #[error("admin {0} not found")]
    UnknownAdmin(String),
    #[error("leave end date {end} is before start date {start}")]
    EndBeforeStart {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
    #[error("attendance can only be marked Present, Absent, or On Leave")]
    UnmarkableStatus,
}

/// Failure of a dashboard command.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Explicit user answer required before a destructive command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}
