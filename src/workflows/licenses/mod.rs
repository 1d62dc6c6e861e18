//! License expiry tracking: the expiry classifier, list search and renewal
//! notices, form validation, CSV import, and the tenant-scoped commands.

mod catalog;
pub mod domain;
pub mod expiry;
mod form;
mod import;
mod service;

pub use catalog::{
    empty_state_message, format_expiry, renewal_notices, search, AttachmentView,
    LicenseListingView, LicenseNotice, NO_LICENSES_MESSAGE, NO_MATCHES_MESSAGE,
};
pub use domain::{ExpiryStatus, License};
pub use expiry::{classify_expiry, expiring_soon_window, partition, ExpiryPartition};
pub use form::{parse_expiry, Attachment, LicenseForm, ValidatedLicense};
pub use import::{LicenseCsvImporter, LicenseImportError};
pub use service::LicenseService;
