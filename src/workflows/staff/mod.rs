//! Staff roster, leave ledger, daily attendance, and admin contacts.

mod attendance;
pub mod domain;
mod ledger;
mod service;

pub use attendance::{day_key, AttendanceDay, AttendanceEntry, AttendanceSnapshot};
pub use domain::{
    Admin, AttendanceStatus, LeaveCategory, LeaveKind, LeaveRecord, LeaveUnitPolicy, StaffMember,
};
pub use ledger::{CategoryBalance, LeaveLedger, OrphanedLeave, StaffLeaveBalance};
pub use service::{AdminForm, LeaveForm, StaffForm, StaffService};
