use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use super::attendance::day_key;
use super::domain::{Admin, AttendanceStatus, LeaveCategory, LeaveKind, LeaveRecord, StaffMember};
use crate::backend::{Collection, DocumentId, Fields, RecordStore, StoreError, TenantScope};
use crate::config::DashboardConfig;
use crate::workflows::records::encode;
use crate::workflows::{Confirmation, DashboardError, DeleteOutcome, ValidationError};

const STAFF_REQUIRED: &str = "Staff name and store are required.";
const LEAVE_REQUIRED: &str = "Staff member, leave type, and both dates are required.";
const ADMIN_REQUIRED: &str = "Admin name and email are required.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StaffForm {
    pub name: String,
    pub store: String,
    #[serde(rename = "totalCL")]
    pub total_cl: u32,
    #[serde(rename = "totalSL")]
    pub total_sl: u32,
    #[serde(rename = "totalEL")]
    pub total_el: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LeaveForm {
    pub staff_id: String,
    pub leave_type: String,
    pub start_date: String,
    pub end_date: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdminForm {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub designation: String,
}

/// Staff, leave, attendance, and admin commands for one tenant.
pub struct StaffService<S> {
    store: Arc<S>,
    scope: TenantScope,
    config: DashboardConfig,
}

impl<S> StaffService<S>
where
    S: RecordStore + 'static,
{
    pub fn new(store: Arc<S>, scope: TenantScope, config: DashboardConfig) -> Self {
        Self {
            store,
            scope,
            config,
        }
    }

    pub async fn add_staff(&self, form: StaffForm) -> Result<StaffMember, DashboardError> {
        let mut member = self.validate_staff(form)?;
        let path = self.scope.collection(Collection::Staff);
        let id = self.store.insert(&path, encode(&member)?).await?;
        member.id = id.0;

        info!(staff_id = %member.id, store = %member.store, "staff member added");
        Ok(member)
    }

    /// Replaces name, store, and entitlements. Earlier leave records keep the
    /// name they were recorded under.
    pub async fn update_staff(
        &self,
        staff_id: &str,
        form: StaffForm,
        staff: &[StaffMember],
    ) -> Result<StaffMember, DashboardError> {
        if !staff.iter().any(|member| member.id == staff_id) {
            return Err(ValidationError::UnknownStaff(staff_id.to_string()).into());
        }

        let mut member = self.validate_staff(form)?;
        let path = self.scope.collection(Collection::Staff);
        self.store
            .update(&path, &DocumentId::new(staff_id), encode(&member)?)
            .await?;
        member.id = staff_id.to_string();

        info!(staff_id, "staff member updated");
        Ok(member)
    }

    /// Removes the staff member only. Their leave records and attendance
    /// entries stay behind as dangling references.
    pub async fn delete_staff(
        &self,
        staff_id: &str,
        confirmation: Confirmation,
    ) -> Result<DeleteOutcome, DashboardError> {
        if confirmation == Confirmation::Declined {
            return Ok(DeleteOutcome::Cancelled);
        }

        let path = self.scope.collection(Collection::Staff);
        self.store.delete(&path, &DocumentId::new(staff_id)).await?;
        info!(staff_id, "staff member deleted");
        Ok(DeleteOutcome::Deleted)
    }

    /// Records leave against a current staff member, snapshotting their name.
    pub async fn record_leave(
        &self,
        form: LeaveForm,
        staff: &[StaffMember],
    ) -> Result<LeaveRecord, DashboardError> {
        let staff_id = form.staff_id.trim();
        let leave_type = form.leave_type.trim();
        let start_raw = form.start_date.trim();
        let end_raw = form.end_date.trim();
        if staff_id.is_empty() || leave_type.is_empty() || start_raw.is_empty() || end_raw.is_empty()
        {
            return Err(ValidationError::MissingFields(LEAVE_REQUIRED).into());
        }

        let member = staff
            .iter()
            .find(|member| member.id == staff_id)
            .ok_or_else(|| ValidationError::UnknownStaff(staff_id.to_string()))?;
        let category = LeaveCategory::from_code(leave_type)
            .ok_or_else(|| ValidationError::UnknownLeaveType(leave_type.to_string()))?;
        let start_date = parse_calendar_date("startDate", start_raw)?;
        let end_date = parse_calendar_date("endDate", end_raw)?;
        if end_date < start_date {
            return Err(ValidationError::EndBeforeStart {
                start: start_date,
                end: end_date,
            }
            .into());
        }

        let mut record = LeaveRecord {
            id: String::new(),
            staff_id: member.id.clone(),
            staff_name: member.name.clone(),
            leave_type: LeaveKind::Known(category),
            start_date: Some(start_date),
            end_date: Some(end_date),
            reason: form.reason.trim().to_string(),
        };

        let path = self.scope.collection(Collection::LeaveRecords);
        let id = self.store.insert(&path, encode(&record)?).await?;
        record.id = id.0;

        info!(
            leave_id = %record.id,
            staff_id = %record.staff_id,
            leave_type = category.code(),
            "leave recorded"
        );
        Ok(record)
    }

    /// Sets one staff member's status for `date`, merging into that day's
    /// snapshot so marks for other staff on the same day survive.
    pub async fn mark_attendance(
        &self,
        date: NaiveDate,
        staff_id: &str,
        status: AttendanceStatus,
        staff: &[StaffMember],
    ) -> Result<(), DashboardError> {
        if status == AttendanceStatus::NotMarked {
            return Err(ValidationError::UnmarkableStatus.into());
        }
        if !staff.iter().any(|member| member.id == staff_id) {
            return Err(ValidationError::UnknownStaff(staff_id.to_string()).into());
        }

        let mut mark = Fields::new();
        mark.insert(
            staff_id.to_string(),
            serde_json::to_value(status).map_err(StoreError::from)?,
        );
        let path = self.scope.collection(Collection::Attendance);
        self.store
            .merge_set(&path, &day_key(date), mark)
            .await?;

        info!(%date, staff_id, status = status.label(), "attendance marked");
        Ok(())
    }

    pub async fn add_admin(&self, form: AdminForm) -> Result<Admin, DashboardError> {
        let mut admin = validate_admin(form)?;
        let path = self.scope.collection(Collection::Admins);
        let id = self.store.insert(&path, encode(&admin)?).await?;
        admin.id = id.0;

        info!(admin_id = %admin.id, "admin added");
        Ok(admin)
    }

    pub async fn update_admin(
        &self,
        admin_id: &str,
        form: AdminForm,
        admins: &[Admin],
    ) -> Result<Admin, DashboardError> {
        if !admins.iter().any(|admin| admin.id == admin_id) {
            return Err(ValidationError::UnknownAdmin(admin_id.to_string()).into());
        }

        let mut admin = validate_admin(form)?;
        let path = self.scope.collection(Collection::Admins);
        self.store
            .update(&path, &DocumentId::new(admin_id), encode(&admin)?)
            .await?;
        admin.id = admin_id.to_string();

        info!(admin_id, "admin updated");
        Ok(admin)
    }

    pub async fn delete_admin(
        &self,
        admin_id: &str,
        confirmation: Confirmation,
    ) -> Result<DeleteOutcome, DashboardError> {
        if confirmation == Confirmation::Declined {
            return Ok(DeleteOutcome::Cancelled);
        }

        let path = self.scope.collection(Collection::Admins);
        self.store.delete(&path, &DocumentId::new(admin_id)).await?;
        info!(admin_id, "admin deleted");
        Ok(DeleteOutcome::Deleted)
    }

    fn validate_staff(&self, form: StaffForm) -> Result<StaffMember, ValidationError> {
        let name = form.name.trim().to_string();
        let store = form.store.trim().to_string();
        if name.is_empty() || store.is_empty() {
            return Err(ValidationError::MissingFields(STAFF_REQUIRED));
        }
        if !self.config.is_known_store(&store) {
            return Err(ValidationError::UnknownStore(store));
        }

        Ok(StaffMember {
            id: String::new(),
            name,
            store,
            total_cl: form.total_cl,
            total_sl: form.total_sl,
            total_el: form.total_el,
        })
    }
}

fn validate_admin(form: AdminForm) -> Result<Admin, ValidationError> {
    let name = form.name.trim().to_string();
    let email = form.email.trim().to_string();
    if name.is_empty() || email.is_empty() {
        return Err(ValidationError::MissingFields(ADMIN_REQUIRED));
    }

    Ok(Admin {
        id: String::new(),
        name,
        email,
        mobile: form.mobile.trim().to_string(),
        designation: form.designation.trim().to_string(),
    })
}

fn parse_calendar_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate {
        field,
        value: value.to_string(),
    })
}
