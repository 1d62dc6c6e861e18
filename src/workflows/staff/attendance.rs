use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use super::domain::{AttendanceStatus, StaffMember};
use crate::backend::{Document, DocumentId, Fields};

/// Document id of the attendance snapshot for a calendar day.
pub fn day_key(date: NaiveDate) -> DocumentId {
    DocumentId(date.format("%Y-%m-%d").to_string())
}

/// Attendance for one calendar day, keyed by staff id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceSnapshot {
    pub date: NaiveDate,
    entries: BTreeMap<String, AttendanceStatus>,
}

impl AttendanceSnapshot {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            entries: BTreeMap::new(),
        }
    }

    /// Picks the snapshot for `date` out of the attendance collection. A day
    /// with no document starts empty; nothing carries over from earlier days.
    pub fn for_date(documents: &[Document], date: NaiveDate) -> Self {
        let key = day_key(date);
        documents
            .iter()
            .find(|document| document.id == key)
            .map(|document| Self::from_fields(date, &document.fields))
            .unwrap_or_else(|| Self::empty(date))
    }

    fn from_fields(date: NaiveDate, fields: &Fields) -> Self {
        let mut entries = BTreeMap::new();
        for (staff_id, value) in fields {
            match value.as_str().and_then(AttendanceStatus::from_label) {
                Some(AttendanceStatus::NotMarked) | None => {
                    warn!(
                        %date,
                        staff_id = staff_id.as_str(),
                        ?value,
                        "ignoring unrecognized attendance value"
                    );
                }
                Some(status) => {
                    entries.insert(staff_id.clone(), status);
                }
            }
        }
        Self { date, entries }
    }

    /// Status of a staff member on this day; unset means not marked.
    pub fn status(&self, staff_id: &str) -> AttendanceStatus {
        self.entries
            .get(staff_id)
            .copied()
            .unwrap_or(AttendanceStatus::NotMarked)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Per-staff view plus totals, in staff order. Entries for staff ids that
    /// no longer exist are counted separately.
    pub fn summarize(&self, staff: &[StaffMember]) -> AttendanceDay {
        let mut day = AttendanceDay {
            date: self.date,
            ..AttendanceDay::default()
        };

        for member in staff {
            let status = self.status(&member.id);
            match status {
                AttendanceStatus::Present => day.present += 1,
                AttendanceStatus::Absent => day.absent += 1,
                AttendanceStatus::OnLeave => day.on_leave += 1,
                AttendanceStatus::NotMarked => day.not_marked += 1,
            }
            day.entries.push(AttendanceEntry {
                staff_id: member.id.clone(),
                staff_name: member.name.clone(),
                store: member.store.clone(),
                status,
                status_label: status.label(),
            });
        }

        day.orphaned_entries = self
            .entries
            .keys()
            .filter(|staff_id| !staff.iter().any(|member| &member.id == *staff_id))
            .count();
        day
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceEntry {
    pub staff_id: String,
    pub staff_name: String,
    pub store: String,
    pub status: AttendanceStatus,
    pub status_label: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceDay {
    pub date: NaiveDate,
    pub present: usize,
    pub absent: usize,
    pub on_leave: usize,
    pub not_marked: usize,
    pub orphaned_entries: usize,
    pub entries: Vec<AttendanceEntry>,
}
