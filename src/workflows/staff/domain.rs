use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::workflows::records::lenient_field;

/// A pharmacy employee with annual leave entitlements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub name: String,
    pub store: String,
    #[serde(default, rename = "totalCL")]
    pub total_cl: u32,
    #[serde(default, rename = "totalSL")]
    pub total_sl: u32,
    #[serde(default, rename = "totalEL")]
    pub total_el: u32,
}

impl StaffMember {
    pub fn entitlement(&self, category: LeaveCategory) -> u32 {
        match category {
            LeaveCategory::Casual => self.total_cl,
            LeaveCategory::Sick => self.total_sl,
            LeaveCategory::Earned => self.total_el,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LeaveCategory {
    #[serde(rename = "CL")]
    Casual,
    #[serde(rename = "SL")]
    Sick,
    #[serde(rename = "EL")]
    Earned,
}

impl LeaveCategory {
    pub const fn ordered() -> [Self; 3] {
        [Self::Casual, Self::Sick, Self::Earned]
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::Casual => "CL",
            Self::Sick => "SL",
            Self::Earned => "EL",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Casual => "Casual Leave",
            Self::Sick => "Sick Leave",
            Self::Earned => "Earned Leave",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "CL" => Some(Self::Casual),
            "SL" => Some(Self::Sick),
            "EL" => Some(Self::Earned),
            _ => None,
        }
    }
}

/// Leave type as stored. Values outside {CL, SL, EL} are kept verbatim and
/// excluded from every tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LeaveKind {
    Known(LeaveCategory),
    Other(String),
}

impl LeaveKind {
    pub fn category(&self) -> Option<LeaveCategory> {
        match self {
            Self::Known(category) => Some(*category),
            Self::Other(_) => None,
        }
    }
}

/// One leave application. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRecord {
    #[serde(default, skip_serializing)]
    pub id: String,
    /// Unenforced reference; may dangle once the staff member is deleted.
    pub staff_id: String,
    /// Name at the time the leave was recorded; later renames do not touch it.
    pub staff_name: String,
    pub leave_type: LeaveKind,
    /// `None` when the stored value is missing or unreadable. The record
    /// still counts against its category.
    #[serde(default, deserialize_with = "lenient_start")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_end")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub reason: String,
}

impl LeaveRecord {
    /// Inclusive calendar days covered. A reversed or unknown range counts
    /// as one day.
    pub fn span_days(&self) -> u32 {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => {
                let days = (end - start).num_days() + 1;
                u32::try_from(days).unwrap_or(0).max(1)
            }
            _ => 1,
        }
    }
}

fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn lenient_start<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_field(deserializer, "startDate", parse_calendar_date)
}

fn lenient_end<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_field(deserializer, "endDate", parse_calendar_date)
}

/// How much of an entitlement one leave record consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveUnitPolicy {
    /// Every record consumes one unit regardless of its span.
    #[default]
    PerRecord,
    /// Every record consumes its inclusive day span.
    CalendarDays,
}

impl LeaveUnitPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "per_record" | "record" => Some(Self::PerRecord),
            "calendar_days" | "days" => Some(Self::CalendarDays),
            _ => None,
        }
    }

    pub(crate) fn units(self, record: &LeaveRecord) -> u32 {
        match self {
            Self::PerRecord => 1,
            Self::CalendarDays => record.span_days(),
        }
    }
}

/// Attendance state of a staff member on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
    #[serde(rename = "On Leave")]
    OnLeave,
    /// Only produced on lookup; never stored.
    #[serde(rename = "Not Marked")]
    NotMarked,
}

impl AttendanceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Present => "Present",
            Self::Absent => "Absent",
            Self::OnLeave => "On Leave",
            Self::NotMarked => "Not Marked",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Present" => Some(Self::Present),
            "Absent" => Some(Self::Absent),
            "On Leave" => Some(Self::OnLeave),
            "Not Marked" => Some(Self::NotMarked),
            _ => None,
        }
    }
}

/// Pharmacy administrator contact record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub designation: String,
}
