use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::domain::{LeaveCategory, LeaveRecord, LeaveUnitPolicy, StaffMember};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryBalance {
    pub total: u32,
    pub taken: u32,
    /// `total - taken`; negative when leave was over-allotted.
    pub balance: i64,
}

impl CategoryBalance {
    fn new(total: u32, taken: u32) -> Self {
        Self {
            total,
            taken,
            balance: i64::from(total) - i64::from(taken),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffLeaveBalance {
    pub staff_id: String,
    pub staff_name: String,
    pub store: String,
    #[serde(rename = "CL")]
    pub casual: CategoryBalance,
    #[serde(rename = "SL")]
    pub sick: CategoryBalance,
    #[serde(rename = "EL")]
    pub earned: CategoryBalance,
}

impl StaffLeaveBalance {
    pub fn get(&self, category: LeaveCategory) -> &CategoryBalance {
        match category {
            LeaveCategory::Casual => &self.casual,
            LeaveCategory::Sick => &self.sick,
            LeaveCategory::Earned => &self.earned,
        }
    }
}

/// Leave recorded against a staff id that no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanedLeave {
    pub staff_id: String,
    /// Name snapshotted on the first record seen for this id.
    pub staff_name: String,
    pub records: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LeaveLedger {
    pub balances: Vec<StaffLeaveBalance>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orphaned: Vec<OrphanedLeave>,
}

impl LeaveLedger {
    /// Balances for every staff member, in staff order.
    ///
    /// Stateless: always recomputed from the full collections. Records whose
    /// type is outside {CL, SL, EL} are ignored.
    pub fn compute(
        staff: &[StaffMember],
        records: &[LeaveRecord],
        policy: LeaveUnitPolicy,
    ) -> Self {
        let known: HashSet<&str> = staff.iter().map(|member| member.id.as_str()).collect();
        let mut taken: HashMap<(&str, LeaveCategory), u32> = HashMap::new();
        let mut orphaned: Vec<OrphanedLeave> = Vec::new();
        let mut orphan_index: HashMap<&str, usize> = HashMap::new();

        for record in records {
            if !known.contains(record.staff_id.as_str()) {
                match orphan_index.get(record.staff_id.as_str()) {
                    Some(&slot) => orphaned[slot].records += 1,
                    None => {
                        orphan_index.insert(record.staff_id.as_str(), orphaned.len());
                        orphaned.push(OrphanedLeave {
                            staff_id: record.staff_id.clone(),
                            staff_name: record.staff_name.clone(),
                            records: 1,
                        });
                    }
                }
                continue;
            }

            if let Some(category) = record.leave_type.category() {
                let units = policy.units(record);
                let entry = taken.entry((record.staff_id.as_str(), category)).or_default();
                *entry = entry.saturating_add(units);
            }
        }

        let balances = staff
            .iter()
            .map(|member| {
                let balance = |category: LeaveCategory| {
                    let used = taken
                        .get(&(member.id.as_str(), category))
                        .copied()
                        .unwrap_or(0);
                    CategoryBalance::new(member.entitlement(category), used)
                };

                StaffLeaveBalance {
                    staff_id: member.id.clone(),
                    staff_name: member.name.clone(),
                    store: member.store.clone(),
                    casual: balance(LeaveCategory::Casual),
                    sick: balance(LeaveCategory::Sick),
                    earned: balance(LeaveCategory::Earned),
                }
            })
            .collect();

        Self { balances, orphaned }
    }

    pub fn for_staff(&self, staff_id: &str) -> Option<&StaffLeaveBalance> {
        self.balances
            .iter()
            .find(|balance| balance.staff_id == staff_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::staff::domain::LeaveKind;
    use chrono::NaiveDate;

    fn member(id: &str, cl: u32, sl: u32, el: u32) -> StaffMember {
        StaffMember {
            id: id.to_string(),
            name: format!("Staff {id}"),
            store: "Main Store".to_string(),
            total_cl: cl,
            total_sl: sl,
            total_el: el,
        }
    }

    fn leave(staff_id: &str, kind: LeaveKind, days: i64) -> LeaveRecord {
        let start = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        LeaveRecord {
            id: String::new(),
            staff_id: staff_id.to_string(),
            staff_name: format!("Staff {staff_id}"),
            leave_type: kind,
            start_date: Some(start),
            end_date: Some(start + chrono::Duration::days(days - 1)),
            reason: String::new(),
        }
    }

    fn cl() -> LeaveKind {
        LeaveKind::Known(LeaveCategory::Casual)
    }

    #[test]
    fn each_record_consumes_one_unit_regardless_of_span() {
        let staff = vec![member("a", 2, 0, 0)];
        let records = vec![leave("a", cl(), 1), leave("a", cl(), 5)];
        let ledger = LeaveLedger::compute(&staff, &records, LeaveUnitPolicy::PerRecord);

        let casual = ledger.for_staff("a").expect("staff present").casual;
        assert_eq!(casual, CategoryBalance::new(2, 2));
        assert_eq!(casual.balance, 0);
    }

    #[test]
    fn over_allotment_goes_negative() {
        let staff = vec![member("a", 2, 0, 0)];
        let records = vec![leave("a", cl(), 1), leave("a", cl(), 1), leave("a", cl(), 1)];
        let ledger = LeaveLedger::compute(&staff, &records, LeaveUnitPolicy::PerRecord);
        assert_eq!(ledger.balances[0].casual.balance, -1);
    }

    #[test]
    fn unknown_types_are_ignored() {
        let staff = vec![member("a", 1, 1, 1)];
        let records = vec![leave("a", LeaveKind::Other("ML".to_string()), 1)];
        let ledger = LeaveLedger::compute(&staff, &records, LeaveUnitPolicy::PerRecord);
        for category in LeaveCategory::ordered() {
            assert_eq!(ledger.balances[0].get(category).taken, 0);
        }
    }

    #[test]
    fn calendar_day_policy_counts_span() {
        let staff = vec![member("a", 0, 10, 0)];
        let records = vec![leave("a", LeaveKind::Known(LeaveCategory::Sick), 3)];
        let ledger = LeaveLedger::compute(&staff, &records, LeaveUnitPolicy::CalendarDays);
        assert_eq!(ledger.balances[0].sick, CategoryBalance::new(10, 3));
    }

    #[test]
    fn records_for_deleted_staff_are_reported_as_orphans() {
        let staff = vec![member("a", 1, 0, 0)];
        let records = vec![
            leave("gone", cl(), 1),
            leave("left", cl(), 1),
            leave("a", cl(), 1),
            leave("gone", cl(), 1),
            leave("left", LeaveKind::Other("ML".to_string()), 1),
            leave("gone", cl(), 1),
        ];
        let ledger = LeaveLedger::compute(&staff, &records, LeaveUnitPolicy::PerRecord);

        assert_eq!(ledger.balances[0].casual.taken, 1);
        assert_eq!(
            ledger.orphaned,
            vec![
                OrphanedLeave {
                    staff_id: "gone".to_string(),
                    staff_name: "Staff gone".to_string(),
                    records: 3,
                },
                OrphanedLeave {
                    staff_id: "left".to_string(),
                    staff_name: "Staff left".to_string(),
                    records: 2,
                },
            ]
        );
    }

    #[test]
    fn undated_records_still_consume_a_unit() {
        let staff = vec![member("a", 2, 0, 0)];
        let mut undated = leave("a", cl(), 1);
        undated.start_date = None;
        undated.end_date = None;
        let records = vec![leave("a", cl(), 4), undated];

        let per_record = LeaveLedger::compute(&staff, &records, LeaveUnitPolicy::PerRecord);
        assert_eq!(per_record.balances[0].casual, CategoryBalance::new(2, 2));

        let by_days = LeaveLedger::compute(&staff, &records, LeaveUnitPolicy::CalendarDays);
        assert_eq!(by_days.balances[0].casual.taken, 5);
    }
}
