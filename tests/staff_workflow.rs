use chrono::NaiveDate;
use pharmacy_ops::backend::memory::InMemoryRecordStore;
use pharmacy_ops::backend::{Collection, RecordStore, TenantScope};
use pharmacy_ops::config::DashboardConfig;
use pharmacy_ops::workflows::export::{attendance_report, export_records, ExportOutcome};
use pharmacy_ops::workflows::staff::{
    day_key, AttendanceSnapshot, AttendanceStatus, LeaveCategory, LeaveForm, LeaveKind,
    LeaveLedger, LeaveRecord, LeaveUnitPolicy, StaffForm, StaffMember, StaffService,
};
use std::sync::Arc;

fn member(id: &str, cl: u32) -> StaffMember {
    StaffMember {
        id: id.to_string(),
        name: format!("Staff {id}"),
        store: "Main Store".to_string(),
        total_cl: cl,
        total_sl: 3,
        total_el: 10,
    }
}

fn leave(staff_id: &str, kind: LeaveKind, start: (u32, u32), end: (u32, u32)) -> LeaveRecord {
    LeaveRecord {
        id: String::new(),
        staff_id: staff_id.to_string(),
        staff_name: format!("Staff {staff_id}"),
        leave_type: kind,
        start_date: NaiveDate::from_ymd_opt(2025, start.0, start.1),
        end_date: NaiveDate::from_ymd_opt(2025, end.0, end.1),
        reason: String::new(),
    }
}

fn casual() -> LeaveKind {
    LeaveKind::Known(LeaveCategory::Casual)
}

#[test]
fn casual_balance_reaches_zero_then_goes_negative() {
    let staff = vec![member("a", 2)];
    let mut records = vec![
        leave("a", casual(), (10, 1), (10, 1)),
        leave("a", casual(), (10, 6), (10, 10)),
    ];

    let ledger = LeaveLedger::compute(&staff, &records, LeaveUnitPolicy::PerRecord);
    assert_eq!(ledger.balances[0].casual.balance, 0);

    records.push(leave("a", casual(), (10, 20), (10, 20)));
    let ledger = LeaveLedger::compute(&staff, &records, LeaveUnitPolicy::PerRecord);
    let casual_balance = ledger.balances[0].casual;
    assert_eq!(casual_balance.taken, 3);
    assert_eq!(casual_balance.balance, -1);
}

#[test]
fn balance_equals_total_minus_record_count_for_every_category() {
    let staff = vec![member("a", 4), member("b", 1)];
    let records = vec![
        leave("a", casual(), (9, 1), (9, 30)),
        leave("a", LeaveKind::Known(LeaveCategory::Sick), (9, 2), (9, 3)),
        leave("b", LeaveKind::Known(LeaveCategory::Earned), (9, 4), (9, 14)),
        leave("b", LeaveKind::Other("Maternity".to_string()), (9, 5), (9, 5)),
    ];
    let ledger = LeaveLedger::compute(&staff, &records, LeaveUnitPolicy::PerRecord);

    for entry in &ledger.balances {
        for category in LeaveCategory::ordered() {
            let count = records
                .iter()
                .filter(|record| {
                    record.staff_id == entry.staff_id && record.leave_type.category() == Some(category)
                })
                .count() as i64;
            let balance = entry.get(category);
            assert_eq!(balance.balance, i64::from(balance.total) - count);
        }
    }
    assert!(ledger.orphaned.is_empty());
}

#[test]
fn a_day_without_marks_resolves_to_not_marked() {
    let snapshot = AttendanceSnapshot::for_date(&[], NaiveDate::from_ymd_opt(2025, 10, 14).expect("date"));
    assert_eq!(snapshot.status("x"), AttendanceStatus::NotMarked);
}

fn service() -> (StaffService<InMemoryRecordStore>, Arc<InMemoryRecordStore>, TenantScope) {
    let store = Arc::new(InMemoryRecordStore::default());
    let scope = TenantScope::new("default-app-id", "owner-1");
    let service = StaffService::new(store.clone(), scope.clone(), DashboardConfig::default());
    (service, store, scope)
}

async fn add(service: &StaffService<InMemoryRecordStore>, name: &str) -> StaffMember {
    service
        .add_staff(StaffForm {
            name: name.to_string(),
            store: "Main Store".to_string(),
            total_cl: 2,
            ..StaffForm::default()
        })
        .await
        .expect("staff added")
}

#[tokio::test]
async fn marking_one_staff_member_leaves_others_untouched() {
    let (service, store, scope) = service();
    let a = add(&service, "Ritu").await;
    let b = add(&service, "Mohan").await;
    let staff = vec![a.clone(), b.clone()];
    let day = NaiveDate::from_ymd_opt(2025, 10, 14).expect("date");

    service
        .mark_attendance(day, &b.id, AttendanceStatus::Absent, &staff)
        .await
        .expect("b marked");
    for status in [AttendanceStatus::Present, AttendanceStatus::OnLeave] {
        service
            .mark_attendance(day, &a.id, status, &staff)
            .await
            .expect("a marked");
    }

    let mut subscription = store
        .subscribe(&scope.collection(Collection::Attendance))
        .expect("subscribe");
    let documents = subscription.latest();
    let snapshot = AttendanceSnapshot::for_date(&documents, day);
    assert_eq!(snapshot.status(&a.id), AttendanceStatus::OnLeave);
    assert_eq!(snapshot.status(&b.id), AttendanceStatus::Absent);

    let next_day = day.succ_opt().expect("next day");
    let tomorrow = AttendanceSnapshot::for_date(&documents, next_day);
    assert!(tomorrow.is_empty());
    assert!(documents.iter().all(|document| document.id == day_key(day)));

    let summary = snapshot.summarize(&staff);
    let file = match attendance_report("attendance.csv", &summary).expect("export") {
        ExportOutcome::Exported(file) => file,
        ExportOutcome::NothingToExport => panic!("expected an export"),
    };
    assert!(file
        .contents
        .contains("\"2025-10-14\",\"Mohan\",\"Main Store\",\"Absent\""));
}

#[tokio::test]
async fn deleted_staff_leave_is_reported_as_orphaned() {
    let (service, store, scope) = service();
    let a = add(&service, "Ritu").await;
    let b = add(&service, "Mohan").await;
    let roster = vec![a.clone(), b.clone()];

    for (staff_id, start, end) in [(&a.id, "2025-10-01", "2025-10-03"), (&b.id, "2025-10-02", "2025-10-02")] {
        service
            .record_leave(
                LeaveForm {
                    staff_id: staff_id.clone(),
                    leave_type: "CL".to_string(),
                    start_date: start.to_string(),
                    end_date: end.to_string(),
                    reason: "wedding".to_string(),
                },
                &roster,
            )
            .await
            .expect("leave recorded");
    }

    service
        .delete_staff(&a.id, pharmacy_ops::workflows::Confirmation::Confirmed)
        .await
        .expect("deleted");

    let mut records_feed = store
        .subscribe(&scope.collection(Collection::LeaveRecords))
        .expect("subscribe");
    let records: Vec<LeaveRecord> = records_feed
        .latest()
        .iter()
        .map(|document| {
            let mut fields = document.fields.clone();
            fields.insert("id".to_string(), serde_json::json!(document.id.as_str()));
            serde_json::from_value(serde_json::Value::Object(fields)).expect("leave decodes")
        })
        .collect();
    assert_eq!(records.len(), 2);

    let ledger = LeaveLedger::compute(&[b.clone()], &records, LeaveUnitPolicy::PerRecord);
    assert_eq!(ledger.balances.len(), 1);
    assert_eq!(ledger.balances[0].casual.taken, 1);
    assert_eq!(ledger.orphaned.len(), 1);
    assert_eq!(ledger.orphaned[0].staff_name, "Ritu");

    let exported = export_records("leave.csv", &records, None).expect("export");
    let file = exported.file().expect("file produced");
    let header = file.contents.lines().next().expect("header row");
    assert_eq!(
        header,
        "\"staffId\",\"staffName\",\"leaveType\",\"startDate\",\"endDate\",\"reason\""
    );
}
