use chrono::{DateTime, Duration, Utc};
use clap::Args;
use pharmacy_ops::backend::memory::{
    InMemoryBlobStore, InMemoryIdentityProvider, InMemoryRecordStore,
};
use pharmacy_ops::config::DashboardConfig;
use pharmacy_ops::error::AppError;
use pharmacy_ops::workflows::clock::{Clock, SystemClock};
use pharmacy_ops::workflows::export::{
    attendance_report, dated_file_name, export_records, leave_balance_report, license_report,
    ExportFile, ExportOutcome,
};
use pharmacy_ops::workflows::licenses::{
    empty_state_message, format_expiry, partition, renewal_notices, search, Attachment, License,
    LicenseCsvImporter, LicenseForm, LicenseService,
};
use pharmacy_ops::workflows::session::{DashboardView, SessionController};
use pharmacy_ops::workflows::staff::{
    AttendanceStatus, LeaveCategory, LeaveForm, StaffForm, StaffService,
};
use pharmacy_ops::workflows::{Confirmation, DashboardError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct LicenseReportArgs {
    /// License CSV export (Name, Expiry Date, License Number, Issuing Authority, Notes)
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Reference instant (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_instant)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Write the classified license list to this CSV file
    #[arg(long)]
    pub(crate) export: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Directory to write the demo's CSV reports into
    #[arg(long)]
    pub(crate) out_dir: Option<PathBuf>,
}

pub(crate) fn run_license_report(args: LicenseReportArgs) -> Result<(), AppError> {
    let LicenseReportArgs { csv, now, export } = args;

    let now = now.unwrap_or_else(Utc::now);
    let licenses = LicenseCsvImporter::from_path(&csv)?;
    render_license_report(&licenses, now);

    if let Some(path) = export {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| dated_file_name("licenses", now.date_naive()));
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        write_export(license_report(&file_name, now, &licenses)?, dir)?;
    }

    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { out_dir } = args;
    let clock = SystemClock;
    let now = clock.now();
    let today = clock.today();
    let config = DashboardConfig::default();

    println!("Pharmacy operations demo");
    let store = Arc::new(InMemoryRecordStore::default());
    let blobs = Arc::new(InMemoryBlobStore::default());
    let identity = Arc::new(InMemoryIdentityProvider::default());
    let mut controller = SessionController::new(identity, store.clone(), config.app_id.clone());

    let scope = controller
        .sign_up("owner@demo-pharmacy.in", "demo-pass")
        .await?
        .scope()
        .clone();
    println!("- Signed in as owner@demo-pharmacy.in ({})", scope.user_id);

    let licenses = LicenseService::new(store.clone(), blobs, scope.clone());
    let mut held: Vec<License> = Vec::new();
    for (name, offset_days, number, authority, attachment) in [
        ("Drug License (Retail)", -3, "DL-20B-1142", "State Drug Controller", None),
        (
            "FSSAI Registration",
            12,
            "FSSAI-2071",
            "Food Safety Authority",
            Some("fssai.pdf"),
        ),
        ("Trade License", 180, "TL-88", "Municipal Corporation", None),
    ] {
        let form = LicenseForm {
            name: name.to_string(),
            expiry_date: (now + Duration::days(offset_days))
                .format("%Y-%m-%d")
                .to_string(),
            license_number: number.to_string(),
            issuing_authority: authority.to_string(),
            notes: String::new(),
            attachment: attachment.map(|file_name: &str| Attachment {
                file_name: file_name.to_string(),
                bytes: b"%PDF-1.4 demo".to_vec(),
            }),
        };
        let license = licenses.add(form, &held).await?;
        held.push(license);
    }

    let duplicate = licenses
        .add(
            LicenseForm {
                name: "trade license".to_string(),
                expiry_date: today.format("%Y-%m-%d").to_string(),
                ..LicenseForm::default()
            },
            &held,
        )
        .await;
    if let Err(DashboardError::Validation(err)) = duplicate {
        println!("- Duplicate add rejected: {err}");
    }

    let staff = StaffService::new(store.clone(), scope.clone(), config.clone());
    let mut roster = Vec::new();
    for (name, store_name, cl, sl, el) in [
        ("Ritu Sharma", "Main Store", 2, 6, 12),
        ("Mohan Lal", "Branch Store", 8, 6, 12),
    ] {
        roster.push(
            staff
                .add_staff(StaffForm {
                    name: name.to_string(),
                    store: store_name.to_string(),
                    total_cl: cl,
                    total_sl: sl,
                    total_el: el,
                })
                .await?,
        );
    }

    for (member, category, start, end) in [
        (&roster[0], LeaveCategory::Casual, 20, 18),
        (&roster[0], LeaveCategory::Casual, 9, 9),
        (&roster[0], LeaveCategory::Casual, 2, 2),
        (&roster[1], LeaveCategory::Sick, 5, 4),
    ] {
        staff
            .record_leave(
                LeaveForm {
                    staff_id: member.id.clone(),
                    leave_type: category.code().to_string(),
                    start_date: (today - Duration::days(start)).to_string(),
                    end_date: (today - Duration::days(end)).to_string(),
                    reason: "demo".to_string(),
                },
                &roster,
            )
            .await?;
    }

    staff
        .mark_attendance(today, &roster[0].id, AttendanceStatus::Present, &roster)
        .await?;

    let session = controller
        .session()
        .ok_or_else(|| std::io::Error::other("demo session closed unexpectedly"))?;
    let view = session.view(&clock, config.leave_units);
    render_dashboard(&view);

    let expired = partition(now, &held)
        .expired
        .into_iter()
        .next()
        .cloned();
    if let Some(expired) = expired {
        let renewed = licenses
            .renew(
                &expired.id,
                LicenseForm {
                    name: expired.name.clone(),
                    expiry_date: (now + Duration::days(365)).format("%Y-%m-%d").to_string(),
                    license_number: expired.license_number.clone(),
                    issuing_authority: expired.issuing_authority.clone(),
                    ..LicenseForm::default()
                },
                &held,
            )
            .await?;
        println!(
            "\n- Renewed \"{}\" until {}",
            renewed.name,
            format_expiry(renewed.expiry_date)
        );
    }

    let snapshot = session.snapshot();
    let view = session.view(&clock, config.leave_units);
    println!(
        "- After renewal: {} expired, {} expiring soon",
        view.expired, view.expiring_soon
    );

    if let Some(dir) = out_dir {
        println!("\nExports");
        write_export(
            license_report(&dated_file_name("licenses", today), now, &snapshot.licenses)?,
            &dir,
        )?;
        write_export(
            leave_balance_report(&dated_file_name("leave-balances", today), &view.leave)?,
            &dir,
        )?;
        write_export(
            attendance_report(&dated_file_name("attendance", today), &view.attendance)?,
            &dir,
        )?;
        write_export(
            export_records(&dated_file_name("leave-records", today), &snapshot.leave_records, None)?,
            &dir,
        )?;
        write_export(
            export_records(&dated_file_name("admins", today), &snapshot.admins, None)?,
            &dir,
        )?;
    }

    if let Some(member) = roster.first() {
        staff.delete_staff(&member.id, Confirmation::Declined).await?;
    }
    controller.sign_out().await?;
    println!("\n- Signed out; subscriptions released");
    Ok(())
}

fn render_license_report(licenses: &[License], now: DateTime<Utc>) {
    println!("License expiry report ({})", now.format("%Y-%m-%d %H:%M UTC"));
    let listed = search(licenses, "");
    if listed.is_empty() {
        println!("  {}", empty_state_message(0));
        return;
    }

    let buckets = partition(now, licenses);
    println!(
        "- {} licenses | {} expired | {} expiring within 30 days",
        licenses.len(),
        buckets.expired.len(),
        buckets.expiring_soon.len()
    );
    for license in listed {
        println!(
            "  - {} | expires {} | {}",
            license.name,
            format_expiry(license.expiry_date),
            if license.license_number.is_empty() {
                "no number on file"
            } else {
                license.license_number.as_str()
            }
        );
    }

    let notices = renewal_notices(now, licenses);
    if !notices.is_empty() {
        println!("Renewal notices:");
        for notice in notices {
            println!("  ! {}", notice.message);
        }
    }
}

fn render_dashboard(view: &DashboardView) {
    println!("\nDashboard ({})", view.today);
    println!(
        "- Licenses: {} tracked | {} expired | {} expiring soon",
        view.licenses.len(),
        view.expired,
        view.expiring_soon
    );
    for notice in &view.notices {
        println!("  ! {}", notice.message);
    }

    println!("- Leave balances:");
    for entry in &view.leave.balances {
        let summary: Vec<String> = LeaveCategory::ordered()
            .into_iter()
            .map(|category| {
                let balance = entry.get(category);
                format!(
                    "{} {}/{} (bal {})",
                    category.code(),
                    balance.taken,
                    balance.total,
                    balance.balance
                )
            })
            .collect();
        println!("  - {} [{}]: {}", entry.staff_name, entry.store, summary.join(" | "));
    }

    let day = &view.attendance;
    println!(
        "- Attendance: {} present | {} absent | {} on leave | {} not marked",
        day.present, day.absent, day.on_leave, day.not_marked
    );
    for entry in &day.entries {
        println!("  - {}: {}", entry.staff_name, entry.status_label);
    }
}

fn write_export(outcome: ExportOutcome, dir: &Path) -> Result<(), AppError> {
    match outcome {
        ExportOutcome::Exported(file) => {
            let path = ExportFile::write_to(&file, dir)?;
            println!("  - wrote {}", path.display());
        }
        other @ ExportOutcome::NothingToExport => println!("  - {}", other.message()),
    }
    Ok(())
}
