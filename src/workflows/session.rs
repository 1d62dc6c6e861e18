//! Signed-in dashboard sessions.
//!
//! A [`DashboardSession`] owns one live subscription per tenant collection and
//! derives a [`DashboardView`] from the latest snapshots. The
//! [`SessionController`] opens a session on sign-in and releases it before
//! signing out, so no subscription outlives the identity that scoped it.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::clock::Clock;
use super::licenses::{partition, renewal_notices, search, License, LicenseListingView, LicenseNotice};
use super::records::decode_all;
use super::staff::{
    Admin, AttendanceDay, AttendanceSnapshot, LeaveLedger, LeaveRecord, LeaveUnitPolicy,
    StaffMember,
};
use super::{DashboardError, ValidationError};
use crate::backend::{
    Collection, Document, IdentityProvider, RecordStore, StoreError, Subscription, TenantScope,
    UserIdentity,
};

const CREDENTIALS_REQUIRED: &str = "Email and password are required.";
const RESET_EMAIL_REQUIRED: &str = "Please enter your email address to reset your password.";

/// Decoded contents of every tenant collection at one point in time.
#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    pub licenses: Vec<License>,
    pub staff: Vec<StaffMember>,
    pub leave_records: Vec<LeaveRecord>,
    pub attendance: Vec<Document>,
    pub admins: Vec<Admin>,
}

/// Everything the dashboard renders, derived from one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub generated_at: DateTime<Utc>,
    pub today: NaiveDate,
    pub licenses: Vec<LicenseListingView>,
    pub expired: usize,
    pub expiring_soon: usize,
    pub notices: Vec<LicenseNotice>,
    pub leave: LeaveLedger,
    pub attendance: AttendanceDay,
    pub admins: Vec<Admin>,
}

impl DashboardView {
    pub fn build(
        snapshot: &DashboardSnapshot,
        now: DateTime<Utc>,
        today: NaiveDate,
        policy: LeaveUnitPolicy,
    ) -> Self {
        let buckets = partition(now, &snapshot.licenses);
        let licenses = search(&snapshot.licenses, "")
            .into_iter()
            .map(|license| LicenseListingView::from_license(now, license))
            .collect();

        Self {
            generated_at: now,
            today,
            licenses,
            expired: buckets.expired.len(),
            expiring_soon: buckets.expiring_soon.len(),
            notices: renewal_notices(now, &snapshot.licenses),
            leave: LeaveLedger::compute(&snapshot.staff, &snapshot.leave_records, policy),
            attendance: AttendanceSnapshot::for_date(&snapshot.attendance, today)
                .summarize(&snapshot.staff),
            admins: snapshot.admins.clone(),
        }
    }
}

#[derive(Clone)]
struct Feeds {
    licenses: Subscription,
    staff: Subscription,
    leave_records: Subscription,
    attendance: Subscription,
    admins: Subscription,
}

impl Feeds {
    fn open<S: RecordStore + ?Sized>(store: &S, scope: &TenantScope) -> Result<Self, StoreError> {
        Ok(Self {
            licenses: store.subscribe(&scope.collection(Collection::Licenses))?,
            staff: store.subscribe(&scope.collection(Collection::Staff))?,
            leave_records: store.subscribe(&scope.collection(Collection::LeaveRecords))?,
            attendance: store.subscribe(&scope.collection(Collection::Attendance))?,
            admins: store.subscribe(&scope.collection(Collection::Admins))?,
        })
    }

    fn snapshot(&mut self) -> DashboardSnapshot {
        DashboardSnapshot {
            licenses: decode_all(&self.licenses.latest()),
            staff: decode_all(&self.staff.latest()),
            leave_records: decode_all(&self.leave_records.latest()),
            attendance: self.attendance.latest().as_ref().clone(),
            admins: decode_all(&self.admins.latest()),
        }
    }

    /// Resolves once any collection has pushed a snapshot not yet seen.
    async fn changed(&mut self) -> Result<(), StoreError> {
        tokio::select! {
            result = self.licenses.changed() => result,
            result = self.staff.changed() => result,
            result = self.leave_records.changed() => result,
            result = self.attendance.changed() => result,
            result = self.admins.changed() => result,
        }
    }
}

/// Live view over one tenant's collections.
pub struct DashboardSession {
    user: UserIdentity,
    scope: TenantScope,
    feeds: Feeds,
    watcher: Option<JoinHandle<()>>,
}

impl DashboardSession {
    pub fn open<S: RecordStore + ?Sized>(
        store: &S,
        app_id: &str,
        user: UserIdentity,
    ) -> Result<Self, StoreError> {
        let scope = TenantScope::new(app_id, user.uid.clone());
        let feeds = Feeds::open(store, &scope)?;
        info!(uid = %user.uid, "dashboard session opened");
        Ok(Self {
            user,
            scope,
            feeds,
            watcher: None,
        })
    }

    pub fn user(&self) -> &UserIdentity {
        &self.user
    }

    pub fn scope(&self) -> &TenantScope {
        &self.scope
    }

    pub fn snapshot(&mut self) -> DashboardSnapshot {
        self.feeds.snapshot()
    }

    pub fn view<C: Clock + ?Sized>(&mut self, clock: &C, policy: LeaveUnitPolicy) -> DashboardView {
        DashboardView::build(&self.feeds.snapshot(), clock.now(), clock.today(), policy)
    }

    /// Publishes a fresh view whenever a collection changes and whenever the
    /// clock's day rolls over, so day-based classifications update without
    /// new data.
    ///
    /// Replaces any watcher started earlier. The task stops when the session
    /// is closed or dropped.
    pub fn watch_views<C>(&mut self, clock: C, policy: LeaveUnitPolicy) -> watch::Receiver<DashboardView>
    where
        C: Clock + 'static,
    {
        self.stop_watcher();

        let mut feeds = self.feeds.clone();
        let initial = DashboardView::build(&feeds.snapshot(), clock.now(), clock.today(), policy);
        let (sender, receiver) = watch::channel(initial);
        let uid = self.user.uid.clone();

        self.watcher = Some(tokio::spawn(async move {
            loop {
                let rollover = clock.until_next_day();
                tokio::select! {
                    result = feeds.changed() => {
                        if let Err(err) = result {
                            debug!(uid = %uid, error = %err, "view watcher stopped");
                            break;
                        }
                    }
                    _ = day_rollover(rollover) => {
                        debug!(uid = %uid, "day rolled over; recomputing view");
                    }
                }

                let view =
                    DashboardView::build(&feeds.snapshot(), clock.now(), clock.today(), policy);
                if sender.send(view).is_err() {
                    break;
                }
            }
        }));
        receiver
    }

    /// Stops the view watcher and releases every subscription.
    pub async fn close(mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
            let _ = watcher.await;
        }
        info!(uid = %self.user.uid, "dashboard session closed");
    }

    fn stop_watcher(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

impl Drop for DashboardSession {
    fn drop(&mut self) {
        self.stop_watcher();
    }
}

/// Owns the sign-in lifecycle and the session it scopes.
pub struct SessionController<I, S> {
    identity: Arc<I>,
    store: Arc<S>,
    app_id: String,
    session: Option<DashboardSession>,
}

impl<I, S> SessionController<I, S>
where
    I: IdentityProvider + 'static,
    S: RecordStore + 'static,
{
    pub fn new(identity: Arc<I>, store: Arc<S>, app_id: impl Into<String>) -> Self {
        Self {
            identity,
            store,
            app_id: app_id.into(),
            session: None,
        }
    }

    pub fn session(&mut self) -> Option<&mut DashboardSession> {
        self.session.as_mut()
    }

    pub fn current_user(&self) -> Option<&UserIdentity> {
        self.session.as_ref().map(DashboardSession::user)
    }

    pub async fn sign_up(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<&mut DashboardSession, DashboardError> {
        require_credentials(email, password)?;
        self.close_session().await;
        let user = self.identity.sign_up(email.trim(), password).await?;
        self.open_session(user)
    }

    pub async fn sign_in(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<&mut DashboardSession, DashboardError> {
        require_credentials(email, password)?;
        self.close_session().await;
        let user = self.identity.sign_in(email.trim(), password).await?;
        self.open_session(user)
    }

    /// Releases the session's subscriptions, then signs out.
    pub async fn sign_out(&mut self) -> Result<(), DashboardError> {
        self.close_session().await;
        self.identity.sign_out().await?;
        Ok(())
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<(), DashboardError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ValidationError::MissingFields(RESET_EMAIL_REQUIRED).into());
        }
        self.identity.send_password_reset(email).await?;
        info!("password reset requested");
        Ok(())
    }

    fn open_session(&mut self, user: UserIdentity) -> Result<&mut DashboardSession, DashboardError> {
        let session = DashboardSession::open(self.store.as_ref(), &self.app_id, user)?;
        Ok(self.session.insert(session))
    }

    async fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }
}

fn require_credentials(email: &str, password: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ValidationError::MissingFields(CREDENTIALS_REQUIRED));
    }
    Ok(())
}

async fn day_rollover(wait: Option<std::time::Duration>) {
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{InMemoryBlobStore, InMemoryIdentityProvider, InMemoryRecordStore};
    use crate::backend::{Fields, IdentityError};
    use crate::config::DashboardConfig;
    use crate::workflows::clock::FixedClock;
    use crate::workflows::licenses::{ExpiryStatus, LicenseForm, LicenseService};
    use crate::workflows::staff::{AttendanceStatus, LeaveForm, StaffForm, StaffService};
    use chrono::TimeZone;
    use serde_json::json;
    use std::time::Duration;

    type Controller = SessionController<InMemoryIdentityProvider, InMemoryRecordStore>;

    fn controller() -> (Controller, Arc<InMemoryRecordStore>) {
        let store = Arc::new(InMemoryRecordStore::default());
        let identity = Arc::new(InMemoryIdentityProvider::default());
        (
            SessionController::new(identity, store.clone(), "default-app-id"),
            store,
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 14, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn sign_in_requires_credentials() {
        let (mut controller, _) = controller();
        let result = controller.sign_in("", "secret").await;
        assert!(matches!(
            result,
            Err(DashboardError::Validation(ValidationError::MissingFields(_)))
        ));

        let result = controller.sign_in("nobody@pharmacy.in", "secret").await;
        assert!(matches!(
            result,
            Err(DashboardError::Identity(IdentityError::InvalidCredentials))
        ));
        assert!(controller.current_user().is_none());
    }

    #[tokio::test]
    async fn password_reset_needs_an_email() {
        let (controller, _) = controller();
        match controller.send_password_reset("   ").await {
            Err(DashboardError::Validation(error)) => assert_eq!(
                error.to_string(),
                "Please enter your email address to reset your password."
            ),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sign_out_releases_every_subscription() {
        let (mut controller, store) = controller();
        let scope = controller
            .sign_up("owner@pharmacy.in", "secret-pass")
            .await
            .expect("signed up")
            .scope()
            .clone();
        for collection in Collection::ordered() {
            assert_eq!(store.active_subscriptions(&scope.collection(collection)), 1);
        }

        let session = controller.session().expect("session open");
        let _views = session.watch_views(FixedClock(now()), LeaveUnitPolicy::PerRecord);
        for collection in Collection::ordered() {
            assert_eq!(store.active_subscriptions(&scope.collection(collection)), 2);
        }

        controller.sign_out().await.expect("signed out");
        assert!(controller.current_user().is_none());
        for collection in Collection::ordered() {
            assert_eq!(store.active_subscriptions(&scope.collection(collection)), 0);
        }
    }

    #[tokio::test]
    async fn views_follow_writes() {
        let (mut controller, store) = controller();
        let session = controller
            .sign_up("owner@pharmacy.in", "secret-pass")
            .await
            .expect("signed up");
        let scope = session.scope().clone();
        let mut views = session.watch_views(FixedClock(now()), LeaveUnitPolicy::PerRecord);
        assert!(views.borrow().licenses.is_empty());

        let licenses = LicenseService::new(
            store.clone(),
            Arc::new(InMemoryBlobStore::default()),
            scope.clone(),
        );
        licenses
            .add(
                LicenseForm {
                    name: "Drug License".to_string(),
                    expiry_date: "2025-10-20".to_string(),
                    ..LicenseForm::default()
                },
                &[],
            )
            .await
            .expect("license added");

        tokio::time::timeout(Duration::from_secs(5), views.changed())
            .await
            .expect("view published in time")
            .expect("watcher alive");
        let view = views.borrow_and_update().clone();
        assert_eq!(view.licenses.len(), 1);
        assert_eq!(view.expiring_soon, 1);
        assert_eq!(
            view.notices[0].message,
            "\"Drug License\" will expire on 2025-10-20. Don't forget to renew."
        );
    }

    /// Pinned instant whose day is always about to end.
    struct RollingClock(DateTime<Utc>);

    impl Clock for RollingClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }

        fn today(&self) -> NaiveDate {
            self.0.date_naive()
        }

        fn until_next_day(&self) -> Option<Duration> {
            Some(Duration::from_millis(10))
        }
    }

    #[tokio::test]
    async fn views_refresh_when_the_clock_day_ends() {
        let (mut controller, _) = controller();
        let session = controller
            .sign_up("owner@pharmacy.in", "secret-pass")
            .await
            .expect("signed up");
        let mut views = session.watch_views(RollingClock(now()), LeaveUnitPolicy::PerRecord);

        tokio::time::timeout(Duration::from_secs(5), views.changed())
            .await
            .expect("rollover published without any write")
            .expect("watcher alive");
    }

    #[tokio::test]
    async fn fixed_clock_views_only_change_on_writes() {
        let (mut controller, _) = controller();
        let session = controller
            .sign_up("owner@pharmacy.in", "secret-pass")
            .await
            .expect("signed up");
        let mut views = session.watch_views(FixedClock(now()), LeaveUnitPolicy::PerRecord);

        let waited = tokio::time::timeout(Duration::from_millis(200), views.changed()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn view_combines_every_collection() {
        let (mut controller, store) = controller();
        let scope = controller
            .sign_up("owner@pharmacy.in", "secret-pass")
            .await
            .expect("signed up")
            .scope()
            .clone();

        let staff_service = StaffService::new(store.clone(), scope, DashboardConfig::default());
        let member = staff_service
            .add_staff(StaffForm {
                name: "Ritu".to_string(),
                store: "Main Store".to_string(),
                total_cl: 2,
                ..StaffForm::default()
            })
            .await
            .expect("staff added");
        let roster = vec![member.clone()];
        staff_service
            .record_leave(
                LeaveForm {
                    staff_id: member.id.clone(),
                    leave_type: "CL".to_string(),
                    start_date: "2025-10-10".to_string(),
                    end_date: "2025-10-12".to_string(),
                    reason: String::new(),
                },
                &roster,
            )
            .await
            .expect("leave recorded");
        staff_service
            .mark_attendance(now().date_naive(), &member.id, AttendanceStatus::Present, &roster)
            .await
            .expect("attendance marked");

        let session = controller.session().expect("session open");
        let view = session.view(&FixedClock(now()), LeaveUnitPolicy::PerRecord);
        let balance = view.leave.for_staff(&member.id).expect("balance");
        assert_eq!(balance.casual.balance, 1);
        assert_eq!(view.attendance.present, 1);
        assert_eq!(view.attendance.not_marked, 0);
    }

    fn fields(value: serde_json::Value) -> Fields {
        match value {
            serde_json::Value::Object(map) => map,
            _ => Fields::new(),
        }
    }

    #[tokio::test]
    async fn unreadable_dates_stay_on_the_dashboard() {
        let (mut controller, store) = controller();
        let scope = controller
            .sign_up("owner@pharmacy.in", "secret-pass")
            .await
            .expect("signed up")
            .scope()
            .clone();

        let licenses = scope.collection(Collection::Licenses);
        for (name, expiry) in [("Drug License", "31/03/2026"), ("FSSAI", "2025-10-20")] {
            store
                .insert(&licenses, fields(json!({ "name": name, "expiryDate": expiry })))
                .await
                .expect("license written");
        }
        let staff_id = store
            .insert(
                &scope.collection(Collection::Staff),
                fields(json!({ "name": "Ritu", "store": "Main Store", "totalCL": 2 })),
            )
            .await
            .expect("staff written");
        for date in ["2025-10-01", ""] {
            store
                .insert(
                    &scope.collection(Collection::LeaveRecords),
                    fields(json!({
                        "staffId": staff_id.as_str(),
                        "staffName": "Ritu",
                        "leaveType": "CL",
                        "startDate": date,
                        "endDate": date
                    })),
                )
                .await
                .expect("leave written");
        }

        let session = controller.session().expect("session open");
        let view = session.view(&FixedClock(now()), LeaveUnitPolicy::PerRecord);
        let listed: Vec<(&str, ExpiryStatus)> = view
            .licenses
            .iter()
            .map(|license| (license.name.as_str(), license.status))
            .collect();
        assert_eq!(
            listed,
            vec![
                ("FSSAI", ExpiryStatus::ExpiringSoon),
                ("Drug License", ExpiryStatus::Unscheduled),
            ]
        );
        assert_eq!(view.expired, 0);
        assert_eq!(view.expiring_soon, 1);

        let casual = view
            .leave
            .for_staff(staff_id.as_str())
            .expect("balance")
            .casual;
        assert_eq!(casual.taken, 2);
        assert_eq!(casual.balance, 0);
    }

    #[test]
    fn unknown_day_starts_not_marked() {
        let snapshot = DashboardSnapshot {
            staff: vec![StaffMember {
                id: "s1".to_string(),
                name: "Ritu".to_string(),
                store: "Main Store".to_string(),
                total_cl: 0,
                total_sl: 0,
                total_el: 0,
            }],
            ..DashboardSnapshot::default()
        };
        let view = DashboardView::build(
            &snapshot,
            now(),
            now().date_naive(),
            LeaveUnitPolicy::PerRecord,
        );
        assert_eq!(view.attendance.not_marked, 1);
        assert!(view.notices.is_empty());
    }
}
