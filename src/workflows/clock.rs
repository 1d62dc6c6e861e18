use chrono::{DateTime, Local, NaiveDate, Utc};

/// Source of "now" for classification and of the tenant-local calendar day.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate;

    /// Time left before `today` changes, or `None` if it never does.
    fn until_next_day(&self) -> Option<std::time::Duration>;
}

/// Wall clock; days follow the host's local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn until_next_day(&self) -> Option<std::time::Duration> {
        Some(until_next_local_midnight(Local::now()))
    }
}

/// Clock pinned to one instant; `today` is that instant's UTC date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }

    fn today(&self) -> NaiveDate {
        self.0.date_naive()
    }

    fn until_next_day(&self) -> Option<std::time::Duration> {
        None
    }
}

/// How long until the next local midnight, when day-based views go stale.
fn until_next_local_midnight(now: DateTime<Local>) -> std::time::Duration {
    let tomorrow = now.date_naive().succ_opt().unwrap_or(now.date_naive());
    let midnight = tomorrow
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(Local).earliest());

    match midnight {
        Some(next) if next > now => (next - now)
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(60)),
        _ => std::time::Duration::from_secs(60),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_reports_its_instant() {
        let instant = Utc.with_ymd_and_hms(2025, 10, 1, 9, 30, 0).unwrap();
        let clock = FixedClock(instant);
        assert_eq!(clock.now(), instant);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());
        assert_eq!(clock.until_next_day(), None);
    }

    #[test]
    fn next_midnight_is_within_a_day() {
        let wait = until_next_local_midnight(Local::now());
        assert!(wait <= std::time::Duration::from_secs(25 * 60 * 60));
        assert!(wait > std::time::Duration::ZERO);

        let wait = SystemClock.until_next_day().expect("wall clock rolls over");
        assert!(wait <= std::time::Duration::from_secs(25 * 60 * 60));
    }
}
