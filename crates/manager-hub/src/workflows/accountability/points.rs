use chrono::{Duration, NaiveDate};
use serde::Serialize;

use super::domain::{EmployeeId, Infraction, EXPIRATION_WINDOW_DAYS, POINT_FLOOR};
use super::repository::{RecordStore, RepositoryError};

/// Rolling-window view of an employee's standing on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointSummary {
    pub employee_id: EmployeeId,
    pub as_of: NaiveDate,
    pub total_points: i32,
    /// Soonest-to-expire first.
    pub active_infractions: Vec<Infraction>,
    pub expired_infractions: Vec<Infraction>,
    pub next_expiration_date: Option<NaiveDate>,
}

impl PointSummary {
    pub fn empty(employee_id: EmployeeId, as_of: NaiveDate) -> Self {
        Self {
            employee_id,
            as_of,
            total_points: 0,
            active_infractions: Vec::new(),
            expired_infractions: Vec::new(),
            next_expiration_date: None,
        }
    }

    pub fn days_until_next_expiration(&self) -> Option<i64> {
        self.next_expiration_date
            .map(|date| days_until(date, self.as_of))
    }
}

/// Earliest incident date still inside the window on `as_of`.
pub fn window_start(as_of: NaiveDate) -> NaiveDate {
    as_of
        .checked_sub_signed(Duration::days(EXPIRATION_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MIN)
}

/// Partition contributing infractions into active and expired and total the active ones.
pub fn summarize(
    employee_id: &EmployeeId,
    infractions: &[Infraction],
    as_of: NaiveDate,
) -> PointSummary {
    let cutoff = window_start(as_of);

    let (mut active, mut expired): (Vec<Infraction>, Vec<Infraction>) = infractions
        .iter()
        .filter(|record| &record.employee_id == employee_id && record.contributes())
        .cloned()
        .partition(|record| record.date >= cutoff);

    active.sort_by(|a, b| {
        a.expiration_date
            .cmp(&b.expiration_date)
            .then_with(|| a.entry_timestamp.cmp(&b.entry_timestamp))
    });
    expired.sort_by(|a, b| b.date.cmp(&a.date));

    let raw_total: i64 = active.iter().map(|record| i64::from(record.points)).sum();
    let next_expiration_date = active.first().map(|record| record.expiration_date);

    PointSummary {
        employee_id: employee_id.clone(),
        as_of,
        total_points: floored(raw_total),
        active_infractions: active,
        expired_infractions: expired,
        next_expiration_date,
    }
}

/// Load an employee's history from the store and summarize it. Unknown employees
/// summarize to zero.
pub fn calculate_points<S>(
    store: &S,
    employee_id: &EmployeeId,
    as_of: NaiveDate,
) -> Result<PointSummary, RepositoryError>
where
    S: RecordStore + ?Sized,
{
    let history = store.list_infractions_by_employee(employee_id)?;
    if history.is_empty() {
        return Ok(PointSummary::empty(employee_id.clone(), as_of));
    }
    Ok(summarize(employee_id, &history, as_of))
}

/// Peak running total across the employee's history.
///
/// Accumulates contributing points in incident-date order with the floor applied at
/// each step. Expirations are not replayed, so an employee whose points aged out
/// between incidents reports a higher peak than they ever held.
pub fn highest_points_ever(infractions: &[Infraction]) -> i32 {
    let mut ordered: Vec<&Infraction> = infractions
        .iter()
        .filter(|record| record.contributes())
        .collect();
    ordered.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.entry_timestamp.cmp(&b.entry_timestamp))
    });

    let mut running: i64 = 0;
    let mut peak: i64 = 0;
    for record in ordered {
        running = i64::from(floored(running + i64::from(record.points)));
        peak = peak.max(running);
    }
    floored(peak)
}

/// Apply the floor and saturate at `i32::MAX`.
fn floored(total: i64) -> i32 {
    i32::try_from(total.max(i64::from(POINT_FLOOR))).unwrap_or(i32::MAX)
}

pub fn days_until(date: NaiveDate, from: NaiveDate) -> i64 {
    (date - from).num_days()
}
