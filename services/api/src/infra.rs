use chrono::NaiveDate;
use manager_hub::workflows::accountability::{
    Employee, EmployeeId, EmployeeStatus, InMemoryChannel, InMemoryRecordStore,
    NotificationChannel, NotificationError, RepositoryError, SystemRole,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Outbox used until a mail relay is wired in; every message is logged and retained.
#[derive(Default, Clone)]
pub(crate) struct LoggedOutbox {
    outbox: InMemoryChannel,
}

impl LoggedOutbox {
    pub(crate) fn outbox(&self) -> &InMemoryChannel {
        &self.outbox
    }
}

impl NotificationChannel for LoggedOutbox {
    fn send(
        &self,
        recipients: &[String],
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<(), NotificationError> {
        info!(
            recipients = %recipients.join(", "),
            subject,
            "outbound email queued"
        );
        self.outbox.send(recipients, subject, html_body, text_body)
    }
}

/// Sample roster covering every visibility class.
pub(crate) fn sample_roster() -> Vec<Employee> {
    let row = |id: &str, name: &str, location: &str, role: Option<SystemRole>| Employee {
        employee_id: EmployeeId(id.to_string()),
        full_name: name.to_string(),
        primary_location: location.to_string(),
        status: EmployeeStatus::Active,
        system_role: role,
    };

    vec![
        row("10482", "Jordan Reyes", "Downtown", None),
        row("10517", "Taylor Brooks", "Riverside", None),
        row("10533", "Sam Okafor", "Airport", None),
        row("20011", "Casey Lin", "Downtown", Some(SystemRole::Manager)),
        row("30002", "Avery Stone", "Riverside", Some(SystemRole::Director)),
        row("90001", "Riley Quinn", "Downtown", Some(SystemRole::Operator)),
    ]
}

pub(crate) fn seeded_store() -> Result<InMemoryRecordStore, RepositoryError> {
    let store = InMemoryRecordStore::default();
    for employee in sample_roster() {
        store.upsert_employee(employee)?;
    }
    Ok(store)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use manager_hub::workflows::accountability::RecordStore;

    #[test]
    fn seeded_store_holds_the_sample_roster() {
        let store = seeded_store().expect("store seeds");
        let employees = store.list_employees().expect("roster");
        assert_eq!(employees.len(), sample_roster().len());
    }

    #[test]
    fn logged_outbox_retains_messages() {
        let outbox = LoggedOutbox::default();
        outbox
            .send(&["ops@hub.test".to_string()], "Subject", "<p>x</p>", "x")
            .expect("send");
        assert_eq!(outbox.outbox().sent().len(), 1);
    }

    #[test]
    fn parse_date_reports_bad_input() {
        assert!(parse_date("2026-03-16").is_ok());
        assert!(parse_date("03/16/2026").is_err());
    }
}
