use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use axum::response::Response;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::config::AccountabilityConfig;
use crate::workflows::accountability::domain::{
    expiration_for, EditLogEntry, Employee, EmployeeId, EmployeeStatus, Infraction, InfractionId,
    InfractionPatch, InfractionStatus, LogId, SendLogEntry, SystemRole, TerminationRecord,
};
use crate::workflows::accountability::lifecycle::InfractionSubmission;
use crate::workflows::accountability::memory::{InMemoryChannel, InMemoryRecordStore};
use crate::workflows::accountability::notification::NoPause;
use crate::workflows::accountability::repository::{FixedClock, RecordStore, RepositoryError};
use crate::workflows::accountability::service::AccountabilityService;
use crate::workflows::accountability::settings::Settings;

pub(super) const HOURLY: &str = "E100";
pub(super) const MANAGER: &str = "E200";
pub(super) const DIRECTOR: &str = "E300";
pub(super) const OPERATOR: &str = "E400";
pub(super) const INACTIVE: &str = "E500";

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 16).expect("valid date")
}

pub(super) fn days_ago(days: i64) -> NaiveDate {
    today() - Duration::days(days)
}

pub(super) fn clock() -> FixedClock {
    FixedClock::on(today())
}

/// Narrative text comfortably past the minimum length.
pub(super) fn narrative(topic: &str) -> String {
    let mut text = format!("{topic}. ");
    while text.chars().count() < 260 {
        text.push_str("Observed on shift and confirmed with the closing manager before entry. ");
    }
    text
}

pub(super) fn config() -> AccountabilityConfig {
    AccountabilityConfig {
        operations_email: "ops@hub.test".to_string(),
        escalation_emails: vec!["director@hub.test".to_string(), "hr@hub.test".to_string()],
        admin_email: "admin@hub.test".to_string(),
        backdate_limit_days: 7,
        email_retry_delay: StdDuration::from_millis(2_000),
    }
}

pub(super) fn employee(id: &str, name: &str, role: Option<SystemRole>) -> Employee {
    Employee {
        employee_id: EmployeeId(id.to_string()),
        full_name: name.to_string(),
        primary_location: "Downtown".to_string(),
        status: EmployeeStatus::Active,
        system_role: role,
    }
}

pub(super) fn roster() -> Vec<Employee> {
    let mut inactive = employee(INACTIVE, "Morgan Pike", None);
    inactive.status = EmployeeStatus::Inactive;
    vec![
        employee(HOURLY, "Jordan Reyes", None),
        employee(MANAGER, "Casey Lin", Some(SystemRole::Manager)),
        employee(DIRECTOR, "Avery Stone", Some(SystemRole::Director)),
        employee(OPERATOR, "Riley Quinn", Some(SystemRole::Operator)),
        inactive,
    ]
}

pub(super) fn seeded_store() -> Arc<InMemoryRecordStore> {
    let store = InMemoryRecordStore::with_settings(Settings::standard());
    for row in roster() {
        store.upsert_employee(row).expect("seed employee");
    }
    Arc::new(store)
}

pub(super) fn build_service() -> (
    AccountabilityService<InMemoryRecordStore, InMemoryChannel>,
    Arc<InMemoryRecordStore>,
    Arc<InMemoryChannel>,
) {
    let store = seeded_store();
    let channel = Arc::new(InMemoryChannel::default());
    let service = AccountabilityService::with_runtime(
        store.clone(),
        channel.clone(),
        &config(),
        Arc::new(clock()),
        Arc::new(NoPause),
    );
    (service, store, channel)
}

pub(super) fn submission(employee_id: &str, infraction_type: &str) -> InfractionSubmission {
    InfractionSubmission {
        employee_id: employee_id.to_string(),
        date: Some(days_ago(1)),
        infraction_type: infraction_type.to_string(),
        points: None,
        description: narrative("Arrived after the line check without calling ahead"),
        location: "Downtown".to_string(),
        entered_by: "casey.lin@hub.test".to_string(),
    }
}

/// Write a historical record straight into the store, bypassing backdate checks.
pub(super) fn seed_infraction(
    store: &InMemoryRecordStore,
    employee_id: &str,
    suffix: u32,
    date: NaiveDate,
    points: i32,
) -> Infraction {
    let record = Infraction {
        infraction_id: InfractionId(format!("INF-{}-{suffix:04}", date.format("%Y%m%d"))),
        employee_id: EmployeeId(employee_id.to_string()),
        full_name: "Jordan Reyes".to_string(),
        date,
        infraction_type: "Minor".to_string(),
        points,
        description: narrative("Seeded history"),
        location: "Downtown".to_string(),
        entered_by: "seed".to_string(),
        entry_timestamp: Utc
            .from_utc_datetime(&date.and_hms_opt(9, 0, suffix % 60).expect("valid time")),
        modified_by: None,
        modified_date: None,
        modification_reason: None,
        status: InfractionStatus::Active,
        expiration_date: expiration_for(date),
    };
    store
        .append_infraction(record.clone())
        .expect("seed infraction");
    record
}

pub(super) fn with_status(mut record: Infraction, status: InfractionStatus) -> Infraction {
    record.status = status;
    record
}

pub(super) fn points_of(store: &InMemoryRecordStore, employee_id: &str) -> i32 {
    crate::workflows::accountability::points::calculate_points(
        store,
        &EmployeeId(employee_id.to_string()),
        today(),
    )
    .expect("points")
    .total_points
}

/// Every call fails as if the backing store were offline.
pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("store offline".to_string()))
}

impl RecordStore for UnavailableStore {
    fn find_employee(&self, _id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        offline()
    }

    fn list_employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        offline()
    }

    fn list_infractions_by_employee(
        &self,
        _id: &EmployeeId,
    ) -> Result<Vec<Infraction>, RepositoryError> {
        offline()
    }

    fn find_infraction(&self, _id: &InfractionId) -> Result<Option<Infraction>, RepositoryError> {
        offline()
    }

    fn append_infraction(&self, _record: Infraction) -> Result<InfractionId, RepositoryError> {
        offline()
    }

    fn update_infraction_fields(
        &self,
        _id: &InfractionId,
        _patch: &InfractionPatch,
    ) -> Result<(), RepositoryError> {
        offline()
    }

    fn append_audit_log_entry(&self, _entry: EditLogEntry) -> Result<LogId, RepositoryError> {
        offline()
    }

    fn list_audit_entries_by_employee(
        &self,
        _id: &EmployeeId,
    ) -> Result<Vec<EditLogEntry>, RepositoryError> {
        offline()
    }

    fn append_send_log_entry(&self, _entry: SendLogEntry) -> Result<LogId, RepositoryError> {
        offline()
    }

    fn append_termination_record(&self, _record: TerminationRecord) -> Result<(), RepositoryError> {
        offline()
    }

    fn settings(&self) -> Result<Settings, RepositoryError> {
        offline()
    }
}

/// Working store whose audit log rejects writes.
pub(super) struct AuditOutageStore {
    pub(super) inner: Arc<InMemoryRecordStore>,
}

impl RecordStore for AuditOutageStore {
    fn find_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        self.inner.find_employee(id)
    }

    fn list_employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        self.inner.list_employees()
    }

    fn list_infractions_by_employee(
        &self,
        id: &EmployeeId,
    ) -> Result<Vec<Infraction>, RepositoryError> {
        self.inner.list_infractions_by_employee(id)
    }

    fn find_infraction(&self, id: &InfractionId) -> Result<Option<Infraction>, RepositoryError> {
        self.inner.find_infraction(id)
    }

    fn append_infraction(&self, record: Infraction) -> Result<InfractionId, RepositoryError> {
        self.inner.append_infraction(record)
    }

    fn update_infraction_fields(
        &self,
        id: &InfractionId,
        patch: &InfractionPatch,
    ) -> Result<(), RepositoryError> {
        self.inner.update_infraction_fields(id, patch)
    }

    fn append_audit_log_entry(&self, _entry: EditLogEntry) -> Result<LogId, RepositoryError> {
        Err(RepositoryError::Unavailable("audit log locked".to_string()))
    }

    fn list_audit_entries_by_employee(
        &self,
        id: &EmployeeId,
    ) -> Result<Vec<EditLogEntry>, RepositoryError> {
        self.inner.list_audit_entries_by_employee(id)
    }

    fn append_send_log_entry(&self, entry: SendLogEntry) -> Result<LogId, RepositoryError> {
        self.inner.append_send_log_entry(entry)
    }

    fn append_termination_record(&self, record: TerminationRecord) -> Result<(), RepositoryError> {
        self.inner.append_termination_record(record)
    }

    fn settings(&self) -> Result<Settings, RepositoryError> {
        self.inner.settings()
    }
}

/// Store that reports the first id it is asked about as already taken.
pub(super) struct TakenIdStore {
    pub(super) inner: Arc<InMemoryRecordStore>,
    pub(super) occupant: Infraction,
    pub(super) answered: AtomicBool,
    pub(super) rejected: Mutex<Option<InfractionId>>,
}

impl TakenIdStore {
    pub(super) fn new(inner: Arc<InMemoryRecordStore>, occupant: Infraction) -> Self {
        Self {
            inner,
            occupant,
            answered: AtomicBool::new(false),
            rejected: Mutex::new(None),
        }
    }
}

impl RecordStore for TakenIdStore {
    fn find_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        self.inner.find_employee(id)
    }

    fn list_employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        self.inner.list_employees()
    }

    fn list_infractions_by_employee(
        &self,
        id: &EmployeeId,
    ) -> Result<Vec<Infraction>, RepositoryError> {
        self.inner.list_infractions_by_employee(id)
    }

    fn find_infraction(&self, id: &InfractionId) -> Result<Option<Infraction>, RepositoryError> {
        if !self.answered.swap(true, Ordering::SeqCst) {
            *self.rejected.lock().expect("rejected slot") = Some(id.clone());
            return Ok(Some(self.occupant.clone()));
        }
        self.inner.find_infraction(id)
    }

    fn append_infraction(&self, record: Infraction) -> Result<InfractionId, RepositoryError> {
        self.inner.append_infraction(record)
    }

    fn update_infraction_fields(
        &self,
        id: &InfractionId,
        patch: &InfractionPatch,
    ) -> Result<(), RepositoryError> {
        self.inner.update_infraction_fields(id, patch)
    }

    fn append_audit_log_entry(&self, entry: EditLogEntry) -> Result<LogId, RepositoryError> {
        self.inner.append_audit_log_entry(entry)
    }

    fn list_audit_entries_by_employee(
        &self,
        id: &EmployeeId,
    ) -> Result<Vec<EditLogEntry>, RepositoryError> {
        self.inner.list_audit_entries_by_employee(id)
    }

    fn append_send_log_entry(&self, entry: SendLogEntry) -> Result<LogId, RepositoryError> {
        self.inner.append_send_log_entry(entry)
    }

    fn append_termination_record(&self, record: TerminationRecord) -> Result<(), RepositoryError> {
        self.inner.append_termination_record(record)
    }

    fn settings(&self) -> Result<Settings, RepositoryError> {
        self.inner.settings()
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
