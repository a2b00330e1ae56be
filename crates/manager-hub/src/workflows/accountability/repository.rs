use chrono::{DateTime, NaiveDate, Utc};

use super::domain::{
    EditLogEntry, Employee, EmployeeId, Infraction, InfractionId, InfractionPatch, LogId,
    SendLogEntry, TerminationRecord,
};
use super::settings::Settings;

/// Storage abstraction over the employee/infraction tables.
///
/// Implementations must keep an index on `employee_id`; point calculation scans it on
/// every request.
pub trait RecordStore: Send + Sync {
    fn find_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError>;
    fn list_employees(&self) -> Result<Vec<Employee>, RepositoryError>;
    fn list_infractions_by_employee(
        &self,
        id: &EmployeeId,
    ) -> Result<Vec<Infraction>, RepositoryError>;
    fn find_infraction(&self, id: &InfractionId) -> Result<Option<Infraction>, RepositoryError>;
    fn append_infraction(&self, record: Infraction) -> Result<InfractionId, RepositoryError>;
    fn update_infraction_fields(
        &self,
        id: &InfractionId,
        patch: &InfractionPatch,
    ) -> Result<(), RepositoryError>;
    fn append_audit_log_entry(&self, entry: EditLogEntry) -> Result<LogId, RepositoryError>;
    fn list_audit_entries_by_employee(
        &self,
        id: &EmployeeId,
    ) -> Result<Vec<EditLogEntry>, RepositoryError>;
    fn append_send_log_entry(&self, entry: SendLogEntry) -> Result<LogId, RepositoryError>;
    fn append_termination_record(&self, record: TerminationRecord) -> Result<(), RepositoryError>;
    fn settings(&self) -> Result<Settings, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound mail hook (Gmail, SMTP relay, or a test double).
pub trait NotificationChannel: Send + Sync {
    fn send(
        &self,
        recipients: &[String],
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum NotificationError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
    #[error("message rejected: {0}")]
    Rejected(String),
}

/// Source of "now" so date-window rules can be exercised deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock. "Today" is the UTC date of `now`, the same calendar that stamps ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn on(date: NaiveDate) -> Self {
        let noon = date
            .and_hms_opt(12, 0, 0)
            .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN));
        Self(noon.and_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
