//! Mutex-guarded in-memory adapters used by the demo CLI, the HTTP service, and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    EditLogEntry, Employee, EmployeeId, Infraction, InfractionId, InfractionPatch, LogId,
    SendLogEntry, TerminationRecord,
};
use super::repository::{NotificationChannel, NotificationError, RecordStore, RepositoryError};
use super::settings::Settings;

#[derive(Debug)]
struct StoreState {
    employees: BTreeMap<EmployeeId, Employee>,
    infractions: HashMap<InfractionId, Infraction>,
    by_employee: HashMap<EmployeeId, Vec<InfractionId>>,
    audit_log: Vec<EditLogEntry>,
    send_log: Vec<SendLogEntry>,
    terminations: Vec<TerminationRecord>,
    settings: Settings,
}

/// Table store keyed by infraction id with an `employee_id` index.
#[derive(Debug, Clone)]
pub struct InMemoryRecordStore {
    state: Arc<Mutex<StoreState>>,
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::with_settings(Settings::standard())
    }
}

impl InMemoryRecordStore {
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                employees: BTreeMap::new(),
                infractions: HashMap::new(),
                by_employee: HashMap::new(),
                audit_log: Vec::new(),
                send_log: Vec::new(),
                terminations: Vec::new(),
                settings,
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("record store mutex poisoned".to_string()))
    }

    /// Payroll feed hook: insert or replace an employee row.
    pub fn upsert_employee(&self, employee: Employee) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        state
            .employees
            .insert(employee.employee_id.clone(), employee);
        Ok(())
    }

    pub fn replace_settings(&self, settings: Settings) -> Result<(), RepositoryError> {
        self.lock()?.settings = settings;
        Ok(())
    }

    pub fn audit_entries(&self) -> Result<Vec<EditLogEntry>, RepositoryError> {
        Ok(self.lock()?.audit_log.clone())
    }

    pub fn send_log(&self) -> Result<Vec<SendLogEntry>, RepositoryError> {
        Ok(self.lock()?.send_log.clone())
    }

    pub fn terminations(&self) -> Result<Vec<TerminationRecord>, RepositoryError> {
        Ok(self.lock()?.terminations.clone())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn find_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        Ok(self.lock()?.employees.get(id).cloned())
    }

    fn list_employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        Ok(self.lock()?.employees.values().cloned().collect())
    }

    fn list_infractions_by_employee(
        &self,
        id: &EmployeeId,
    ) -> Result<Vec<Infraction>, RepositoryError> {
        let state = self.lock()?;
        let records = state
            .by_employee
            .get(id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|infraction_id| state.infractions.get(infraction_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(records)
    }

    fn find_infraction(&self, id: &InfractionId) -> Result<Option<Infraction>, RepositoryError> {
        Ok(self.lock()?.infractions.get(id).cloned())
    }

    fn append_infraction(&self, record: Infraction) -> Result<InfractionId, RepositoryError> {
        let mut state = self.lock()?;
        if state.infractions.contains_key(&record.infraction_id) {
            return Err(RepositoryError::Conflict);
        }
        let id = record.infraction_id.clone();
        state
            .by_employee
            .entry(record.employee_id.clone())
            .or_default()
            .push(id.clone());
        state.infractions.insert(id.clone(), record);
        Ok(id)
    }

    fn update_infraction_fields(
        &self,
        id: &InfractionId,
        patch: &InfractionPatch,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        let record = state
            .infractions
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        patch.apply(record);
        Ok(())
    }

    fn append_audit_log_entry(&self, entry: EditLogEntry) -> Result<LogId, RepositoryError> {
        let mut state = self.lock()?;
        let id = entry.log_id.clone();
        state.audit_log.push(entry);
        Ok(id)
    }

    fn list_audit_entries_by_employee(
        &self,
        id: &EmployeeId,
    ) -> Result<Vec<EditLogEntry>, RepositoryError> {
        Ok(self
            .lock()?
            .audit_log
            .iter()
            .filter(|entry| &entry.employee_id == id)
            .cloned()
            .collect())
    }

    fn append_send_log_entry(&self, entry: SendLogEntry) -> Result<LogId, RepositoryError> {
        let mut state = self.lock()?;
        let id = entry.log_id.clone();
        state.send_log.push(entry);
        Ok(id)
    }

    fn append_termination_record(&self, record: TerminationRecord) -> Result<(), RepositoryError> {
        self.lock()?.terminations.push(record);
        Ok(())
    }

    fn settings(&self) -> Result<Settings, RepositoryError> {
        Ok(self.lock()?.settings.clone())
    }
}

/// Message captured by [`InMemoryChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub recipients: Vec<String>,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

/// Outbox that records deliveries and can be scripted to fail.
#[derive(Debug, Default, Clone)]
pub struct InMemoryChannel {
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    failures_remaining: Arc<Mutex<usize>>,
}

impl InMemoryChannel {
    /// Fail the next `count` send attempts with a transport error.
    pub fn fail_next(&self, count: usize) {
        if let Ok(mut remaining) = self.failures_remaining.lock() {
            *remaining = count;
        }
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl NotificationChannel for InMemoryChannel {
    fn send(
        &self,
        recipients: &[String],
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<(), NotificationError> {
        {
            let mut remaining = self
                .failures_remaining
                .lock()
                .map_err(|_| NotificationError::Transport("outbox mutex poisoned".to_string()))?;
            if *remaining > 0 {
                *remaining -= 1;
                return Err(NotificationError::Transport(
                    "simulated delivery failure".to_string(),
                ));
            }
        }

        self.sent
            .lock()
            .map_err(|_| NotificationError::Transport("outbox mutex poisoned".to_string()))?
            .push(OutboundMessage {
                recipients: recipients.to_vec(),
                subject: subject.to_string(),
                html_body: html_body.to_string(),
                text_body: text_body.to_string(),
            });
        Ok(())
    }
}
