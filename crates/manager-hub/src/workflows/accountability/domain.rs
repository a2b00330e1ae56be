use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Days an infraction keeps counting toward the rolling total.
pub const EXPIRATION_WINDOW_DAYS: i64 = 90;

/// Minimum length for incident descriptions and every audited reason.
pub const MIN_NARRATIVE_CHARS: usize = 240;

/// Positive-behavior credits cannot push a balance below this floor.
pub const POINT_FLOOR: i32 = -6;

pub const POSITIVE_CREDIT_TYPE: &str = "Positive Credit";
pub const POINT_REMOVAL_TYPE: &str = "Point Removal";

/// Externally assigned payroll identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmployeeStatus {
    Active,
    Inactive,
}

/// System-access role carried by salaried staff; hourly staff have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemRole {
    Manager,
    Director,
    Operator,
}

impl SystemRole {
    pub const fn label(self) -> &'static str {
        match self {
            SystemRole::Manager => "Manager",
            SystemRole::Director => "Director",
            SystemRole::Operator => "Operator",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "manager" => Some(Self::Manager),
            "director" => Some(Self::Director),
            "operator" => Some(Self::Operator),
            _ => None,
        }
    }
}

/// Identity record fed by payroll. Read-only to the points engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub employee_id: EmployeeId,
    pub full_name: String,
    pub primary_location: String,
    pub status: EmployeeStatus,
    #[serde(default)]
    pub system_role: Option<SystemRole>,
}

impl Employee {
    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }
}

/// `INF-YYYYMMDD-####`: entry date plus a random suffix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InfractionId(pub String);

impl InfractionId {
    pub fn generate<R: Rng + ?Sized>(entry_date: NaiveDate, rng: &mut R) -> Self {
        let suffix: u16 = rng.gen_range(0..10_000);
        Self(format!("INF-{}-{suffix:04}", entry_date.format("%Y%m%d")))
    }
}

impl fmt::Display for InfractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfractionStatus {
    Active,
    Modified,
    Deleted,
    #[serde(rename = "Archived-Terminated")]
    ArchivedTerminated,
}

impl InfractionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            InfractionStatus::Active => "Active",
            InfractionStatus::Modified => "Modified",
            InfractionStatus::Deleted => "Deleted",
            InfractionStatus::ArchivedTerminated => "Archived-Terminated",
        }
    }

    /// Whether records in this state count toward point totals.
    pub const fn contributes(self) -> bool {
        matches!(self, InfractionStatus::Active | InfractionStatus::Modified)
    }
}

/// The central mutable record. Never hard-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Infraction {
    pub infraction_id: InfractionId,
    pub employee_id: EmployeeId,
    pub full_name: String,
    pub date: NaiveDate,
    pub infraction_type: String,
    pub points: i32,
    pub description: String,
    pub location: String,
    pub entered_by: String,
    pub entry_timestamp: DateTime<Utc>,
    pub modified_by: Option<String>,
    pub modified_date: Option<DateTime<Utc>>,
    pub modification_reason: Option<String>,
    pub status: InfractionStatus,
    pub expiration_date: NaiveDate,
}

impl Infraction {
    pub fn contributes(&self) -> bool {
        self.status.contributes()
    }

    pub fn is_synthetic(&self) -> bool {
        self.infraction_type == POSITIVE_CREDIT_TYPE || self.infraction_type == POINT_REMOVAL_TYPE
    }
}

pub fn expiration_for(date: NaiveDate) -> NaiveDate {
    date + Duration::days(EXPIRATION_WINDOW_DAYS)
}

/// Field-level update applied through `RecordStore::update_infraction_fields`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfractionPatch {
    pub description: Option<String>,
    pub points: Option<i32>,
    pub date: Option<NaiveDate>,
    pub infraction_type: Option<String>,
    pub location: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub status: Option<InfractionStatus>,
    pub modified_by: Option<String>,
    pub modified_date: Option<DateTime<Utc>>,
    pub modification_reason: Option<String>,
}

impl InfractionPatch {
    pub fn apply(&self, record: &mut Infraction) {
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
        if let Some(points) = self.points {
            record.points = points;
        }
        if let Some(date) = self.date {
            record.date = date;
        }
        if let Some(infraction_type) = &self.infraction_type {
            record.infraction_type = infraction_type.clone();
        }
        if let Some(location) = &self.location {
            record.location = location.clone();
        }
        if let Some(expiration_date) = self.expiration_date {
            record.expiration_date = expiration_date;
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(modified_by) = &self.modified_by {
            record.modified_by = Some(modified_by.clone());
        }
        if let Some(modified_date) = self.modified_date {
            record.modified_date = Some(modified_date);
        }
        if let Some(reason) = &self.modification_reason {
            record.modification_reason = Some(reason.clone());
        }
    }
}

/// Identifier for append-only log rows (edit log and send log).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogId(pub String);

impl LogId {
    pub fn generate<R: Rng + ?Sized>(prefix: &str, at: DateTime<Utc>, rng: &mut R) -> Self {
        let suffix: u16 = rng.gen_range(0..10_000);
        Self(format!(
            "{prefix}-{}-{suffix:04}",
            at.format("%Y%m%d%H%M%S%3f")
        ))
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditAction {
    EditInfraction,
    DeleteInfraction,
    RemovePoints,
    AddCredit,
    Terminate,
}

impl EditAction {
    pub const fn label(self) -> &'static str {
        match self {
            EditAction::EditInfraction => "edit_infraction",
            EditAction::DeleteInfraction => "delete_infraction",
            EditAction::RemovePoints => "remove_points",
            EditAction::AddCredit => "add_credit",
            EditAction::Terminate => "terminate",
        }
    }
}

/// Append-only audit row written before the mutation it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditLogEntry {
    pub log_id: LogId,
    pub timestamp: DateTime<Utc>,
    pub action_type: EditAction,
    pub actor_identity: String,
    pub target_type: String,
    pub target_id: String,
    pub employee_id: EmployeeId,
    pub employee_name: String,
    pub field_changed: String,
    pub original_value: String,
    pub new_value: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "Sent",
            DeliveryStatus::Failed => "Failed",
        }
    }
}

/// One row per threshold notification dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendLogEntry {
    pub log_id: LogId,
    pub timestamp: DateTime<Utc>,
    pub employee_id: EmployeeId,
    pub employee_name: String,
    pub thresholds: Vec<f64>,
    pub recipients: Vec<String>,
    pub subject: String,
    pub status: DeliveryStatus,
    pub attempts: u32,
    pub retry_count: u32,
    pub error: Option<String>,
}

/// Snapshot of an employee's standing at the moment of termination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationRecord {
    pub employee_id: EmployeeId,
    pub employee_name: String,
    pub terminated_by: String,
    pub terminated_at: DateTime<Utc>,
    pub final_points: i32,
    pub archived_infractions: Vec<InfractionId>,
    pub reason: String,
}

/// Counts characters the way a reviewer reads them, ignoring surrounding whitespace.
pub fn narrative_len(text: &str) -> usize {
    text.trim().chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn infraction_ids_carry_entry_date_and_four_digit_suffix() {
        let mut rng = StdRng::seed_from_u64(7);
        let date = NaiveDate::from_ymd_opt(2026, 3, 4).expect("valid");
        let id = InfractionId::generate(date, &mut rng);
        assert!(id.0.starts_with("INF-20260304-"));
        let suffix = id.0.rsplit('-').next().expect("suffix");
        assert_eq!(suffix.len(), 4);
        assert!(suffix.chars().all(|ch| ch.is_ascii_digit()));
    }

    #[test]
    fn only_active_and_modified_records_contribute() {
        assert!(InfractionStatus::Active.contributes());
        assert!(InfractionStatus::Modified.contributes());
        assert!(!InfractionStatus::Deleted.contributes());
        assert!(!InfractionStatus::ArchivedTerminated.contributes());
    }

    #[test]
    fn expiration_is_ninety_days_after_incident() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid");
        assert_eq!(
            expiration_for(date),
            NaiveDate::from_ymd_opt(2026, 4, 1).expect("valid")
        );
    }

    #[test]
    fn narrative_length_ignores_padding_and_counts_chars() {
        assert_eq!(narrative_len("  abc  "), 3);
        assert_eq!(narrative_len("ñandú"), 5);
    }

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!(SystemRole::parse(" Director "), Some(SystemRole::Director));
        assert_eq!(SystemRole::parse("cook"), None);
    }
}
