use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{
    expiration_for, narrative_len, EditAction, EditLogEntry, Employee, EmployeeId, Infraction,
    InfractionId, InfractionPatch, InfractionStatus, LogId, TerminationRecord,
    MIN_NARRATIVE_CHARS, POINT_REMOVAL_TYPE, POSITIVE_CREDIT_TYPE,
};
use super::points::summarize;
use super::repository::{Clock, RecordStore, RepositoryError};
use super::settings::Settings;

pub const MAX_CREDIT_POINTS: i32 = 6;
/// Largest magnitude a single record may carry, whether edited or removed.
pub const MAX_RECORD_POINTS: i32 = 99;
const ID_ATTEMPTS: usize = 3;

/// User-correctable input problems. `Display` is the message shown on the form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Incident date cannot be in the future")]
    FutureDate,
    #[error("Incident date cannot be more than {limit_days} days in the past")]
    BeyondBackdateLimit { limit_days: i64 },
    #[error("Description must be at least {minimum} characters (currently {found})")]
    DescriptionTooShort { minimum: usize, found: usize },
    #[error("Reason must be at least {minimum} characters (currently {found})")]
    ReasonTooShort { minimum: usize, found: usize },
    #[error("Employee was not found in the roster")]
    UnknownEmployee,
    #[error("Employee is not active")]
    InactiveEmployee,
    #[error("Location '{0}' is not a valid location")]
    InvalidLocation(String),
    #[error("Points must be a number")]
    NonNumericPoints,
    #[error("Infraction type '{0}' is not a configured category")]
    UnknownInfractionType(String),
    #[error("No changes detected")]
    NoChanges,
    #[error("Positive credit must be between 1 and {max} points")]
    CreditOutOfRange { max: i32 },
    #[error("Points to remove must be between 1 and {max}")]
    RemovalOutOfRange { max: i32 },
    #[error("Points must be between -{max} and {max}")]
    PointsOutOfRange { max: i32 },
    #[error("Infraction is {0} and can no longer be changed")]
    Locked(&'static str),
}

/// Failure raised by lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Infraction {0} was not found")]
    InfractionNotFound(InfractionId),
    #[error("Employee {0} was not found")]
    EmployeeNotFound(EmployeeId),
    #[error("You do not have permission to change this employee's records")]
    PermissionDenied,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Raw infraction form data. Empty strings count as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfractionSubmission {
    pub employee_id: String,
    pub date: Option<NaiveDate>,
    pub infraction_type: String,
    pub points: Option<f64>,
    pub description: String,
    pub location: String,
    pub entered_by: String,
}

/// Newly stored infraction plus the advisory duplicate flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedInfraction {
    pub infraction: Infraction,
    pub duplicate_warning: bool,
}

/// Requested field values for an audited edit; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfractionChanges {
    pub description: Option<String>,
    pub points: Option<i32>,
    pub date: Option<NaiveDate>,
    pub infraction_type: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InfractionField {
    Description,
    Points,
    Date,
    InfractionType,
    Location,
}

impl InfractionField {
    pub const fn label(self) -> &'static str {
        match self {
            InfractionField::Description => "description",
            InfractionField::Points => "points",
            InfractionField::Date => "date",
            InfractionField::InfractionType => "infraction_type",
            InfractionField::Location => "location",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldChange {
    field: InfractionField,
    original: String,
    updated: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditOutcome {
    pub infraction: Infraction,
    pub changed_fields: Vec<InfractionField>,
    pub audit_log_ids: Vec<LogId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub infraction_id: InfractionId,
    pub employee_id: EmployeeId,
    pub audit_log_id: LogId,
}

/// Credit or point removal request. `points` is the magnitude to subtract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointAdjustmentRequest {
    pub employee_id: String,
    pub points: i32,
    pub reason: String,
    pub entered_by: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointAdjustment {
    pub infraction: Infraction,
    pub previous_points: i32,
    pub new_points: i32,
    pub audit_log_id: LogId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminationOutcome {
    pub employee_id: EmployeeId,
    pub final_points: i32,
    pub archived_infractions: Vec<InfractionId>,
    pub audit_log_id: LogId,
}

/// Per-employee mutual exclusion for read-validate-audit-write sequences.
#[derive(Debug, Default)]
pub struct EmployeeLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl EmployeeLocks {
    pub fn with_lock<T, E, F>(&self, employee_id: &str, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        // The guarded value is `()`, so a poisoned slot carries no torn state.
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots
                .entry(employee_id.trim().to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        work()
    }
}

/// Shared context for the audit rows one operation produces.
struct AuditScope<'a> {
    action: EditAction,
    actor: &'a str,
    employee_id: &'a EmployeeId,
    employee_name: &'a str,
    reason: &'a str,
    at: DateTime<Utc>,
}

impl AuditScope<'_> {
    fn entry(
        &self,
        target_type: &str,
        target_id: &str,
        field_changed: &str,
        original_value: String,
        new_value: String,
    ) -> EditLogEntry {
        EditLogEntry {
            log_id: LogId::generate("LOG", self.at, &mut rand::thread_rng()),
            timestamp: self.at,
            action_type: self.action,
            actor_identity: self.actor.to_string(),
            target_type: target_type.to_string(),
            target_id: target_id.to_string(),
            employee_id: self.employee_id.clone(),
            employee_name: self.employee_name.to_string(),
            field_changed: field_changed.to_string(),
            original_value,
            new_value,
            reason: self.reason.trim().to_string(),
        }
    }
}

/// Validates, records, and mutates infractions with an audit-first write order.
pub struct InfractionLifecycle<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    locks: Arc<EmployeeLocks>,
    backdate_limit_days: i64,
}

impl<S> InfractionLifecycle<S>
where
    S: RecordStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        locks: Arc<EmployeeLocks>,
        backdate_limit_days: i64,
    ) -> Self {
        Self {
            store,
            clock,
            locks,
            backdate_limit_days,
        }
    }

    pub fn locks(&self) -> &EmployeeLocks {
        &self.locks
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Validate and persist a new infraction.
    pub fn add_infraction(
        &self,
        submission: &InfractionSubmission,
    ) -> Result<RecordedInfraction, LifecycleError> {
        self.locks.with_lock(&submission.employee_id, || -> Result<_, LifecycleError> {
            let settings = self.store.settings()?;
            self.add_infraction_locked(submission, &settings)
        })
    }

    /// Body of [`Self::add_infraction`]; the caller holds the employee lock.
    pub(crate) fn add_infraction_locked(
        &self,
        submission: &InfractionSubmission,
        settings: &Settings,
    ) -> Result<RecordedInfraction, LifecycleError> {
        let (employee, date, point_value) = self.validate_submission(submission, settings)?;

        let history = self
            .store
            .list_infractions_by_employee(&employee.employee_id)?;
        let bucket_name = submission.infraction_type.trim();
        let duplicate_warning = history.iter().any(|record| {
            record.contributes()
                && record.date == date
                && record.infraction_type.eq_ignore_ascii_case(bucket_name)
        });

        let now = self.clock.now();
        let canonical_type = settings
            .bucket(bucket_name)
            .map(|bucket| bucket.name.clone())
            .unwrap_or_else(|| bucket_name.to_string());
        let record = Infraction {
            infraction_id: InfractionId::generate(now.date_naive(), &mut rand::thread_rng()),
            employee_id: employee.employee_id.clone(),
            full_name: employee.full_name.clone(),
            date,
            infraction_type: canonical_type,
            points: point_value,
            description: submission.description.trim().to_string(),
            location: submission.location.trim().to_string(),
            entered_by: submission.entered_by.trim().to_string(),
            entry_timestamp: now,
            modified_by: None,
            modified_date: None,
            modification_reason: None,
            status: InfractionStatus::Active,
            expiration_date: expiration_for(date),
        };

        let stored = self.append_with_fresh_id(record)?;

        if duplicate_warning {
            warn!(
                employee_id = %stored.employee_id,
                infraction_type = %stored.infraction_type,
                date = %stored.date,
                "possible duplicate infraction recorded"
            );
        }
        info!(
            infraction_id = %stored.infraction_id,
            employee_id = %stored.employee_id,
            points = stored.points,
            entered_by = %stored.entered_by,
            "infraction recorded"
        );

        Ok(RecordedInfraction {
            infraction: stored,
            duplicate_warning,
        })
    }

    fn validate_submission(
        &self,
        submission: &InfractionSubmission,
        settings: &Settings,
    ) -> Result<(Employee, NaiveDate, i32), LifecycleError> {
        let required = [
            ("employee_id", submission.employee_id.as_str()),
            ("infraction_type", submission.infraction_type.as_str()),
            ("description", submission.description.as_str()),
            ("location", submission.location.as_str()),
            ("entered_by", submission.entered_by.as_str()),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ValidationError::MissingField(*field).into());
        }
        let date = submission
            .date
            .ok_or(ValidationError::MissingField("date"))?;

        let today = self.clock.today();
        if date > today {
            return Err(ValidationError::FutureDate.into());
        }
        let earliest = Duration::try_days(self.backdate_limit_days)
            .and_then(|limit| today.checked_sub_signed(limit))
            .unwrap_or(NaiveDate::MIN);
        if date < earliest {
            return Err(ValidationError::BeyondBackdateLimit {
                limit_days: self.backdate_limit_days,
            }
            .into());
        }

        check_narrative(&submission.description, |minimum, found| {
            ValidationError::DescriptionTooShort { minimum, found }
        })?;

        let employee_id = EmployeeId(submission.employee_id.trim().to_string());
        let employee = self
            .store
            .find_employee(&employee_id)?
            .ok_or(ValidationError::UnknownEmployee)?;
        if !employee.is_active() {
            return Err(ValidationError::InactiveEmployee.into());
        }

        if !settings.is_valid_location(&submission.location) {
            return Err(ValidationError::InvalidLocation(
                submission.location.trim().to_string(),
            )
            .into());
        }

        if submission.points.is_some_and(|points| !points.is_finite()) {
            return Err(ValidationError::NonNumericPoints.into());
        }
        let bucket = settings
            .bucket(&submission.infraction_type)
            .ok_or_else(|| {
                ValidationError::UnknownInfractionType(
                    submission.infraction_type.trim().to_string(),
                )
            })?;

        Ok((employee, date, bucket.point_value))
    }

    fn append_with_fresh_id(&self, mut record: Infraction) -> Result<Infraction, LifecycleError> {
        let mut attempt = 1;
        loop {
            match self.store.append_infraction(record.clone()) {
                Ok(_) => return Ok(record),
                Err(RepositoryError::Conflict) if attempt < ID_ATTEMPTS => {
                    debug!(
                        infraction_id = %record.infraction_id,
                        "infraction id collision, regenerating"
                    );
                    record.infraction_id = InfractionId::generate(
                        record.entry_timestamp.date_naive(),
                        &mut rand::thread_rng(),
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn unclaimed_id(&self, entry_date: NaiveDate) -> Result<InfractionId, LifecycleError> {
        for _ in 0..ID_ATTEMPTS {
            let candidate = InfractionId::generate(entry_date, &mut rand::thread_rng());
            if self.store.find_infraction(&candidate)?.is_none() {
                return Ok(candidate);
            }
            debug!(infraction_id = %candidate, "infraction id already taken, regenerating");
        }
        Err(RepositoryError::Conflict.into())
    }

    /// Apply field edits. Every changed field is audited before the record changes.
    pub fn edit_infraction(
        &self,
        infraction_id: &InfractionId,
        changes: &InfractionChanges,
        reason: &str,
        actor: &str,
    ) -> Result<EditOutcome, LifecycleError> {
        let owner = self.owner_of(infraction_id)?;
        self.locks.with_lock(&owner.0, || -> Result<_, LifecycleError> {
            let current = self.load_mutable(infraction_id)?;
            check_narrative(reason, |minimum, found| ValidationError::ReasonTooShort {
                minimum,
                found,
            })?;

            let settings = self.store.settings()?;
            let diff = self.diff_changes(&current, changes, &settings)?;
            if diff.is_empty() {
                return Err(ValidationError::NoChanges.into());
            }

            let scope = AuditScope {
                action: EditAction::EditInfraction,
                actor,
                employee_id: &current.employee_id,
                employee_name: &current.full_name,
                reason,
                at: self.clock.now(),
            };
            let mut audit_log_ids = Vec::with_capacity(diff.len());
            for change in &diff {
                let entry = scope.entry(
                    "infraction",
                    &current.infraction_id.0,
                    change.field.label(),
                    change.original.clone(),
                    change.updated.clone(),
                );
                audit_log_ids.push(self.store.append_audit_log_entry(entry)?);
            }

            let mut patch = InfractionPatch {
                status: Some(InfractionStatus::Modified),
                modified_by: Some(actor.to_string()),
                modified_date: Some(scope.at),
                modification_reason: Some(reason.trim().to_string()),
                ..InfractionPatch::default()
            };
            for change in &diff {
                match change.field {
                    InfractionField::Description => {
                        patch.description = changes.description.as_deref().map(trimmed);
                    }
                    InfractionField::Points => patch.points = changes.points,
                    InfractionField::Date => {
                        patch.date = changes.date;
                        patch.expiration_date = changes.date.map(expiration_for);
                    }
                    InfractionField::InfractionType => {
                        patch.infraction_type = changes
                            .infraction_type
                            .as_deref()
                            .and_then(|name| settings.bucket(name))
                            .map(|bucket| bucket.name.clone());
                    }
                    InfractionField::Location => {
                        patch.location = changes.location.as_deref().map(trimmed);
                    }
                }
            }

            self.store
                .update_infraction_fields(&current.infraction_id, &patch)?;

            let mut updated = current;
            patch.apply(&mut updated);
            let changed_fields: Vec<InfractionField> =
                diff.iter().map(|change| change.field).collect();

            info!(
                infraction_id = %updated.infraction_id,
                employee_id = %updated.employee_id,
                actor,
                fields = ?changed_fields,
                "infraction edited"
            );

            Ok(EditOutcome {
                infraction: updated,
                changed_fields,
                audit_log_ids,
            })
        })
    }

    fn diff_changes(
        &self,
        current: &Infraction,
        changes: &InfractionChanges,
        settings: &Settings,
    ) -> Result<Vec<FieldChange>, ValidationError> {
        let mut diff = Vec::new();

        if let Some(description) = &changes.description {
            let description = description.trim();
            if description != current.description {
                check_narrative(description, |minimum, found| {
                    ValidationError::DescriptionTooShort { minimum, found }
                })?;
                diff.push(FieldChange {
                    field: InfractionField::Description,
                    original: current.description.clone(),
                    updated: description.to_string(),
                });
            }
        }

        if let Some(points) = changes.points {
            if points != current.points {
                if !(-MAX_RECORD_POINTS..=MAX_RECORD_POINTS).contains(&points) {
                    return Err(ValidationError::PointsOutOfRange {
                        max: MAX_RECORD_POINTS,
                    });
                }
                diff.push(FieldChange {
                    field: InfractionField::Points,
                    original: current.points.to_string(),
                    updated: points.to_string(),
                });
            }
        }

        if let Some(date) = changes.date {
            if date != current.date {
                if date > self.clock.today() {
                    return Err(ValidationError::FutureDate);
                }
                diff.push(FieldChange {
                    field: InfractionField::Date,
                    original: current.date.to_string(),
                    updated: date.to_string(),
                });
            }
        }

        if let Some(infraction_type) = &changes.infraction_type {
            let bucket = settings.bucket(infraction_type).ok_or_else(|| {
                ValidationError::UnknownInfractionType(infraction_type.trim().to_string())
            })?;
            if bucket.name != current.infraction_type {
                diff.push(FieldChange {
                    field: InfractionField::InfractionType,
                    original: current.infraction_type.clone(),
                    updated: bucket.name.clone(),
                });
            }
        }

        if let Some(location) = &changes.location {
            let location = location.trim();
            if location != current.location {
                if !settings.is_valid_location(location) {
                    return Err(ValidationError::InvalidLocation(location.to_string()));
                }
                diff.push(FieldChange {
                    field: InfractionField::Location,
                    original: current.location.clone(),
                    updated: location.to_string(),
                });
            }
        }

        Ok(diff)
    }

    /// Soft delete. The record stays in the store but never counts again.
    pub fn delete_infraction(
        &self,
        infraction_id: &InfractionId,
        reason: &str,
        actor: &str,
    ) -> Result<DeleteOutcome, LifecycleError> {
        let owner = self.owner_of(infraction_id)?;
        self.locks.with_lock(&owner.0, || -> Result<_, LifecycleError> {
            let current = self.load_mutable(infraction_id)?;
            check_narrative(reason, |minimum, found| ValidationError::ReasonTooShort {
                minimum,
                found,
            })?;

            let scope = AuditScope {
                action: EditAction::DeleteInfraction,
                actor,
                employee_id: &current.employee_id,
                employee_name: &current.full_name,
                reason,
                at: self.clock.now(),
            };
            let entry = scope.entry(
                "infraction",
                &current.infraction_id.0,
                "status",
                format!("{} ({} points)", current.status.label(), current.points),
                InfractionStatus::Deleted.label().to_string(),
            );
            let audit_log_id = self.store.append_audit_log_entry(entry)?;

            let patch = InfractionPatch {
                status: Some(InfractionStatus::Deleted),
                modified_by: Some(actor.to_string()),
                modified_date: Some(scope.at),
                modification_reason: Some(reason.trim().to_string()),
                ..InfractionPatch::default()
            };
            self.store
                .update_infraction_fields(&current.infraction_id, &patch)?;

            info!(
                infraction_id = %current.infraction_id,
                employee_id = %current.employee_id,
                actor,
                "infraction deleted"
            );

            Ok(DeleteOutcome {
                infraction_id: current.infraction_id,
                employee_id: current.employee_id,
                audit_log_id,
            })
        })
    }

    /// Record a 1-6 point positive-behavior credit.
    pub fn add_positive_credit(
        &self,
        request: &PointAdjustmentRequest,
    ) -> Result<PointAdjustment, LifecycleError> {
        if request.points < 1 || request.points > MAX_CREDIT_POINTS {
            return Err(ValidationError::CreditOutOfRange {
                max: MAX_CREDIT_POINTS,
            }
            .into());
        }
        self.adjust(request, EditAction::AddCredit, POSITIVE_CREDIT_TYPE)
    }

    /// Subtract points from an employee's rolling total.
    pub fn remove_points(
        &self,
        request: &PointAdjustmentRequest,
    ) -> Result<PointAdjustment, LifecycleError> {
        if request.points < 1 || request.points > MAX_RECORD_POINTS {
            return Err(ValidationError::RemovalOutOfRange {
                max: MAX_RECORD_POINTS,
            }
            .into());
        }
        self.adjust(request, EditAction::RemovePoints, POINT_REMOVAL_TYPE)
    }

    fn adjust(
        &self,
        request: &PointAdjustmentRequest,
        action: EditAction,
        synthetic_type: &str,
    ) -> Result<PointAdjustment, LifecycleError> {
        if request.employee_id.trim().is_empty() {
            return Err(ValidationError::MissingField("employee_id").into());
        }
        if request.entered_by.trim().is_empty() {
            return Err(ValidationError::MissingField("entered_by").into());
        }
        check_narrative(&request.reason, |minimum, found| {
            ValidationError::ReasonTooShort { minimum, found }
        })?;

        let employee_id = EmployeeId(request.employee_id.trim().to_string());
        self.locks.with_lock(&employee_id.0, || -> Result<_, LifecycleError> {
            let employee = self
                .store
                .find_employee(&employee_id)?
                .ok_or_else(|| LifecycleError::EmployeeNotFound(employee_id.clone()))?;
            if !employee.is_active() {
                return Err(ValidationError::InactiveEmployee.into());
            }

            let now = self.clock.now();
            let today = self.clock.today();
            let location = request
                .location
                .as_deref()
                .map(str::trim)
                .filter(|location| !location.is_empty())
                .unwrap_or(&employee.primary_location)
                .to_string();

            // The audit row names this id, so it must be settled before anything is written.
            let record = Infraction {
                infraction_id: self.unclaimed_id(now.date_naive())?,
                employee_id: employee.employee_id.clone(),
                full_name: employee.full_name.clone(),
                date: today,
                infraction_type: synthetic_type.to_string(),
                points: -request.points,
                description: request.reason.trim().to_string(),
                location,
                entered_by: request.entered_by.trim().to_string(),
                entry_timestamp: now,
                modified_by: None,
                modified_date: None,
                modification_reason: None,
                status: InfractionStatus::Active,
                expiration_date: expiration_for(today),
            };

            let mut history = self
                .store
                .list_infractions_by_employee(&employee.employee_id)?;
            let previous_points = summarize(&employee.employee_id, &history, today).total_points;
            history.push(record.clone());
            let new_points = summarize(&employee.employee_id, &history, today).total_points;

            let scope = AuditScope {
                action,
                actor: &request.entered_by,
                employee_id: &employee.employee_id,
                employee_name: &employee.full_name,
                reason: &request.reason,
                at: now,
            };
            let entry = scope.entry(
                "infraction",
                &record.infraction_id.0,
                "total_points",
                previous_points.to_string(),
                new_points.to_string(),
            );
            let audit_log_id = self.store.append_audit_log_entry(entry)?;
            self.store.append_infraction(record.clone())?;
            let stored = record;

            info!(
                employee_id = %employee.employee_id,
                action = action.label(),
                previous_points,
                new_points,
                "point adjustment recorded"
            );

            Ok(PointAdjustment {
                infraction: stored,
                previous_points,
                new_points,
                audit_log_id,
            })
        })
    }

    /// Archive every contributing infraction and capture the final standing.
    pub fn terminate_employee(
        &self,
        employee_id: &EmployeeId,
        reason: &str,
        actor: &str,
    ) -> Result<TerminationOutcome, LifecycleError> {
        check_narrative(reason, |minimum, found| ValidationError::ReasonTooShort {
            minimum,
            found,
        })?;

        self.locks.with_lock(&employee_id.0, || -> Result<_, LifecycleError> {
            let employee = self
                .store
                .find_employee(employee_id)?
                .ok_or_else(|| LifecycleError::EmployeeNotFound(employee_id.clone()))?;

            let now = self.clock.now();
            let history = self.store.list_infractions_by_employee(employee_id)?;
            let final_points = summarize(employee_id, &history, self.clock.today()).total_points;
            let to_archive: Vec<InfractionId> = history
                .iter()
                .filter(|record| record.contributes())
                .map(|record| record.infraction_id.clone())
                .collect();

            let scope = AuditScope {
                action: EditAction::Terminate,
                actor,
                employee_id,
                employee_name: &employee.full_name,
                reason,
                at: now,
            };
            let entry = scope.entry(
                "employee",
                &employee_id.0,
                "infraction_status",
                format!("{} contributing infractions, {final_points} points", to_archive.len()),
                InfractionStatus::ArchivedTerminated.label().to_string(),
            );
            let audit_log_id = self.store.append_audit_log_entry(entry)?;

            let patch = InfractionPatch {
                status: Some(InfractionStatus::ArchivedTerminated),
                modified_by: Some(actor.to_string()),
                modified_date: Some(now),
                modification_reason: Some(reason.trim().to_string()),
                ..InfractionPatch::default()
            };
            for infraction_id in &to_archive {
                self.store.update_infraction_fields(infraction_id, &patch)?;
            }

            self.store.append_termination_record(TerminationRecord {
                employee_id: employee_id.clone(),
                employee_name: employee.full_name.clone(),
                terminated_by: actor.to_string(),
                terminated_at: now,
                final_points,
                archived_infractions: to_archive.clone(),
                reason: reason.trim().to_string(),
            })?;

            info!(
                %employee_id,
                final_points,
                archived = to_archive.len(),
                actor,
                "employee terminated"
            );

            Ok(TerminationOutcome {
                employee_id: employee_id.clone(),
                final_points,
                archived_infractions: to_archive,
                audit_log_id,
            })
        })
    }

    fn owner_of(&self, infraction_id: &InfractionId) -> Result<EmployeeId, LifecycleError> {
        self.store
            .find_infraction(infraction_id)?
            .map(|record| record.employee_id)
            .ok_or_else(|| LifecycleError::InfractionNotFound(infraction_id.clone()))
    }

    fn load_mutable(&self, infraction_id: &InfractionId) -> Result<Infraction, LifecycleError> {
        let record = self
            .store
            .find_infraction(infraction_id)?
            .ok_or_else(|| LifecycleError::InfractionNotFound(infraction_id.clone()))?;
        if !record.contributes() {
            return Err(ValidationError::Locked(record.status.label()).into());
        }
        Ok(record)
    }
}

fn check_narrative<F>(text: &str, error: F) -> Result<(), ValidationError>
where
    F: FnOnce(usize, usize) -> ValidationError,
{
    let found = narrative_len(text);
    if found < MIN_NARRATIVE_CHARS {
        return Err(error(MIN_NARRATIVE_CHARS, found));
    }
    Ok(())
}

fn trimmed(text: &str) -> String {
    text.trim().to_string()
}
