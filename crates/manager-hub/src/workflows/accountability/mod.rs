//! Accountability points engine: rolling 90-day totals, threshold alerts, and the audited
//! infraction lifecycle behind the manager hub.
//!
//! Every write path goes through [`lifecycle::InfractionLifecycle`], which holds a
//! per-employee lock for the read-validate-audit-write sequence. Notification I/O runs
//! after the lock is released.

pub mod domain;
pub mod lifecycle;
pub mod memory;
pub mod notification;
pub mod orchestrator;
pub mod points;
pub mod repository;
pub mod router;
pub mod service;
pub mod settings;
pub mod thresholds;
pub mod visibility;

#[cfg(test)]
mod tests;

pub use domain::{
    EditAction, EditLogEntry, Employee, EmployeeId, EmployeeStatus, Infraction, InfractionId,
    InfractionStatus, LogId, SendLogEntry, SystemRole, TerminationRecord,
};
pub use lifecycle::{
    InfractionChanges, InfractionLifecycle, InfractionSubmission, LifecycleError,
    PointAdjustmentRequest, ValidationError,
};
pub use memory::{InMemoryChannel, InMemoryRecordStore};
pub use notification::{RetryPolicy, ThresholdNotifier};
pub use orchestrator::{EmailStatus, ProcessOutcome};
pub use points::{calculate_points, PointSummary};
pub use repository::{
    Clock, FixedClock, NotificationChannel, NotificationError, RecordStore, RepositoryError,
    SystemClock,
};
pub use router::accountability_router;
pub use service::{AccountabilityService, EmployeeDetail, EmployeePoints, VisibilityError};
pub use settings::{Bucket, Settings};
pub use thresholds::{detect_thresholds, SeverityTier, Threshold, ThresholdTable};
pub use visibility::{check_view_permission, filter_visible_employees, RequestContext};
