use std::cmp::Ordering;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use super::domain::{EditLogEntry, Employee, EmployeeId, InfractionId, SystemRole};
use super::lifecycle::{
    DeleteOutcome, EditOutcome, EmployeeLocks, InfractionChanges, InfractionLifecycle,
    InfractionSubmission, LifecycleError, PointAdjustment, PointAdjustmentRequest,
    TerminationOutcome,
};
use super::notification::{Pause, RetryPolicy, ThreadPause, ThresholdNotifier};
use super::orchestrator::{AlertRouting, InfractionOrchestrator, ProcessOutcome};
use super::points::{calculate_points, highest_points_ever, summarize, PointSummary};
use super::repository::{Clock, NotificationChannel, RecordStore, RepositoryError, SystemClock};
use super::visibility::{can_view_employee, filter_visible_employees, RequestContext};
use crate::config::AccountabilityConfig;

/// Row in the manager dashboard list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeePoints {
    pub employee_id: EmployeeId,
    pub full_name: String,
    pub primary_location: String,
    pub system_role: Option<SystemRole>,
    pub total_points: i32,
    pub next_expiration_date: Option<NaiveDate>,
    pub current_consequence: Option<String>,
}

/// Everything the employee detail page shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeDetail {
    pub employee: Employee,
    pub summary: PointSummary,
    pub highest_points_ever: i32,
    pub current_consequence: Option<String>,
    pub days_until_next_expiration: Option<i64>,
    pub edit_history: Vec<EditLogEntry>,
}

/// Read-path failures.
#[derive(Debug, thiserror::Error)]
pub enum VisibilityError {
    /// Also returned for unknown ids so a denial never reveals whether a record exists.
    #[error("You do not have permission to view this employee")]
    PermissionDenied,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Caller-facing facade over the points engine.
pub struct AccountabilityService<S, C> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    lifecycle: InfractionLifecycle<S>,
    notifier: ThresholdNotifier<S, C>,
    routing: AlertRouting,
}

impl<S, C> AccountabilityService<S, C>
where
    S: RecordStore + 'static,
    C: NotificationChannel + 'static,
{
    pub fn new(store: Arc<S>, channel: Arc<C>, config: &AccountabilityConfig) -> Self {
        Self::with_runtime(
            store,
            channel,
            config,
            Arc::new(SystemClock),
            Arc::new(ThreadPause),
        )
    }

    /// Build with an explicit clock and backoff, e.g. for deterministic tests.
    pub fn with_runtime(
        store: Arc<S>,
        channel: Arc<C>,
        config: &AccountabilityConfig,
        clock: Arc<dyn Clock>,
        pause: Arc<dyn Pause>,
    ) -> Self {
        let locks = Arc::new(EmployeeLocks::default());
        let lifecycle = InfractionLifecycle::new(
            store.clone(),
            clock.clone(),
            locks,
            config.backdate_limit_days,
        );
        let notifier = ThresholdNotifier::new(
            store.clone(),
            channel,
            clock.clone(),
            RetryPolicy::once_after(config.email_retry_delay),
            pause,
            config.admin_email.clone(),
        );
        let routing = AlertRouting {
            operations: config.operations_email.clone(),
            escalation: config.escalation_emails.clone(),
        };

        Self {
            store,
            clock,
            lifecycle,
            notifier,
            routing,
        }
    }

    pub fn lifecycle(&self) -> &InfractionLifecycle<S> {
        &self.lifecycle
    }

    pub fn notifier(&self) -> &ThresholdNotifier<S, C> {
        &self.notifier
    }

    /// Record an infraction and send any threshold alert it triggers.
    pub fn submit_infraction(
        &self,
        submission: &InfractionSubmission,
    ) -> Result<ProcessOutcome, LifecycleError> {
        InfractionOrchestrator::new(
            self.store.as_ref(),
            &self.lifecycle,
            &self.notifier,
            &self.routing,
        )
        .process_infraction_with_notifications(submission)
    }

    /// Mutations below act as `ctx.user_id` and only reach employees the requester can view.
    pub fn edit_infraction(
        &self,
        infraction_id: &InfractionId,
        changes: &InfractionChanges,
        reason: &str,
        ctx: &RequestContext,
    ) -> Result<EditOutcome, LifecycleError> {
        self.authorize_infraction(infraction_id, ctx)?;
        self.lifecycle
            .edit_infraction(infraction_id, changes, reason, &ctx.user_id)
    }

    pub fn delete_infraction(
        &self,
        infraction_id: &InfractionId,
        reason: &str,
        ctx: &RequestContext,
    ) -> Result<DeleteOutcome, LifecycleError> {
        self.authorize_infraction(infraction_id, ctx)?;
        self.lifecycle
            .delete_infraction(infraction_id, reason, &ctx.user_id)
    }

    pub fn add_positive_credit(
        &self,
        request: &PointAdjustmentRequest,
        ctx: &RequestContext,
    ) -> Result<PointAdjustment, LifecycleError> {
        let request = self.authorize_adjustment(request, ctx)?;
        self.lifecycle.add_positive_credit(&request)
    }

    pub fn remove_points(
        &self,
        request: &PointAdjustmentRequest,
        ctx: &RequestContext,
    ) -> Result<PointAdjustment, LifecycleError> {
        let request = self.authorize_adjustment(request, ctx)?;
        self.lifecycle.remove_points(&request)
    }

    pub fn terminate_employee(
        &self,
        employee_id: &EmployeeId,
        reason: &str,
        ctx: &RequestContext,
    ) -> Result<TerminationOutcome, LifecycleError> {
        self.authorize_employee(employee_id, ctx)?;
        self.lifecycle
            .terminate_employee(employee_id, reason, &ctx.user_id)
    }

    /// Rolling total as of `as_of`, defaulting to today.
    pub fn calculate_points(
        &self,
        employee_id: &EmployeeId,
        as_of: Option<NaiveDate>,
    ) -> Result<PointSummary, RepositoryError> {
        let as_of = as_of.unwrap_or_else(|| self.clock.today());
        calculate_points(self.store.as_ref(), employee_id, as_of)
    }

    /// Active employees the requester may see, highest totals first.
    pub fn get_employees_with_points(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<EmployeePoints>, RepositoryError> {
        let settings = self.store.settings()?;
        let today = self.clock.today();

        let roster: Vec<Employee> = self
            .store
            .list_employees()?
            .into_iter()
            .filter(Employee::is_active)
            .collect();
        let visible = filter_visible_employees(ctx, roster);
        debug!(
            user_id = %ctx.user_id,
            role = ctx.role.label(),
            visible = visible.len(),
            "employee list filtered"
        );

        let mut rows = Vec::with_capacity(visible.len());
        for employee in visible {
            let history = self.store.list_infractions_by_employee(&employee.employee_id)?;
            let summary = summarize(&employee.employee_id, &history, today);
            let current_consequence = settings
                .thresholds
                .highest_reached(f64::from(summary.total_points))
                .map(|threshold| threshold.consequence.clone());
            rows.push(EmployeePoints {
                employee_id: employee.employee_id,
                full_name: employee.full_name,
                primary_location: employee.primary_location,
                system_role: employee.system_role,
                total_points: summary.total_points,
                next_expiration_date: summary.next_expiration_date,
                current_consequence,
            });
        }

        rows.sort_by(|a, b| match b.total_points.cmp(&a.total_points) {
            Ordering::Equal => a.full_name.cmp(&b.full_name),
            other => other,
        });
        Ok(rows)
    }

    pub fn get_employee_detail(
        &self,
        employee_id: &EmployeeId,
        ctx: &RequestContext,
    ) -> Result<EmployeeDetail, VisibilityError> {
        let employee = self.visible_employee(employee_id, ctx)?;
        let settings = self.store.settings()?;
        let history = self.store.list_infractions_by_employee(employee_id)?;
        let summary = summarize(employee_id, &history, self.clock.today());

        Ok(EmployeeDetail {
            highest_points_ever: highest_points_ever(&history),
            current_consequence: settings
                .thresholds
                .highest_reached(f64::from(summary.total_points))
                .map(|threshold| threshold.consequence.clone()),
            days_until_next_expiration: summary.days_until_next_expiration(),
            edit_history: self.sorted_history(employee_id)?,
            summary,
            employee,
        })
    }

    /// Audit trail for one employee, newest first.
    pub fn edit_history(
        &self,
        employee_id: &EmployeeId,
        ctx: &RequestContext,
    ) -> Result<Vec<EditLogEntry>, VisibilityError> {
        self.visible_employee(employee_id, ctx)?;
        Ok(self.sorted_history(employee_id)?)
    }

    fn visible_employee(
        &self,
        employee_id: &EmployeeId,
        ctx: &RequestContext,
    ) -> Result<Employee, VisibilityError> {
        match self.store.find_employee(employee_id)? {
            Some(employee) if can_view_employee(ctx, &employee) => Ok(employee),
            _ => Err(VisibilityError::PermissionDenied),
        }
    }

    fn authorize_employee(
        &self,
        employee_id: &EmployeeId,
        ctx: &RequestContext,
    ) -> Result<(), LifecycleError> {
        match self.visible_employee(employee_id, ctx) {
            Ok(_) => Ok(()),
            Err(VisibilityError::PermissionDenied) => {
                debug!(user_id = %ctx.user_id, %employee_id, "mutation denied");
                Err(LifecycleError::PermissionDenied)
            }
            Err(VisibilityError::Repository(err)) => Err(err.into()),
        }
    }

    fn authorize_infraction(
        &self,
        infraction_id: &InfractionId,
        ctx: &RequestContext,
    ) -> Result<(), LifecycleError> {
        let owner = self
            .store
            .find_infraction(infraction_id)?
            .map(|record| record.employee_id)
            .ok_or_else(|| LifecycleError::InfractionNotFound(infraction_id.clone()))?;
        self.authorize_employee(&owner, ctx)
    }

    /// The requester, not the form body, is recorded as the actor.
    fn authorize_adjustment(
        &self,
        request: &PointAdjustmentRequest,
        ctx: &RequestContext,
    ) -> Result<PointAdjustmentRequest, LifecycleError> {
        self.authorize_employee(&EmployeeId(request.employee_id.trim().to_string()), ctx)?;
        Ok(PointAdjustmentRequest {
            entered_by: ctx.user_id.clone(),
            ..request.clone()
        })
    }

    fn sorted_history(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Vec<EditLogEntry>, RepositoryError> {
        let mut entries = self.store.list_audit_entries_by_employee(employee_id)?;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }
}
