use serde::Serialize;
use tracing::{error, info};

use super::domain::{EmployeeId, InfractionId};
use super::lifecycle::{InfractionLifecycle, InfractionSubmission, LifecycleError};
use super::notification::{
    build_threshold_email, NotificationMetadata, ThresholdEmailInput, ThresholdNotifier,
};
use super::points::summarize;
use super::repository::{NotificationChannel, RecordStore};
use super::thresholds::SeverityTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EmailStatus {
    #[serde(rename = "Not Required")]
    NotRequired,
    Sent,
    Failed,
    /// The infraction was rejected, so nothing was evaluated.
    Skipped,
}

impl EmailStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EmailStatus::NotRequired => "Not Required",
            EmailStatus::Sent => "Sent",
            EmailStatus::Failed => "Failed",
            EmailStatus::Skipped => "Skipped",
        }
    }
}

/// What happened end to end. Returned even when the alert could not be delivered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessOutcome {
    pub success: bool,
    pub infraction_id: Option<InfractionId>,
    pub old_points: i32,
    pub new_points: i32,
    pub thresholds_crossed: Vec<f64>,
    pub email_sent: bool,
    pub email_status: EmailStatus,
    pub duplicate_warning: bool,
    pub message: String,
}

impl ProcessOutcome {
    fn rejected(message: String) -> Self {
        Self {
            success: false,
            infraction_id: None,
            old_points: 0,
            new_points: 0,
            thresholds_crossed: Vec::new(),
            email_sent: false,
            email_status: EmailStatus::Skipped,
            duplicate_warning: false,
            message,
        }
    }
}

/// Alert recipients by severity tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRouting {
    pub operations: String,
    pub escalation: Vec<String>,
}

impl AlertRouting {
    pub fn recipients_for(&self, tier: SeverityTier) -> Vec<String> {
        match tier {
            SeverityTier::Termination => self.escalation.clone(),
            SeverityTier::FinalWarning | SeverityTier::Informational => {
                vec![self.operations.clone()]
            }
        }
    }
}

/// Snapshot, record, recompute, detect, notify.
pub struct InfractionOrchestrator<'a, S, C> {
    store: &'a S,
    lifecycle: &'a InfractionLifecycle<S>,
    notifier: &'a ThresholdNotifier<S, C>,
    routing: &'a AlertRouting,
}

impl<'a, S, C> InfractionOrchestrator<'a, S, C>
where
    S: RecordStore + 'static,
    C: NotificationChannel + 'static,
{
    pub fn new(
        store: &'a S,
        lifecycle: &'a InfractionLifecycle<S>,
        notifier: &'a ThresholdNotifier<S, C>,
        routing: &'a AlertRouting,
    ) -> Self {
        Self {
            store,
            lifecycle,
            notifier,
            routing,
        }
    }

    /// Validation failures come back as `success: false`; only store failures are errors.
    pub fn process_infraction_with_notifications(
        &self,
        submission: &InfractionSubmission,
    ) -> Result<ProcessOutcome, LifecycleError> {
        let employee_id = EmployeeId(submission.employee_id.trim().to_string());

        let recorded = self
            .lifecycle
            .locks()
            .with_lock(&employee_id.0, || -> Result<_, LifecycleError> {
                let settings = self.store.settings()?;
                let today = self.lifecycle.today();

                let before = self.store.list_infractions_by_employee(&employee_id)?;
                let old_points = summarize(&employee_id, &before, today).total_points;

                let recorded = match self.lifecycle.add_infraction_locked(submission, &settings) {
                    Ok(recorded) => recorded,
                    Err(LifecycleError::Validation(err)) => return Ok(Err(err)),
                    Err(other) => return Err(other),
                };

                let after = self.store.list_infractions_by_employee(&employee_id)?;
                let summary = summarize(&employee_id, &after, today);
                Ok(Ok((recorded, old_points, summary, settings)))
            })?;

        let (recorded, old_points, summary, settings) = match recorded {
            Ok(parts) => parts,
            Err(validation) => return Ok(ProcessOutcome::rejected(validation.to_string())),
        };

        let new_points = summary.total_points;
        let infraction = recorded.infraction;
        let crossed = settings
            .thresholds
            .detect(f64::from(old_points), f64::from(new_points));

        let mut outcome = ProcessOutcome {
            success: true,
            infraction_id: Some(infraction.infraction_id.clone()),
            old_points,
            new_points,
            thresholds_crossed: crossed.clone(),
            email_sent: false,
            email_status: EmailStatus::NotRequired,
            duplicate_warning: recorded.duplicate_warning,
            message: "Infraction recorded".to_string(),
        };
        if recorded.duplicate_warning {
            outcome.message =
                "Infraction recorded; a similar infraction already exists for this date".to_string();
        }

        if crossed.is_empty() {
            return Ok(outcome);
        }

        info!(
            employee_id = %employee_id,
            old_points,
            new_points,
            thresholds = ?crossed,
            "point thresholds crossed"
        );

        let input = ThresholdEmailInput {
            employee_name: infraction.full_name.clone(),
            employee_id: employee_id.clone(),
            current_points: f64::from(new_points),
            thresholds_crossed: crossed.clone(),
            infractions: summary.active_infractions.clone(),
            as_of: summary.as_of,
        };
        let email = match build_threshold_email(&input, &settings.thresholds) {
            Ok(email) => email,
            Err(err) => {
                error!(
                    employee_id = %employee_id,
                    error = %err,
                    "threshold email could not be composed"
                );
                outcome.email_status = EmailStatus::Failed;
                outcome.message = format!("{}; notification failed", outcome.message);
                return Ok(outcome);
            }
        };

        let recipients = self
            .routing
            .recipients_for(SeverityTier::from_crossed(&crossed));
        let metadata = NotificationMetadata {
            employee_id: employee_id.clone(),
            employee_name: infraction.full_name.clone(),
            thresholds: crossed,
        };
        let sent = self.notifier.send_threshold_email(
            &recipients,
            &email.subject,
            &email.body_html,
            &email.body_text,
            &metadata,
        );

        outcome.email_sent = sent.success;
        outcome.email_status = if sent.success {
            EmailStatus::Sent
        } else {
            EmailStatus::Failed
        };
        outcome.message = if sent.success {
            format!("{}; threshold notification sent", outcome.message)
        } else {
            format!("{}; threshold notification failed", outcome.message)
        };

        Ok(outcome)
    }
}
