use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use super::super::domain::{DeliveryStatus, EmployeeId, LogId, SendLogEntry};
use super::super::repository::{Clock, NotificationChannel, NotificationError, RecordStore};

/// Hard ceiling on delivery attempts: the first try plus one retry.
const MAX_DELIVERY_ATTEMPTS: u32 = 2;

/// Fixed-delay retry budget for outbound alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Attempts are clamped to `1..=2`.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_DELIVERY_ATTEMPTS),
            delay,
        }
    }

    pub fn once_after(delay: Duration) -> Self {
        Self::new(MAX_DELIVERY_ATTEMPTS, delay)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn allows_another(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once_after(Duration::from_secs(2))
    }
}

/// Waits out the backoff between attempts.
pub trait Pause: Send + Sync {
    fn pause(&self, delay: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// Skips the backoff entirely.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPause;

impl Pause for NoPause {
    fn pause(&self, _delay: Duration) {}
}

/// Tags written to the send log alongside each dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationMetadata {
    pub employee_id: EmployeeId,
    pub employee_name: String,
    pub thresholds: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    pub success: bool,
    pub log_id: Option<LogId>,
    pub status: DeliveryStatus,
    pub attempts: u32,
    pub message: String,
}

/// Delivers threshold alerts with a single retry and an admin fallback on failure.
pub struct ThresholdNotifier<S, C> {
    store: Arc<S>,
    channel: Arc<C>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    pause: Arc<dyn Pause>,
    admin_email: String,
}

impl<S, C> ThresholdNotifier<S, C>
where
    S: RecordStore + 'static,
    C: NotificationChannel + 'static,
{
    pub fn new(
        store: Arc<S>,
        channel: Arc<C>,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
        pause: Arc<dyn Pause>,
        admin_email: String,
    ) -> Self {
        Self {
            store,
            channel,
            clock,
            policy,
            pause,
            admin_email,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Validate, deliver, and log one alert. Never fails the caller.
    pub fn send_threshold_email(
        &self,
        recipients: &[String],
        subject: &str,
        body_html: &str,
        body_text: &str,
        metadata: &NotificationMetadata,
    ) -> SendOutcome {
        let recipients: Vec<String> = recipients
            .iter()
            .map(|address| address.trim())
            .filter(|address| !address.is_empty())
            .map(str::to_string)
            .collect();

        let invalid = if recipients.is_empty() {
            Some("At least one recipient is required")
        } else if subject.trim().is_empty() {
            Some("Subject is required")
        } else if body_html.trim().is_empty() && body_text.trim().is_empty() {
            Some("Message body is required")
        } else {
            None
        };
        if let Some(message) = invalid {
            warn!(
                employee_id = %metadata.employee_id,
                reason = message,
                "threshold email not attempted"
            );
            return SendOutcome {
                success: false,
                log_id: None,
                status: DeliveryStatus::Failed,
                attempts: 0,
                message: message.to_string(),
            };
        }

        let mut attempts = 0;
        let mut last_error: Option<NotificationError> = None;
        loop {
            attempts += 1;
            match self
                .channel
                .send(&recipients, subject, body_html, body_text)
            {
                Ok(()) => {
                    last_error = None;
                    break;
                }
                Err(err) => {
                    warn!(
                        employee_id = %metadata.employee_id,
                        attempt = attempts,
                        error = %err,
                        "threshold email attempt failed"
                    );
                    last_error = Some(err);
                    if !self.policy.allows_another(attempts) {
                        break;
                    }
                    self.pause.pause(self.policy.delay());
                }
            }
        }

        let status = if last_error.is_none() {
            DeliveryStatus::Sent
        } else {
            DeliveryStatus::Failed
        };

        let now = self.clock.now();
        let entry = SendLogEntry {
            log_id: LogId::generate("SEND", now, &mut rand::thread_rng()),
            timestamp: now,
            employee_id: metadata.employee_id.clone(),
            employee_name: metadata.employee_name.clone(),
            thresholds: metadata.thresholds.clone(),
            recipients: recipients.clone(),
            subject: subject.to_string(),
            status,
            attempts,
            retry_count: attempts.saturating_sub(1),
            error: last_error.as_ref().map(|err| err.to_string()),
        };
        let log_id = match self.store.append_send_log_entry(entry) {
            Ok(id) => Some(id),
            Err(err) => {
                error!(
                    employee_id = %metadata.employee_id,
                    error = %err,
                    "unable to write send log entry"
                );
                None
            }
        };

        match last_error {
            None => {
                info!(
                    employee_id = %metadata.employee_id,
                    attempts,
                    recipients = recipients.len(),
                    "threshold email sent"
                );
                SendOutcome {
                    success: true,
                    log_id,
                    status,
                    attempts,
                    message: if attempts > 1 {
                        format!("Email sent on attempt {attempts}")
                    } else {
                        "Email sent".to_string()
                    },
                }
            }
            Some(err) => {
                error!(
                    employee_id = %metadata.employee_id,
                    attempts,
                    error = %err,
                    "threshold email failed"
                );
                self.alert_admin(metadata, subject, &err);
                SendOutcome {
                    success: false,
                    log_id,
                    status,
                    attempts,
                    message: format!("Email failed after {attempts} attempt(s): {err}"),
                }
            }
        }
    }

    /// Best-effort failure notice. Its own failure is logged and dropped.
    fn alert_admin(
        &self,
        metadata: &NotificationMetadata,
        subject: &str,
        cause: &NotificationError,
    ) {
        let admin = self.admin_email.trim();
        if admin.is_empty() {
            warn!("no admin address configured; delivery failure notice skipped");
            return;
        }

        let thresholds = metadata
            .thresholds
            .iter()
            .map(|value| super::compose::format_points(*value))
            .collect::<Vec<_>>()
            .join(", ");
        let text = format!(
            "A threshold alert could not be delivered.\n\nEmployee: {} ({})\nThresholds: {}\nOriginal subject: {}\nError: {}\n",
            metadata.employee_name, metadata.employee_id, thresholds, subject, cause
        );
        let html = text
            .lines()
            .map(|line| format!("<p>{}</p>", line.replace('&', "&amp;").replace('<', "&lt;")))
            .collect::<String>();

        if let Err(err) = self.channel.send(
            &[admin.to_string()],
            "[Manager Hub] Threshold email delivery failed",
            &html,
            &text,
        ) {
            warn!(error = %err, "admin delivery failure notice could not be sent");
        }
    }
}
