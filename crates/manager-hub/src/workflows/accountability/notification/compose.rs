use chrono::NaiveDate;
use serde::Serialize;

use super::super::domain::{EmployeeId, Infraction};
use super::super::points::days_until;
use super::super::thresholds::{SeverityTier, ThresholdTable};

const RECENT_INFRACTION_LIMIT: usize = 5;

/// Everything needed to render a threshold alert.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdEmailInput {
    pub employee_name: String,
    pub employee_id: EmployeeId,
    pub current_points: f64,
    pub thresholds_crossed: Vec<f64>,
    pub infractions: Vec<Infraction>,
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Normal,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThresholdEmail {
    pub subject: String,
    pub body_html: String,
    pub body_text: String,
    pub priority: Priority,
}

/// Raised when an internal caller omits a required input; never a user-facing failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositionError {
    #[error("threshold email requires `{0}`")]
    MissingField(&'static str),
}

pub fn build_threshold_email(
    input: &ThresholdEmailInput,
    thresholds: &ThresholdTable,
) -> Result<ThresholdEmail, CompositionError> {
    if input.employee_name.trim().is_empty() {
        return Err(CompositionError::MissingField("employee_name"));
    }
    if input.employee_id.0.trim().is_empty() {
        return Err(CompositionError::MissingField("employee_id"));
    }
    if !input.current_points.is_finite() {
        return Err(CompositionError::MissingField("current_points"));
    }
    if input.thresholds_crossed.is_empty() {
        return Err(CompositionError::MissingField("thresholds_crossed"));
    }
    if input.infractions.is_empty() {
        return Err(CompositionError::MissingField("infractions_list"));
    }

    let mut crossed = input.thresholds_crossed.clone();
    crossed.sort_by(f64::total_cmp);

    let tier = SeverityTier::from_crossed(&crossed);
    let priority = if tier.is_high_priority() {
        Priority::High
    } else {
        Priority::Normal
    };
    let name = input.employee_name.trim();
    let points = format_points(input.current_points);

    let subject = match tier {
        SeverityTier::Termination => {
            format!("[TERMINATION REVIEW] {name} has reached {points} accountability points")
        }
        SeverityTier::FinalWarning => {
            format!("[FINAL WARNING] {name} has reached {points} accountability points")
        }
        SeverityTier::Informational => {
            format!("Accountability notice: {name} has reached {points} points")
        }
    };
    let headline = match tier {
        SeverityTier::Termination => {
            "The termination threshold has been reached. Review the record before the next shift."
        }
        SeverityTier::FinalWarning => {
            "A final-warning threshold has been crossed. Deliver the documented consequence promptly."
        }
        SeverityTier::Informational => {
            "A consequence threshold has been crossed. Follow up with the employee as outlined below."
        }
    };

    let consequences: Vec<(String, &str)> = crossed
        .iter()
        .map(|threshold| {
            (
                format_points(*threshold),
                thresholds.consequence_or_fallback(*threshold),
            )
        })
        .collect();

    let mut recent: Vec<&Infraction> = input.infractions.iter().collect();
    recent.sort_by(|a, b| b.date.cmp(&a.date));
    recent.truncate(RECENT_INFRACTION_LIMIT);

    let next_expiration = input
        .infractions
        .iter()
        .filter(|record| record.contributes() && record.expiration_date >= input.as_of)
        .min_by_key(|record| record.expiration_date);
    let expiration_line = match next_expiration {
        Some(record) => format!(
            "{} point(s) from {} expire on {} ({} days)",
            record.points,
            record.date,
            record.expiration_date,
            days_until(record.expiration_date, input.as_of)
        ),
        None => "No upcoming point expirations".to_string(),
    };

    let mut body_text = String::new();
    body_text.push_str(&format!(
        "{headline}\n\nEmployee: {name} ({})\nCurrent points: {points}\n\nThresholds crossed:\n",
        input.employee_id
    ));
    for (threshold, consequence) in &consequences {
        body_text.push_str(&format!("  - {threshold} points: {consequence}\n"));
    }
    body_text.push_str("\nMost recent infractions:\n");
    for record in &recent {
        body_text.push_str(&format!(
            "  - {} | {} | {} pts | {}\n",
            record.date, record.infraction_type, record.points, record.location
        ));
    }
    body_text.push_str(&format!("\nNext expiration: {expiration_line}\n"));

    let mut body_html = String::new();
    body_html.push_str(&format!("<p><strong>{}</strong></p>", escape_html(headline)));
    body_html.push_str(&format!(
        "<p>Employee: {} ({})<br>Current points: {}</p>",
        escape_html(name),
        escape_html(&input.employee_id.0),
        points
    ));
    body_html.push_str("<h3>Thresholds crossed</h3><ul>");
    for (threshold, consequence) in &consequences {
        body_html.push_str(&format!(
            "<li>{threshold} points: {}</li>",
            escape_html(consequence)
        ));
    }
    body_html.push_str("</ul><h3>Most recent infractions</h3><table>");
    body_html.push_str("<tr><th>Date</th><th>Type</th><th>Points</th><th>Location</th></tr>");
    for record in &recent {
        body_html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            record.date,
            escape_html(&record.infraction_type),
            record.points,
            escape_html(&record.location)
        ));
    }
    body_html.push_str("</table>");
    body_html.push_str(&format!(
        "<p>Next expiration: {}</p>",
        escape_html(&expiration_line)
    ));

    Ok(ThresholdEmail {
        subject,
        body_html,
        body_text,
        priority,
    })
}

/// Whole numbers render without a trailing `.0`.
pub(crate) fn format_points(points: f64) -> String {
    if points.fract() == 0.0 {
        format!("{points:.0}")
    } else {
        format!("{points}")
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
