use crate::infra::{seeded_store, LoggedOutbox};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use manager_hub::config::AccountabilityConfig;
use manager_hub::error::AppError;
use manager_hub::workflows::accountability::notification::NoPause;
use manager_hub::workflows::accountability::{
    AccountabilityService, EmployeeId, FixedClock, InMemoryRecordStore, InfractionSubmission,
    PointAdjustmentRequest, ProcessOutcome, RequestContext, SystemRole,
};
use std::sync::Arc;

const DEMO_LOCATION: &str = "Downtown";
const DEMO_MANAGER: &str = "casey.lin@manager-hub.local";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the business date the demo runs on (defaults to today).
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Skip the director dashboard portion of the demo output.
    #[arg(long)]
    pub(crate) skip_dashboard: bool,
}

type DemoService = AccountabilityService<InMemoryRecordStore, LoggedOutbox>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        skip_dashboard,
    } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    let store = Arc::new(seeded_store()?);
    let outbox = Arc::new(LoggedOutbox::default());
    let config = AccountabilityConfig {
        email_retry_delay: std::time::Duration::ZERO,
        ..AccountabilityConfig::default()
    };
    let service = AccountabilityService::with_runtime(
        store.clone(),
        outbox.clone(),
        &config,
        Arc::new(FixedClock::on(today)),
        Arc::new(NoPause),
    );

    println!("Accountability points demo ({today})");

    println!("\nInfraction intake");
    let script = [
        ("10482", "Moderate", 6),
        ("10482", "Major", 0),
        ("10517", "Minor", 5),
        ("10517", "Severe", 0),
        ("10533", "Minor", 2),
    ];
    for (employee_id, infraction_type, days_back) in script {
        let form = demo_submission(employee_id, infraction_type, today - Duration::days(days_back));
        let outcome = service.submit_infraction(&form)?;
        render_outcome(employee_id, infraction_type, &outcome);
    }

    let rejected = InfractionSubmission {
        date: Some(today - Duration::days(10)),
        ..demo_submission("10533", "Minor", today)
    };
    let outcome = service.submit_infraction(&rejected)?;
    render_outcome("10533", "Minor", &outcome);

    println!("\nPoint adjustments");
    let manager = RequestContext::new(DEMO_MANAGER, SystemRole::Manager);
    let credit = service.add_positive_credit(
        &PointAdjustmentRequest {
            employee_id: "10482".to_string(),
            points: 2,
            reason: demo_narrative("Covered two short-staffed closing shifts without being asked"),
            entered_by: DEMO_MANAGER.to_string(),
            location: Some(DEMO_LOCATION.to_string()),
        },
        &manager,
    )?;
    println!(
        "- Credit for {}: {} -> {} points",
        credit.infraction.employee_id, credit.previous_points, credit.new_points
    );

    let removal = service.remove_points(
        &PointAdjustmentRequest {
            employee_id: "10517".to_string(),
            points: 3,
            reason: demo_narrative("Completed the food safety refresher course with a passing score"),
            entered_by: DEMO_MANAGER.to_string(),
            location: None,
        },
        &manager,
    )?;
    println!(
        "- Removal for {}: {} -> {} points",
        removal.infraction.employee_id, removal.previous_points, removal.new_points
    );

    println!("\nOutbound notifications");
    let sent = outbox.outbox().sent();
    if sent.is_empty() {
        println!("- none");
    }
    for message in &sent {
        println!("- {} -> {}", message.subject, message.recipients.join(", "));
    }

    if skip_dashboard {
        return Ok(());
    }

    render_dashboard(&service, today)
}

fn render_outcome(employee_id: &str, infraction_type: &str, outcome: &ProcessOutcome) {
    if !outcome.success {
        println!("- {employee_id} {infraction_type}: rejected ({})", outcome.message);
        return;
    }

    let crossed = if outcome.thresholds_crossed.is_empty() {
        "none".to_string()
    } else {
        outcome
            .thresholds_crossed
            .iter()
            .map(|value| format!("{value}"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    println!(
        "- {employee_id} {infraction_type}: {} -> {} points | thresholds crossed: {crossed} | email {:?}",
        outcome.old_points, outcome.new_points, outcome.email_status
    );
    if outcome.duplicate_warning {
        println!("  Possible duplicate of an existing record");
    }
}

fn render_dashboard(service: &DemoService, today: NaiveDate) -> Result<(), AppError> {
    let director = RequestContext::new("avery.stone@manager-hub.local", SystemRole::Director);
    let manager = RequestContext::new(DEMO_MANAGER, SystemRole::Manager);

    for (label, ctx) in [("Director", &director), ("Manager", &manager)] {
        println!("\n{label} dashboard");
        for row in service.get_employees_with_points(ctx)? {
            println!(
                "- {} ({}) {} points | {} | next expiration {}",
                row.full_name,
                row.primary_location,
                row.total_points,
                row.current_consequence.as_deref().unwrap_or("no consequence"),
                row.next_expiration_date
                    .map(|date| date.to_string())
                    .unwrap_or_else(|| "n/a".to_string())
            );
        }
    }

    let jordan = EmployeeId("10482".to_string());
    println!("\nEmployee detail for {jordan}");
    match service.get_employee_detail(&jordan, &director) {
        Ok(detail) => {
            println!(
                "- {} points today, highest ever {}",
                detail.summary.total_points, detail.highest_points_ever
            );
            for entry in &detail.edit_history {
                println!(
                    "  audit {} {} by {}: {} -> {}",
                    entry.action_type.label(),
                    entry.field_changed,
                    entry.actor_identity,
                    entry.original_value,
                    entry.new_value
                );
            }
        }
        Err(err) => println!("  Detail unavailable: {err}"),
    }

    let after_window = today + Duration::days(91);
    let later = service.calculate_points(&jordan, Some(after_window))?;
    println!(
        "- On {after_window}: {} points ({} records expired)",
        later.total_points,
        later.expired_infractions.len()
    );

    let salaried = EmployeeId("30002".to_string());
    if let Err(err) = service.get_employee_detail(&salaried, &manager) {
        println!("\nManager view of {salaried}: {err}");
    }

    Ok(())
}

fn demo_submission(
    employee_id: &str,
    infraction_type: &str,
    date: NaiveDate,
) -> InfractionSubmission {
    InfractionSubmission {
        employee_id: employee_id.to_string(),
        date: Some(date),
        infraction_type: infraction_type.to_string(),
        points: None,
        description: demo_narrative("Shift lead documented the incident during the closing checklist"),
        location: DEMO_LOCATION.to_string(),
        entered_by: DEMO_MANAGER.to_string(),
    }
}

fn demo_narrative(summary: &str) -> String {
    format!(
        "{summary}. The employee was spoken to privately, the conversation was witnessed by a \
         second lead, and the employee acknowledged the notes. Follow-up expectations were \
         reviewed against the handbook and the manager on duty signed off on the summary before \
         the end of the shift."
    )
}
