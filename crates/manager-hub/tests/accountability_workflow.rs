//! End-to-end behavior of the accountability points engine through the public service facade
//! and HTTP router, backed by the in-memory store and outbox.

mod common {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::NaiveDate;

    use manager_hub::config::AccountabilityConfig;
    use manager_hub::workflows::accountability::notification::NoPause;
    use manager_hub::workflows::accountability::{
        AccountabilityService, Employee, EmployeeId, EmployeeStatus, FixedClock, InMemoryChannel,
        InMemoryRecordStore, InfractionSubmission, SystemRole,
    };

    pub(super) fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 4).expect("valid date")
    }

    pub(super) fn narrative(topic: &str) -> String {
        let detail = "Details confirmed with the shift lead and logged the same day. ";
        format!("{topic}. {}", detail.repeat(5))
    }

    pub(super) fn employee(id: &str, name: &str, role: Option<SystemRole>) -> Employee {
        Employee {
            employee_id: EmployeeId(id.to_string()),
            full_name: name.to_string(),
            primary_location: "Riverside".to_string(),
            status: EmployeeStatus::Active,
            system_role: role,
        }
    }

    pub(super) fn submission(
        employee_id: &str,
        infraction_type: &str,
        date: NaiveDate,
    ) -> InfractionSubmission {
        InfractionSubmission {
            employee_id: employee_id.to_string(),
            date: Some(date),
            infraction_type: infraction_type.to_string(),
            points: None,
            description: narrative("Incident recorded from the shift report"),
            location: "Riverside".to_string(),
            entered_by: "lead@hub.test".to_string(),
        }
    }

    pub(super) fn build() -> (
        Arc<AccountabilityService<InMemoryRecordStore, InMemoryChannel>>,
        Arc<InMemoryRecordStore>,
        Arc<InMemoryChannel>,
    ) {
        let store = Arc::new(InMemoryRecordStore::default());
        for row in [
            employee("E1", "Dana Ortiz", None),
            employee("E2", "Lee Park", None),
            employee("M1", "Kim Vale", Some(SystemRole::Manager)),
            employee("D1", "Pat Gray", Some(SystemRole::Director)),
        ] {
            store.upsert_employee(row).expect("seed employee");
        }

        let channel = Arc::new(InMemoryChannel::default());
        let config = AccountabilityConfig {
            email_retry_delay: Duration::ZERO,
            ..AccountabilityConfig::default()
        };
        let service = AccountabilityService::with_runtime(
            store.clone(),
            channel.clone(),
            &config,
            Arc::new(FixedClock::on(today())),
            Arc::new(NoPause),
        );
        (Arc::new(service), store, channel)
    }
}

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Duration;
use tower::ServiceExt;

use manager_hub::workflows::accountability::{
    accountability_router, EmailStatus, EmployeeId, InfractionChanges, PointAdjustmentRequest,
    RequestContext, SystemRole,
};

use common::*;

#[test]
fn points_accumulate_alert_and_unwind_through_the_audited_lifecycle() {
    let (service, store, channel) = build();
    let dana = EmployeeId("E1".to_string());

    let first = service
        .submit_infraction(&submission("E1", "Moderate", today() - Duration::days(6)))
        .expect("processed");
    assert_eq!(first.new_points, 3);
    assert_eq!(first.thresholds_crossed, vec![2.0, 3.0]);
    assert_eq!(first.email_status, EmailStatus::Sent);

    let second = service
        .submit_infraction(&submission("E1", "Severe", today()))
        .expect("processed");
    assert_eq!(second.old_points, 3);
    assert_eq!(second.new_points, 11);
    assert_eq!(second.thresholds_crossed, vec![5.0, 6.0, 9.0]);

    let sent = channel.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[1].subject.starts_with("[FINAL WARNING]"));

    let director = RequestContext::new("pat.gray@hub.test", SystemRole::Director);
    let manager = RequestContext::new("kim.vale@hub.test", SystemRole::Manager);
    let severe_id = second.infraction_id.expect("id assigned");
    service
        .edit_infraction(
            &severe_id,
            &InfractionChanges {
                infraction_type: Some("Major".to_string()),
                points: Some(5),
                ..InfractionChanges::default()
            },
            &narrative("Director review reclassified the incident"),
            &director,
        )
        .expect("edited");
    assert_eq!(
        service.calculate_points(&dana, None).expect("points").total_points,
        8
    );

    let removal = service
        .remove_points(
            &PointAdjustmentRequest {
                employee_id: "E1".to_string(),
                points: 2,
                reason: narrative("Completed the corrective training module"),
                entered_by: "kim.vale@hub.test".to_string(),
                location: None,
            },
            &manager,
        )
        .expect("removed");
    assert_eq!(removal.previous_points, 8);
    assert_eq!(removal.new_points, 6);

    // Decreases never alert.
    assert_eq!(channel.sent().len(), 2);

    let detail = service
        .get_employee_detail(&dana, &director)
        .expect("visible");
    assert_eq!(detail.summary.total_points, 6);
    assert_eq!(detail.highest_points_ever, 8);
    assert_eq!(detail.edit_history.len(), 3);

    let after_window = today() + Duration::days(91);
    let later = service
        .calculate_points(&dana, Some(after_window))
        .expect("points");
    assert_eq!(later.total_points, 0);
    assert_eq!(later.expired_infractions.len(), 3);

    assert_eq!(store.send_log().expect("send log").len(), 2);
}

#[test]
fn managers_cannot_see_salaried_staff() {
    let (service, _store, _channel) = build();
    let manager = RequestContext::new("kim.vale@hub.test", SystemRole::Manager);

    let rows = service
        .get_employees_with_points(&manager)
        .expect("list");
    let names: Vec<&str> = rows.iter().map(|row| row.full_name.as_str()).collect();

    assert_eq!(names, vec!["Dana Ortiz", "Lee Park"]);
}

#[tokio::test]
async fn router_exposes_the_engine_over_http() {
    let (service, _store, _channel) = build();
    let router = accountability_router(service);

    let payload = serde_json::to_vec(&submission("E2", "Major", today())).expect("json");
    let response = router
        .clone()
        .oneshot(
            Request::post("/api/v1/accountability/infractions")
                .header("content-type", "application/json")
                .header("x-hub-user", "kim.vale@hub.test")
                .header("x-hub-role", "Manager")
                .body(Body::from(payload))
                .expect("request"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .oneshot(
            Request::get("/api/v1/accountability/employees/E2")
                .header("x-hub-user", "kim.vale@hub.test")
                .header("x-hub-role", "Manager")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body");
    let detail: serde_json::Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(detail["summary"]["total_points"], serde_json::json!(5));
}
