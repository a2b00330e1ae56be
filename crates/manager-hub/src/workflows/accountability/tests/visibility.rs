use super::common::*;

use crate::workflows::accountability::domain::{EmployeeId, SystemRole};
use crate::workflows::accountability::lifecycle::{
    InfractionChanges, LifecycleError, PointAdjustmentRequest,
};
use crate::workflows::accountability::repository::RecordStore;
use crate::workflows::accountability::service::VisibilityError;
use crate::workflows::accountability::visibility::{
    check_view_permission, filter_visible_employees, RequestContext,
};

fn ctx(role: SystemRole) -> RequestContext {
    RequestContext::new("requester@hub.test", role)
}

fn visible_ids(requester: &RequestContext) -> Vec<String> {
    filter_visible_employees(requester, roster())
        .into_iter()
        .map(|employee| employee.employee_id.0)
        .collect()
}

#[test]
fn rule_table_matches_every_role_pair() {
    let manager = ctx(SystemRole::Manager);
    let director = ctx(SystemRole::Director);
    let senior_director = ctx(SystemRole::Director).seeing_directors(true);
    let operator = ctx(SystemRole::Operator);

    for requester in [&manager, &director, &senior_director, &operator] {
        assert!(check_view_permission(requester, None));
        assert!(!check_view_permission(requester, Some(SystemRole::Operator)));
    }

    assert!(!check_view_permission(&manager, Some(SystemRole::Manager)));
    assert!(!check_view_permission(&manager, Some(SystemRole::Director)));

    assert!(check_view_permission(&director, Some(SystemRole::Manager)));
    assert!(!check_view_permission(&director, Some(SystemRole::Director)));
    assert!(check_view_permission(&senior_director, Some(SystemRole::Director)));

    assert!(check_view_permission(&operator, Some(SystemRole::Manager)));
    assert!(check_view_permission(&operator, Some(SystemRole::Director)));
}

#[test]
fn director_without_flag_sees_no_directors_or_operators() {
    let ids = visible_ids(&ctx(SystemRole::Director));

    assert!(ids.contains(&HOURLY.to_string()));
    assert!(ids.contains(&MANAGER.to_string()));
    assert!(!ids.contains(&DIRECTOR.to_string()));
    assert!(!ids.contains(&OPERATOR.to_string()));
}

#[test]
fn managers_only_see_hourly_staff() {
    let ids = visible_ids(&ctx(SystemRole::Manager));
    assert_eq!(ids, vec![HOURLY.to_string(), INACTIVE.to_string()]);
}

#[test]
fn service_list_skips_inactive_staff_and_sorts_by_points() {
    let (service, store, _channel) = build_service();
    seed_infraction(&store, MANAGER, 1, days_ago(2), 5);
    seed_infraction(&store, HOURLY, 2, days_ago(2), 2);

    let rows = service
        .get_employees_with_points(&ctx(SystemRole::Operator))
        .expect("list");

    let ids: Vec<&str> = rows.iter().map(|row| row.employee_id.0.as_str()).collect();
    assert_eq!(ids, vec![MANAGER, HOURLY, DIRECTOR]);
    assert_eq!(rows[0].total_points, 5);
    assert_eq!(rows[0].current_consequence.as_deref(), Some("Written warning"));
    assert_eq!(rows[2].current_consequence, None);
}

#[test]
fn detail_for_hidden_or_unknown_employee_is_denied_alike() {
    let (service, _store, _channel) = build_service();

    let err = service
        .get_employee_detail(&EmployeeId(DIRECTOR.to_string()), &ctx(SystemRole::Manager))
        .expect_err("hidden");
    assert!(matches!(err, VisibilityError::PermissionDenied));

    let err = service
        .get_employee_detail(&EmployeeId("E999".to_string()), &ctx(SystemRole::Manager))
        .expect_err("unknown");
    assert!(matches!(err, VisibilityError::PermissionDenied));

    let err = service
        .edit_history(&EmployeeId("E999".to_string()), &ctx(SystemRole::Manager))
        .expect_err("unknown history");
    assert!(matches!(err, VisibilityError::PermissionDenied));
}

#[test]
fn detail_reports_standing_and_newest_history_first() {
    let (service, store, _channel) = build_service();
    let record = seed_infraction(&store, HOURLY, 1, days_ago(2), 5);
    seed_infraction(&store, HOURLY, 2, days_ago(3), 1);
    service
        .delete_infraction(
            &record.infraction_id,
            &narrative("Entered twice"),
            &ctx(SystemRole::Manager),
        )
        .expect("deleted");

    let detail = service
        .get_employee_detail(&EmployeeId(HOURLY.to_string()), &ctx(SystemRole::Manager))
        .expect("detail");

    assert_eq!(detail.summary.total_points, 1);
    assert_eq!(detail.highest_points_ever, 1);
    assert_eq!(detail.current_consequence, None);
    assert_eq!(detail.days_until_next_expiration, Some(87));
    assert_eq!(detail.edit_history.len(), 1);
    assert_eq!(detail.employee.full_name, "Jordan Reyes");
}

#[test]
fn mutations_on_hidden_employees_are_denied() {
    let (service, store, _channel) = build_service();
    let record = seed_infraction(&store, DIRECTOR, 1, days_ago(2), 3);
    let manager = ctx(SystemRole::Manager);
    let changes = InfractionChanges {
        points: Some(1),
        ..InfractionChanges::default()
    };

    let err = service
        .edit_infraction(&record.infraction_id, &changes, &narrative("Lowering"), &manager)
        .expect_err("edit denied");
    assert!(matches!(err, LifecycleError::PermissionDenied));

    let err = service
        .delete_infraction(&record.infraction_id, &narrative("Removing"), &manager)
        .expect_err("delete denied");
    assert!(matches!(err, LifecycleError::PermissionDenied));

    let err = service
        .terminate_employee(
            &EmployeeId(OPERATOR.to_string()),
            &narrative("Separation"),
            &ctx(SystemRole::Director),
        )
        .expect_err("terminate denied");
    assert!(matches!(err, LifecycleError::PermissionDenied));

    let stored = store
        .find_infraction(&record.infraction_id)
        .expect("lookup")
        .expect("present");
    assert_eq!(stored.points, 3);
    assert!(store.audit_entries().expect("audit").is_empty());
    assert!(store.terminations().expect("terminations").is_empty());
}

#[test]
fn adjustments_record_the_requester_and_respect_visibility() {
    let (service, store, _channel) = build_service();
    seed_infraction(&store, HOURLY, 1, days_ago(2), 5);
    let request = PointAdjustmentRequest {
        employee_id: HOURLY.to_string(),
        points: 2,
        reason: narrative("Completed the refresher course"),
        entered_by: "someone.else@hub.test".to_string(),
        location: None,
    };

    let removal = service
        .remove_points(&request, &ctx(SystemRole::Manager))
        .expect("removed");
    assert_eq!(removal.infraction.entered_by, "requester@hub.test");
    let audit = store.audit_entries().expect("audit");
    assert_eq!(audit[0].actor_identity, "requester@hub.test");

    let hidden = PointAdjustmentRequest {
        employee_id: DIRECTOR.to_string(),
        ..request.clone()
    };
    let err = service
        .add_positive_credit(&hidden, &ctx(SystemRole::Manager))
        .expect_err("hidden credit");
    assert!(matches!(err, LifecycleError::PermissionDenied));

    let unknown = PointAdjustmentRequest {
        employee_id: "E999".to_string(),
        ..request
    };
    let err = service
        .remove_points(&unknown, &ctx(SystemRole::Manager))
        .expect_err("unknown removal");
    assert!(matches!(err, LifecycleError::PermissionDenied));
}
