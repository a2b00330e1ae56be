use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{EmployeeId, InfractionId, SystemRole};
use super::lifecycle::{
    InfractionChanges, InfractionSubmission, LifecycleError, PointAdjustmentRequest,
};
use super::repository::{NotificationChannel, RecordStore};
use super::service::{AccountabilityService, VisibilityError};
use super::visibility::RequestContext;

pub const USER_HEADER: &str = "x-hub-user";
pub const ROLE_HEADER: &str = "x-hub-role";
pub const DIRECTOR_VISIBILITY_HEADER: &str = "x-hub-can-see-directors";

#[derive(Debug, Deserialize)]
pub(crate) struct EditInfractionRequest {
    pub(crate) reason: String,
    #[serde(default)]
    pub(crate) changes: InfractionChanges,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReasonRequest {
    pub(crate) reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PointsQuery {
    pub(crate) as_of: Option<NaiveDate>,
}

/// Router builder exposing the points engine to the forms layer.
pub fn accountability_router<S, C>(service: Arc<AccountabilityService<S, C>>) -> Router
where
    S: RecordStore + 'static,
    C: NotificationChannel + 'static,
{
    Router::new()
        .route(
            "/api/v1/accountability/infractions",
            post(submit_handler::<S, C>),
        )
        .route(
            "/api/v1/accountability/infractions/:infraction_id",
            patch(edit_handler::<S, C>).delete(delete_handler::<S, C>),
        )
        .route(
            "/api/v1/accountability/credits",
            post(credit_handler::<S, C>),
        )
        .route(
            "/api/v1/accountability/point-removals",
            post(removal_handler::<S, C>),
        )
        .route(
            "/api/v1/accountability/employees",
            get(employees_handler::<S, C>),
        )
        .route(
            "/api/v1/accountability/employees/:employee_id",
            get(detail_handler::<S, C>),
        )
        .route(
            "/api/v1/accountability/employees/:employee_id/points",
            get(points_handler::<S, C>),
        )
        .route(
            "/api/v1/accountability/employees/:employee_id/history",
            get(history_handler::<S, C>),
        )
        .route(
            "/api/v1/accountability/employees/:employee_id/terminate",
            post(terminate_handler::<S, C>),
        )
        .with_state(service)
}

/// Build the request-scoped context from the forwarded session headers.
pub(crate) fn request_context(headers: &HeaderMap) -> Result<RequestContext, Response> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let user_id = header(USER_HEADER).ok_or_else(|| unauthorized("missing requester identity"))?;
    let role = header(ROLE_HEADER)
        .and_then(SystemRole::parse)
        .ok_or_else(|| unauthorized("missing or unknown requester role"))?;
    let can_see_directors = header(DIRECTOR_VISIBILITY_HEADER)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false);

    Ok(RequestContext::new(user_id, role).seeing_directors(can_see_directors))
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
}

pub(crate) fn lifecycle_error_response(err: LifecycleError) -> Response {
    let status = match &err {
        LifecycleError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LifecycleError::InfractionNotFound(_) | LifecycleError::EmployeeNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        LifecycleError::PermissionDenied => StatusCode::FORBIDDEN,
        LifecycleError::Repository(source) => {
            error!(error = %source, "record store failure");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "The record store is unavailable. Please try again." })),
            )
                .into_response();
        }
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

pub(crate) fn visibility_error_response(err: VisibilityError) -> Response {
    match err {
        VisibilityError::PermissionDenied => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
        VisibilityError::Repository(source) => {
            error!(error = %source, "record store failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "The record store is unavailable. Please try again." })),
            )
                .into_response()
        }
    }
}

pub(crate) async fn submit_handler<S, C>(
    State(service): State<Arc<AccountabilityService<S, C>>>,
    headers: HeaderMap,
    Json(submission): Json<InfractionSubmission>,
) -> Response
where
    S: RecordStore + 'static,
    C: NotificationChannel + 'static,
{
    let ctx = match request_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let submission = InfractionSubmission {
        entered_by: ctx.user_id,
        ..submission
    };

    // Dispatch may pause between delivery attempts.
    let joined =
        tokio::task::spawn_blocking(move || service.submit_infraction(&submission)).await;

    match joined {
        Ok(Ok(outcome)) if outcome.success => {
            (StatusCode::CREATED, Json(outcome)).into_response()
        }
        Ok(Ok(outcome)) => (StatusCode::UNPROCESSABLE_ENTITY, Json(outcome)).into_response(),
        Ok(Err(err)) => lifecycle_error_response(err),
        Err(join_error) => {
            error!(error = %join_error, "infraction submission task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Infraction could not be processed" })),
            )
                .into_response()
        }
    }
}

pub(crate) async fn edit_handler<S, C>(
    State(service): State<Arc<AccountabilityService<S, C>>>,
    Path(infraction_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<EditInfractionRequest>,
) -> Response
where
    S: RecordStore + 'static,
    C: NotificationChannel + 'static,
{
    let ctx = match request_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let id = InfractionId(infraction_id);
    match service.edit_infraction(&id, &request.changes, &request.reason, &ctx) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => lifecycle_error_response(err),
    }
}

pub(crate) async fn delete_handler<S, C>(
    State(service): State<Arc<AccountabilityService<S, C>>>,
    Path(infraction_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ReasonRequest>,
) -> Response
where
    S: RecordStore + 'static,
    C: NotificationChannel + 'static,
{
    let ctx = match request_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let id = InfractionId(infraction_id);
    match service.delete_infraction(&id, &request.reason, &ctx) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => lifecycle_error_response(err),
    }
}

pub(crate) async fn credit_handler<S, C>(
    State(service): State<Arc<AccountabilityService<S, C>>>,
    headers: HeaderMap,
    Json(request): Json<PointAdjustmentRequest>,
) -> Response
where
    S: RecordStore + 'static,
    C: NotificationChannel + 'static,
{
    let ctx = match request_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.add_positive_credit(&request, &ctx) {
        Ok(adjustment) => (StatusCode::CREATED, Json(adjustment)).into_response(),
        Err(err) => lifecycle_error_response(err),
    }
}

pub(crate) async fn removal_handler<S, C>(
    State(service): State<Arc<AccountabilityService<S, C>>>,
    headers: HeaderMap,
    Json(request): Json<PointAdjustmentRequest>,
) -> Response
where
    S: RecordStore + 'static,
    C: NotificationChannel + 'static,
{
    let ctx = match request_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.remove_points(&request, &ctx) {
        Ok(adjustment) => (StatusCode::CREATED, Json(adjustment)).into_response(),
        Err(err) => lifecycle_error_response(err),
    }
}

pub(crate) async fn employees_handler<S, C>(
    State(service): State<Arc<AccountabilityService<S, C>>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    C: NotificationChannel + 'static,
{
    let ctx = match request_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.get_employees_with_points(&ctx) {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => visibility_error_response(err.into()),
    }
}

pub(crate) async fn detail_handler<S, C>(
    State(service): State<Arc<AccountabilityService<S, C>>>,
    Path(employee_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    C: NotificationChannel + 'static,
{
    let ctx = match request_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.get_employee_detail(&EmployeeId(employee_id), &ctx) {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(err) => visibility_error_response(err),
    }
}

pub(crate) async fn history_handler<S, C>(
    State(service): State<Arc<AccountabilityService<S, C>>>,
    Path(employee_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
    C: NotificationChannel + 'static,
{
    let ctx = match request_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.edit_history(&EmployeeId(employee_id), &ctx) {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(err) => visibility_error_response(err),
    }
}

pub(crate) async fn points_handler<S, C>(
    State(service): State<Arc<AccountabilityService<S, C>>>,
    Path(employee_id): Path<String>,
    Query(query): Query<PointsQuery>,
) -> Response
where
    S: RecordStore + 'static,
    C: NotificationChannel + 'static,
{
    match service.calculate_points(&EmployeeId(employee_id), query.as_of) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => visibility_error_response(err.into()),
    }
}

pub(crate) async fn terminate_handler<S, C>(
    State(service): State<Arc<AccountabilityService<S, C>>>,
    Path(employee_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ReasonRequest>,
) -> Response
where
    S: RecordStore + 'static,
    C: NotificationChannel + 'static,
{
    let ctx = match request_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.terminate_employee(&EmployeeId(employee_id), &request.reason, &ctx) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => lifecycle_error_response(err),
    }
}
