use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use leadquote_core::domain::submission::RawSubmission;
use leadquote_core::errors::{ApplicationError, DomainError, InterfaceError};
use leadquote_core::pipeline::{AcceptedSubmission, SubmissionContext, SubmissionPipeline};
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_REQUEST_ID_LEN: usize = 128;

#[derive(Clone)]
pub struct QuoteState {
    pipeline: SubmissionPipeline,
}

pub fn router(pipeline: SubmissionPipeline) -> Router {
    Router::new().route("/api/quote", post(submit_quote)).with_state(QuoteState { pipeline })
}

pub async fn submit_quote(
    State(state): State<QuoteState>,
    headers: HeaderMap,
    payload: Result<Json<RawSubmission>, JsonRejection>,
) -> Response {
    let request_id = request_id(&headers);

    let raw = match payload {
        Ok(Json(raw)) => raw,
        Err(rejection) => {
            warn!(
                event_name = "quote.request.rejected",
                correlation_id = %request_id,
                reason = %rejection.body_text(),
                "quote request body could not be parsed"
            );
            let details = json!([{ "field": "body", "message": rejection.body_text() }]);
            return validation_failure("invalid_request", details, &request_id);
        }
    };

    let context = SubmissionContext::new(request_id.clone());
    match state.pipeline.submit(raw, &context).await {
        Ok(accepted) => {
            info!(
                event_name = "quote.request.accepted",
                correlation_id = %request_id,
                submission_id = %accepted.submission_id,
                status = accepted.status.as_str(),
                replayed = accepted.replayed,
                "quote request accepted"
            );
            accepted_response(&accepted, &request_id)
        }
        Err(failure) => failure_response(failure, &request_id),
    }
}

/// Honors a caller-supplied id when it is printable and short, otherwise mints one.
fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty() && value.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn accepted_response(accepted: &AcceptedSubmission, request_id: &str) -> Response {
    let body = json!({
        "ok": true,
        "submission_id": accepted.submission_id,
        "contact_id": accepted.contact_id,
        "status": accepted.status,
        "replayed": accepted.replayed,
        "derived": accepted.derived,
        "request_id": request_id,
    });
    with_request_id(StatusCode::OK, body, request_id)
}

fn failure_response(failure: ApplicationError, request_id: &str) -> Response {
    let details = match &failure {
        ApplicationError::Domain(DomainError::InvalidShape(violations)) => {
            Some(serde_json::to_value(violations))
        }
        ApplicationError::Domain(DomainError::InvalidEnums(violations)) => {
            Some(serde_json::to_value(violations))
        }
        _ => None,
    };
    let interface = failure.clone().into_interface(request_id);

    match (interface, details) {
        (InterfaceError::BadRequest { code, .. }, Some(details)) => {
            warn!(
                event_name = "quote.request.invalid",
                correlation_id = %request_id,
                code,
                "quote request failed validation"
            );
            validation_failure(code, details.unwrap_or(Value::Null), request_id)
        }
        (interface, _) => {
            error!(
                event_name = "quote.request.failed",
                correlation_id = %request_id,
                code = interface.code(),
                retryable = failure.is_retryable(),
                error = %failure,
                "quote request failed"
            );
            let status = match interface {
                InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
                InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                InterfaceError::UpstreamFailure { .. } => StatusCode::BAD_GATEWAY,
                InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let body = json!({
                "ok": false,
                "error": { "code": interface.code(), "message": interface.user_message() },
                "request_id": request_id,
            });
            with_request_id(status, body, request_id)
        }
    }
}

fn validation_failure(code: &str, details: Value, request_id: &str) -> Response {
    let body = json!({
        "ok": false,
        "error": { "code": code, "details": details },
        "request_id": request_id,
    });
    with_request_id(StatusCode::BAD_REQUEST, body, request_id)
}

fn with_request_id(status: StatusCode, body: Value, request_id: &str) -> Response {
    let mut response = (status, Json(body)).into_response();
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
