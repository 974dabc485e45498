/// Bulk email endpoint
///
/// `POST /functions/v1/send-bulk-email` runs the whole pipeline for one
/// broadcast: authenticate, rate limit, authorize, parse, validate, resolve
/// recipients, dispatch, and audit each decision along the way.
use crate::{
    audit::{AuditAction, AuditRecorder, RequestMeta},
    auth::{extract_bearer_token, AuthError},
    context::AppContext,
    db::UserId,
    error::{BroadcastError, BroadcastResult},
    metrics,
    recipients::ResolveError,
    validation,
};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{post, MethodRouter},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// Build broadcast routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/functions/v1/send-bulk-email", endpoint())
        .route("/send-bulk-email", endpoint())
}

fn endpoint() -> MethodRouter<AppContext> {
    post(send_bulk_email)
        .options(preflight)
        .fallback(method_not_allowed)
}

/// Request body; absent fields read as empty and fail validation
#[derive(Debug, Default, Deserialize)]
struct BroadcastRequest {
    #[serde(default)]
    pillar: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BroadcastResponse {
    pub success: bool,
    pub message: String,
    pub recipients: usize,
    pub failures: usize,
}

async fn send_bulk_email(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("send_bulk_email", %request_id);

    match broadcast(&ctx, &headers, body, request_id).instrument(span).await {
        Ok(response) => {
            metrics::record_request("sent");
            Json(response).into_response()
        }
        Err(e) => {
            metrics::record_request(outcome_label(&e));
            e.into_response()
        }
    }
}

async fn broadcast(
    ctx: &AppContext,
    headers: &HeaderMap,
    body: Body,
    request_id: Uuid,
) -> BroadcastResult<BroadcastResponse> {
    let (Some(authenticator), Some(storage), Some(dispatcher)) =
        (&ctx.authenticator, &ctx.storage, &ctx.dispatcher)
    else {
        return Err(BroadcastError::Configuration(
            "identity provider, storage or email transport not configured".to_string(),
        ));
    };

    let audit = &storage.audit;
    let meta = RequestMeta::from_headers(headers);

    let token = extract_bearer_token(headers)
        .ok_or_else(|| BroadcastError::Authentication("missing bearer token".to_string()))?;

    let user_id = match authenticator.authenticate(&token).await {
        Ok(user_id) => user_id,
        Err(e) => {
            let reason = match &e {
                AuthError::Rejected(_) => "invalid_token",
                AuthError::Provider(_) => "identity_provider_error",
                AuthError::TimedOut => "identity_provider_timeout",
            };
            audit
                .record(
                    None,
                    AuditAction::UnauthorizedAttempt,
                    json!({ "reason": reason, "request_id": request_id }),
                    &meta,
                )
                .await;
            return Err(BroadcastError::Authentication(e.to_string()));
        }
    };

    if !ctx.rate_limiter.allow(user_id.as_str()) {
        warn!(user_id = %user_id, "Broadcast rate limit exceeded");
        audit
            .record(
                Some(&user_id),
                AuditAction::RateLimitExceeded,
                json!({ "request_id": request_id }),
                &meta,
            )
            .await;
        return Err(BroadcastError::RateLimitExceeded);
    }

    if !storage.authorizer.authorize(&user_id).await {
        audit
            .record(
                Some(&user_id),
                AuditAction::UnauthorizedAttempt,
                json!({ "reason": "not_admin", "request_id": request_id }),
                &meta,
            )
            .await;
        return Err(BroadcastError::Authorization(format!(
            "{} is not an admin",
            user_id
        )));
    }

    let request = read_request(ctx, audit, body, &user_id, &meta, request_id).await?;
    let pillar = request.pillar.trim();
    let subject = request.subject.trim();
    let content = request.content.trim();

    let errors = validation::validate(pillar, subject, content);
    if !errors.is_empty() {
        audit
            .record(
                Some(&user_id),
                AuditAction::ValidationFailed,
                json!({ "errors": errors, "request_id": request_id }),
                &meta,
            )
            .await;
        return Err(BroadcastError::InvalidInput(errors.join("; ")));
    }

    let employees = match storage.resolver.resolve(pillar).await {
        Ok(employees) => employees,
        Err(ResolveError::NoRecipients) => {
            audit
                .record(
                    Some(&user_id),
                    AuditAction::NoRecipientsFound,
                    json!({ "pillar": pillar, "request_id": request_id }),
                    &meta,
                )
                .await;
            return Err(BroadcastError::NoRecipients);
        }
        Err(ResolveError::TooMany { count, limit }) => {
            audit
                .record(
                    Some(&user_id),
                    AuditAction::TooManyRecipients,
                    json!({
                        "pillar": pillar,
                        "count": count,
                        "limit": limit,
                        "request_id": request_id
                    }),
                    &meta,
                )
                .await;
            return Err(BroadcastError::TooManyRecipients { count, limit });
        }
        Err(ResolveError::Database(e)) => {
            audit
                .record(
                    Some(&user_id),
                    AuditAction::DatabaseError,
                    json!({ "pillar": pillar, "request_id": request_id }),
                    &meta,
                )
                .await;
            return Err(BroadcastError::Database(e));
        }
    };

    audit
        .record(
            Some(&user_id),
            AuditAction::BulkEmailInitiated,
            json!({
                "pillar": pillar,
                "subject": subject,
                "recipient_count": employees.len(),
                "request_id": request_id
            }),
            &meta,
        )
        .await;

    info!(
        user_id = %user_id,
        pillar,
        recipients = employees.len(),
        "Dispatching broadcast"
    );

    let timer = metrics::DISPATCH_DURATION_SECONDS.start_timer();
    let report = dispatcher.dispatch(subject, content, &employees).await;
    timer.observe_duration();

    let action = if report.timed_out {
        AuditAction::BulkEmailTimedOut
    } else {
        AuditAction::BulkEmailCompleted
    };
    audit
        .record(
            Some(&user_id),
            action,
            json!({
                "pillar": pillar,
                "subject": subject,
                "recipient_count": report.recipient_count(),
                "success_count": report.success_count(),
                "failure_count": report.failure_count(),
                "request_id": request_id
            }),
            &meta,
        )
        .await;

    Ok(BroadcastResponse {
        success: true,
        message: format!(
            "Email sent to {} of {} recipients",
            report.success_count(),
            report.recipient_count()
        ),
        recipients: report.recipient_count(),
        failures: report.failure_count(),
    })
}

/// Read at most `max_body_bytes` and parse the JSON body
async fn read_request(
    ctx: &AppContext,
    audit: &AuditRecorder,
    body: Body,
    user_id: &UserId,
    meta: &RequestMeta,
    request_id: Uuid,
) -> BroadcastResult<BroadcastRequest> {
    let parsed = match axum::body::to_bytes(body, ctx.config.broadcast.max_body_bytes).await {
        Ok(bytes) => serde_json::from_slice::<BroadcastRequest>(&bytes)
            .map_err(|e| ("malformed_json", e.to_string())),
        Err(e) => Err(("body_too_large", e.to_string())),
    };

    match parsed {
        Ok(request) => Ok(request),
        Err((reason, detail)) => {
            audit
                .record(
                    Some(user_id),
                    AuditAction::InvalidRequest,
                    json!({ "reason": reason, "request_id": request_id }),
                    meta,
                )
                .await;
            Err(BroadcastError::InvalidInput(detail))
        }
    }
}

/// CORS preflight for callers the CORS layer does not short-circuit
async fn preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                "authorization, x-client-info, apikey, content-type",
            ),
        ],
        "ok",
    )
}

async fn method_not_allowed() -> BroadcastError {
    metrics::record_request("method_not_allowed");
    BroadcastError::MethodNotAllowed
}

fn outcome_label(error: &BroadcastError) -> &'static str {
    match error {
        BroadcastError::Authentication(_) => "unauthenticated",
        BroadcastError::Authorization(_) => "forbidden",
        BroadcastError::RateLimitExceeded => "rate_limited",
        BroadcastError::InvalidInput(_) => "invalid",
        BroadcastError::NoRecipients => "no_recipients",
        BroadcastError::TooManyRecipients { .. } => "too_many_recipients",
        BroadcastError::MethodNotAllowed => "method_not_allowed",
        BroadcastError::Configuration(_) => "misconfigured",
        _ => "error",
    }
}
