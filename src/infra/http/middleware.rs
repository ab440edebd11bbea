use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::access::{AccessDecision, Identity, authorize};
use crate::application::error::ErrorReport;

use super::{HttpState, found};

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "gazette::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "request failed",
            );
        } else {
            warn!(
                target = "gazette::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "client request error",
            );
        }
    }

    response
}

/// Gate for the admin routes. Admits admins and hands their [`Identity`] to
/// the handler through request extensions.
pub async fn require_admin(
    State(state): State<HttpState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let identity = state.identity.current_identity(request.headers());
    let user = identity.as_ref().map(|identity| identity.user.clone());

    match authorize(identity, request.method()) {
        AccessDecision::Allow(identity) => {
            request.extensions_mut().insert::<Identity>(identity);
            next.run(request).await
        }
        AccessDecision::RedirectToLogin => {
            let return_to = request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            debug!(
                target = "gazette::http::access",
                path = %request.uri().path(),
                "redirecting anonymous visitor to login"
            );
            found(&state.identity.login_url(return_to))
        }
        AccessDecision::Forbidden => {
            let mut response = (StatusCode::FORBIDDEN, "Forbidden").into_response();
            ErrorReport::from_message(
                "infra::http::middleware::require_admin",
                StatusCode::FORBIDDEN,
                match user {
                    Some(user) => format!("`{user}` is not an administrator"),
                    None => "anonymous write to an admin route".to_string(),
                },
            )
            .attach(&mut response);
            response
        }
    }
}
