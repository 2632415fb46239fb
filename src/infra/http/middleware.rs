use std::time::Instant;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{HeaderMap, Request, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::auth::CurrentBlogger;
use crate::application::error::{AppError, ErrorReport};
use crate::presentation::views::render_not_found_response;

use super::HttpState;

const TOKEN_HEADER: &str = "x-blogger-token";

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

    let blogger = request
        .extensions()
        .get::<Viewer>()
        .and_then(|viewer| viewer.0.as_ref())
        .map(|current| current.blogger.username.clone());

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();

    let class = match status.as_u16() {
        500.. => "5xx",
        400..=499 => "4xx",
        300..=399 => "3xx",
        _ => "2xx",
    };
    counter!("scriba_http_responses_total", "class" => class).increment(1);

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
                target = "scriba::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                blogger = blogger.as_deref().unwrap_or(""),
                "request failed",
            );
        } else {
            warn!(
                target = "scriba::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                blogger = blogger.as_deref().unwrap_or(""),
                "client request error",
            );
        }
    }

    response
}

/// The blogger behind the request, if a valid token was presented.
#[derive(Clone, Default)]
pub struct Viewer(pub Option<CurrentBlogger>);

impl Viewer {
    pub fn blogger(&self) -> Option<&CurrentBlogger> {
        self.0.as_ref()
    }
}

/// Resolve the bearer token, if any, into a [`Viewer`] extension.
///
/// Unknown or revoked tokens resolve to an anonymous viewer; write routes
/// reject those through [`RequireBlogger`].
pub async fn resolve_blogger(
    State(state): State<HttpState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let viewer = match extract_token(request.headers()) {
        Some(token) => match state.auth.authenticate(&token).await {
            Ok(current) => Viewer(Some(current)),
            Err(err) => {
                debug!(
                    target = "scriba::http::auth",
                    error = %err,
                    "ignoring unusable blogger token"
                );
                Viewer(None)
            }
        },
        None => Viewer(None),
    };

    request.extensions_mut().insert(viewer);
    next.run(request).await
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());

    bearer
        .or_else(|| {
            headers
                .get(TOKEN_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(|token| token.trim().to_string())
        })
        .filter(|token| !token.is_empty())
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Viewer>().cloned().unwrap_or_default())
    }
}

/// Extractor for write routes.
///
/// Disabled admin actions answer 404 before any credential is looked at;
/// otherwise a missing blogger answers 401.
pub struct RequireBlogger(pub CurrentBlogger);

impl FromRequestParts<HttpState> for RequireBlogger {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        if !state.blog.include_admin_actions {
            return Err(render_not_found_response(
                "infra::http::middleware::admin_gate",
            ));
        }

        match parts.extensions.get::<Viewer>().and_then(|viewer| viewer.0.clone()) {
            Some(current) => Ok(Self(current)),
            None => Err(AppError::Unauthorized.into_response()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_custom_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer sk_a_b"));
        headers.insert(TOKEN_HEADER, HeaderValue::from_static("sk_c_d"));
        assert_eq!(extract_token(&headers).as_deref(), Some("sk_a_b"));
    }

    #[test]
    fn custom_header_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, HeaderValue::from_static(" sk_c_d "));
        assert_eq!(extract_token(&headers).as_deref(), Some("sk_c_d"));
    }

    #[test]
    fn non_bearer_authorization_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert!(extract_token(&headers).is_none());
    }
}
