mod admin;
mod middleware;
mod public;

pub use middleware::{RequireBlogger, Viewer};

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    middleware as axum_middleware,
    response::{IntoResponse, Response},
};

use crate::application::{
    auth::BloggerAuthService, blog::BlogConfig, error::ErrorReport, posts::PostService,
    repos::HealthRepo, syndication::SyndicationService,
};

use self::middleware::{log_responses, resolve_blogger, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub posts: PostService,
    pub syndication: SyndicationService,
    pub auth: BloggerAuthService,
    pub health: Arc<dyn HealthRepo>,
    pub blog: Arc<BlogConfig>,
}

/// Router serving the blog under `/posts`, with `/` redirecting to the listing.
pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .merge(public::routes())
        .merge(admin::routes())
        .fallback(public::not_found)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            resolve_blogger,
        ))
        .layer(axum_middleware::from_fn(set_request_context))
        .with_state(state)
}

async fn db_health(state: &HttpState) -> Response {
    match state.health.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

fn xml_response(body: String, content_type: &'static str) -> Response {
    let mut response = (StatusCode::OK, body).into_response();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
