//! Write routes for posts: new, create, edit, update and destroy.
//!
//! HTML forms cannot send PUT, PATCH or DELETE, so `POST /posts/{param}`
//! honours a `_method` form field as well.

use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post, put},
};
use serde::Deserialize;

use crate::{
    application::{auth::CurrentBlogger, error::ErrorReport, posts::PostServiceError},
    domain::{
        entities::PostRecord,
        error::ValidationErrors,
        posts::{PostAttributes, PostDraft},
    },
    presentation::views::{
        FormTemplate, LayoutChrome, Notice, PostFormView, SiteLinks, render_template_response,
    },
};

use super::{HttpState, middleware::RequireBlogger, public::service_error_response};

pub(super) fn routes() -> Router<HttpState> {
    Router::new()
        .route("/posts", post(create_post))
        .route("/posts/new", get(new_post))
        .route("/posts/{param}/edit", get(edit_post))
        .route(
            "/posts/{param}",
            put(update_post)
                .patch(update_post)
                .delete(destroy_post)
                .post(override_method),
        )
}

/// The permitted post fields; anything else in the body is dropped.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostForm {
    #[serde(rename = "_method")]
    method: Option<String>,
    title: Option<String>,
    published_at: Option<String>,
    body: Option<String>,
    footnotes: Option<String>,
    tag_list: Option<String>,
    state: Option<String>,
}

impl PostForm {
    fn into_attributes(self) -> PostAttributes {
        PostAttributes {
            title: self.title,
            published_at: self.published_at,
            body: self.body,
            footnotes: self.footnotes,
            tag_list: self.tag_list,
            state: self.state,
        }
    }
}

async fn new_post(
    RequireBlogger(blogger): RequireBlogger,
    State(state): State<HttpState>,
    Query(form): Query<PostForm>,
) -> Response {
    let draft = state.posts.new_post(&blogger, form.into_attributes());
    render_form(&state, &draft, None, StatusCode::OK)
}

async fn edit_post(
    RequireBlogger(blogger): RequireBlogger,
    State(state): State<HttpState>,
    Path(param): Path<String>,
) -> Response {
    match state.posts.edit_post(&blogger, &param).await {
        Ok(draft) => render_form(&state, &draft, None, StatusCode::OK),
        Err(err) => service_error_response(err),
    }
}

async fn create_post(
    RequireBlogger(blogger): RequireBlogger,
    State(state): State<HttpState>,
    Form(form): Form<PostForm>,
) -> Response {
    let result = state
        .posts
        .create_post(&blogger, form.into_attributes())
        .await;
    saved_response(&state, result, Notice::Created)
}

async fn update_post(
    RequireBlogger(blogger): RequireBlogger,
    State(state): State<HttpState>,
    Path(param): Path<String>,
    Form(form): Form<PostForm>,
) -> Response {
    update(&state, &blogger, &param, form).await
}

async fn destroy_post(
    RequireBlogger(blogger): RequireBlogger,
    State(state): State<HttpState>,
    Path(param): Path<String>,
) -> Response {
    destroy(&state, &blogger, &param).await
}

async fn override_method(
    RequireBlogger(blogger): RequireBlogger,
    State(state): State<HttpState>,
    Path(param): Path<String>,
    Form(form): Form<PostForm>,
) -> Response {
    let method = form
        .method
        .as_deref()
        .map(|method| method.trim().to_ascii_lowercase());

    match method.as_deref() {
        Some("put" | "patch") => update(&state, &blogger, &param, form).await,
        Some("delete") => destroy(&state, &blogger, &param).await,
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

async fn update(
    state: &HttpState,
    blogger: &CurrentBlogger,
    param: &str,
    form: PostForm,
) -> Response {
    let result = state
        .posts
        .update_post(blogger, param, form.into_attributes())
        .await;
    saved_response(state, result, Notice::Updated)
}

async fn destroy(
    state: &HttpState,
    blogger: &CurrentBlogger,
    param: &str,
) -> Response {
    match state.posts.destroy_post(blogger, param).await {
        Ok(_) => {
            let target = SiteLinks::new(&state.blog).posts();
            Redirect::to(&SiteLinks::with_notice(target, Notice::Destroyed)).into_response()
        }
        Err(err) => service_error_response(err),
    }
}

fn saved_response(
    state: &HttpState,
    result: Result<PostRecord, PostServiceError>,
    notice: Notice,
) -> Response {
    match result {
        Ok(post) => {
            let target = SiteLinks::new(&state.blog).post(&post.to_param());
            Redirect::to(&SiteLinks::with_notice(target, notice)).into_response()
        }
        Err(PostServiceError::Invalid { draft, errors }) => {
            let mut response = render_form(
                state,
                &draft,
                Some(&errors),
                StatusCode::UNPROCESSABLE_ENTITY,
            );
            ErrorReport::from_message(
                "infra::http::admin::save_post",
                StatusCode::UNPROCESSABLE_ENTITY,
                errors.to_string(),
            )
            .attach(&mut response);
            response
        }
        Err(err) => service_error_response(err),
    }
}

fn render_form(
    state: &HttpState,
    draft: &PostDraft,
    errors: Option<&ValidationErrors>,
    status: StatusCode,
) -> Response {
    let links = SiteLinks::new(&state.blog);
    let form = PostFormView::new(draft, state.blog.states.all(), errors, &links);
    let chrome = LayoutChrome::new(&state.blog, true).with_title(&form.heading);
    render_template_response(FormTemplate { chrome, form }, status)
}
