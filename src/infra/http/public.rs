use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;

use crate::{
    application::{
        error::{ErrorReport, HttpError},
        pagination::parse_page_param,
        posts::{PostListing, PostServiceError},
    },
    domain::{comments::NewComment, types::CommentsMode},
    presentation::views::{
        CommentFormView, IndexTemplate, IndexView, LayoutChrome, Notice, PostPageView,
        ShowTemplate, SidebarView, SiteLinks, render_not_found_response,
        render_template_response,
    },
};

use super::{HttpState, db_health, middleware::Viewer, xml_response};

pub(super) fn routes() -> Router<HttpState> {
    Router::new()
        .route("/", get(root))
        .route("/posts", get(index))
        .route("/posts.xml", get(xml_feed))
        .route("/posts.rss", get(rss_feed))
        .route("/posts/tagged", get(tagged))
        .route("/posts/archives", get(archives))
        .route("/posts/{param}", get(show))
        .route("/posts/{param}/comments", post(add_comment))
        .route("/_health/db", get(public_health))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListQuery {
    page: Option<String>,
    notice: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TaggedQuery {
    tag: Option<String>,
    page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArchiveQuery {
    year: Option<String>,
    month: Option<String>,
    page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NoticeQuery {
    notice: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommentForm {
    name: String,
    email: Option<String>,
    body: String,
}

async fn root(State(state): State<HttpState>) -> Redirect {
    Redirect::to(&SiteLinks::new(&state.blog).posts())
}

async fn index(
    State(state): State<HttpState>,
    viewer: Viewer,
    Query(query): Query<ListQuery>,
) -> Response {
    let page = parse_page_param(query.page.as_deref());
    let notice = Notice::parse(query.notice.as_deref());
    match state.posts.index(viewer.blogger(), page).await {
        Ok(listing) => {
            let base = SiteLinks::new(&state.blog).posts();
            render_listing(&state, &viewer, listing, &base, notice).await
        }
        Err(err) => service_error_response(err),
    }
}

async fn tagged(
    State(state): State<HttpState>,
    viewer: Viewer,
    Query(query): Query<TaggedQuery>,
) -> Response {
    let page = parse_page_param(query.page.as_deref());
    match state
        .posts
        .tagged(viewer.blogger(), query.tag.as_deref(), page)
        .await
    {
        Ok(listing) => {
            let base = SiteLinks::new(&state.blog)
                .tagged(query.tag.as_deref().map(str::trim).unwrap_or_default());
            render_listing(&state, &viewer, listing, &base, None).await
        }
        Err(err) => service_error_response(err),
    }
}

async fn archives(
    State(state): State<HttpState>,
    viewer: Viewer,
    Query(query): Query<ArchiveQuery>,
) -> Response {
    let page = parse_page_param(query.page.as_deref());
    match state
        .posts
        .archives(
            viewer.blogger(),
            query.year.as_deref(),
            query.month.as_deref(),
            page,
        )
        .await
    {
        Ok(listing) => {
            let base = SiteLinks::new(&state.blog).archive_raw(
                query.year.as_deref().unwrap_or_default().trim(),
                query.month.as_deref().unwrap_or_default().trim(),
            );
            render_listing(&state, &viewer, listing, &base, None).await
        }
        Err(err) => service_error_response(err),
    }
}

async fn render_listing(
    state: &HttpState,
    viewer: &Viewer,
    listing: PostListing,
    base: &str,
    notice: Option<Notice>,
) -> Response {
    let links = SiteLinks::new(&state.blog);
    let sidebar = match state.posts.sidebar().await {
        Ok(sidebar) => SidebarView::new(sidebar, &links),
        Err(err) => return service_error_response(err),
    };

    let mut chrome = LayoutChrome::new(&state.blog, viewer.blogger().is_some()).with_notice(notice);
    if let Some(title) = listing.title.as_deref() {
        chrome = chrome.with_title(title);
    }

    let view = IndexView::new(&listing, base, &links);
    render_template_response(
        IndexTemplate {
            chrome,
            sidebar,
            view,
        },
        StatusCode::OK,
    )
}

async fn show(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(param): Path<String>,
    Query(query): Query<NoticeQuery>,
) -> Response {
    let notice = Notice::parse(query.notice.as_deref());
    render_post(&state, &viewer, &param, notice, None, StatusCode::OK).await
}

async fn render_post(
    state: &HttpState,
    viewer: &Viewer,
    param: &str,
    notice: Option<Notice>,
    comment_form: Option<CommentFormView>,
    status: StatusCode,
) -> Response {
    let detail = match state.posts.show(viewer.blogger(), param).await {
        Ok(detail) => detail,
        Err(err) => return service_error_response(err),
    };
    let links = SiteLinks::new(&state.blog);
    let sidebar = match state.posts.sidebar().await {
        Ok(sidebar) => SidebarView::new(sidebar, &links),
        Err(err) => return service_error_response(err),
    };

    let chrome = LayoutChrome::new(&state.blog, viewer.blogger().is_some())
        .with_title(&detail.post.record.title)
        .with_notice(notice);

    let disqus = state.blog.include_comments == CommentsMode::Disqus;
    let mut view = PostPageView::new(&detail, disqus, &links);
    if let Some(form) = comment_form {
        view = view.with_comment_form(form);
    }

    render_template_response(
        ShowTemplate {
            chrome,
            sidebar,
            view,
        },
        status,
    )
}

async fn add_comment(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(param): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let comment = NewComment {
        name: form.name,
        email: form.email,
        body: form.body,
    };

    match state.posts.add_comment(&param, comment).await {
        Ok((post, _)) => {
            let target = SiteLinks::new(&state.blog).post(&post.to_param());
            Redirect::to(&SiteLinks::with_notice(target, Notice::Commented)).into_response()
        }
        Err(PostServiceError::InvalidComment { comment, errors }) => {
            let form = CommentFormView {
                action: String::new(),
                name: comment.name,
                email: comment.email.unwrap_or_default(),
                body: comment.body,
                errors: errors.full_messages(),
            };
            let mut response = render_post(
                &state,
                &viewer,
                &param,
                None,
                Some(form),
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .await;
            ErrorReport::from_message(
                "infra::http::public::add_comment",
                StatusCode::UNPROCESSABLE_ENTITY,
                errors.to_string(),
            )
            .attach(&mut response);
            response
        }
        Err(err) => service_error_response(err),
    }
}

async fn xml_feed(State(state): State<HttpState>) -> Response {
    match state.syndication.xml_feed().await {
        Ok(body) => xml_response(body, "application/xml; charset=utf-8"),
        Err(err) => service_error_response(err),
    }
}

async fn rss_feed(State(state): State<HttpState>) -> Response {
    match state.syndication.rss_feed().await {
        Ok(body) => xml_response(body, "application/rss+xml; charset=utf-8"),
        Err(err) => service_error_response(err),
    }
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health(&state).await
}

pub(super) async fn not_found() -> Response {
    render_not_found_response("infra::http::public::fallback")
}

/// Lookup misses render the static not-found page; everything else goes through [`HttpError`].
pub(super) fn service_error_response(err: PostServiceError) -> Response {
    match err {
        PostServiceError::NotFound => render_not_found_response("infra::http::posts::not_found"),
        other => HttpError::from(other).into_response(),
    }
}
