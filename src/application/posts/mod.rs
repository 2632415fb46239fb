//! The posts service: every read and write operation behind the posts routes.

mod commands;
mod comments;
mod queries;
mod service;
mod types;

pub use service::PostService;
pub use types::{
    LISTING_TITLE, PostDetail, PostListing, PostServiceError, PostView, RecentPost, Sidebar,
    archive_title, tagged_title,
};
