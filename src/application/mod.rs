//! Application layer: services and repository contracts.

pub mod auth;
pub mod blog;
pub mod error;
pub mod pagination;
pub mod ping;
pub mod posts;
pub mod repos;
pub mod syndication;
