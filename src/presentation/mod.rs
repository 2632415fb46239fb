pub mod markdown;
pub mod views;
