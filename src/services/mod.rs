pub mod auth;
pub mod identity;
pub mod import;
pub mod jobs;
