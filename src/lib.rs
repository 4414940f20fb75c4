//! mySplit backend: users, groups and shared expenses with per-member splits.

pub mod auth;
pub mod config;
pub mod error;
pub mod expenses;
pub mod groups;
pub mod identity;
pub mod resolution;
pub mod routes;
pub mod schemas;
pub mod signin;
pub mod store;
pub mod views;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use routes::AppState;
