//! HTTP handlers for the plant disease service.

pub mod chat;
pub mod health;
pub mod predict;

pub use chat::chat;
pub use health::{health_check, metrics_endpoint, readiness_check, root};
pub use predict::predict;
