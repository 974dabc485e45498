/// Pillar broadcast service
///
/// Lets authenticated administrators email every employee of one
/// organizational pillar, with validation, rate limiting, per-recipient
/// failure isolation and an audit trail.

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod deadline;
pub mod dispatch;
pub mod error;
pub mod jobs;
pub mod mailer;
pub mod metrics;
pub mod rate_limit;
pub mod recipients;
pub mod server;
pub mod validation;

pub use context::AppContext;
pub use error::{BroadcastError, BroadcastResult};
