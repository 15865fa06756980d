//! Request pipeline stages and the services they drive.

pub mod auth;
pub mod headers;
pub mod metrics;
pub mod tracking;
pub mod usage;
