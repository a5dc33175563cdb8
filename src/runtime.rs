//! Runtime glue: configuration, the request/response messages, telemetry,
//! and the runner that hosts the feed.

pub mod config;
pub mod protocol;
pub mod runner;
pub mod telemetry;
