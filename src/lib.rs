pub mod config;
pub mod feeds;
pub mod models;
pub mod signals;
pub mod telemetry;
