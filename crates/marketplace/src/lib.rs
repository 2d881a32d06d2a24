pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod telemetry;
pub mod workflows;
