pub mod analysis;
pub mod community;
pub mod config;
pub mod error;
pub mod places;
pub mod scoring;
pub mod telemetry;
