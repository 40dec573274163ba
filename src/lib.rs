//! Fault-tolerant request pipeline library.

pub mod admin;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod http;
pub mod observability;
pub mod pipeline;
pub mod resilience;
pub mod tiers;

pub use client::PipelineClient;
pub use config::schema::PipelineConfig;
pub use http::PipelineServer;
pub use pipeline::PipelineController;
pub use resilience::CancelToken;
