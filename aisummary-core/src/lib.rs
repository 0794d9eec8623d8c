pub mod config;
pub mod error;
pub mod http_client;
pub mod model;
pub mod page;
pub mod provider;
pub mod provider_factory;
pub mod providers;
pub mod render;
pub mod router;
pub mod stream;
pub mod summarizer;
pub mod telemetry;
pub mod ui;
