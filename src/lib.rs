pub mod app;
pub mod cmd;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod output;
pub mod values;
