//! Core functionality shared by the plugin loader and the CLI.
//!
//! This module contains configuration loading and the retry helpers used
//! when fetching plugin artifacts.

mod config;
mod retry;

pub use config::{Config, EnvironmentSettings, LoaderSettings, RetrySettings};
pub use retry::{retry_async, RetryConfig, RetryResult};
