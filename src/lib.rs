//! # Plugload
//!
//! Runtime plugin loading for a genome browser host.
//!
//! Plugins live at remote URLs and are declared as plugin references. The
//! loader validates each URL, fetches the artifact with whatever script
//! loading the host environment offers, evaluates it, and hands back one
//! constructor per reference in input order.
//!
//! ## Features
//!
//! - **Two resolution strategies**: module default export, or the
//!   `JBrowsePlugin<Name>` global registry convention
//! - **Strict URL validation**: only `http:` and `https:` are fetched
//! - **Capability bridge**: host modules re-exported as `JBrowseExports`
//! - **Concurrent loading**: all-or-nothing or settled, optionally bounded
//!
//! ## Quick Start
//!
//! ```bash
//! # Load the plugins listed in .plugload.toml
//! plugload load
//!
//! # Check plugin URLs without fetching them
//! plugload check https://plugins.example.org/dotplot.toml
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::missing_panics_doc)]

pub mod core;
pub mod plugin;

pub use crate::core::Config;
pub use plugin::{
    install_global_capabilities, loader_from_config, GlobalScope, Plugin, PluginConstructor,
    PluginError, PluginLoader, PluginManager, PluginRecord, PluginReference, PluginResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "plugload";
