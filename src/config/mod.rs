//! Configuration module for Tag-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use tag_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Fetches in flight: {}", config.pipeline.fetch_limit);
//! ```

mod parser;
mod types;
pub(crate) mod validation;

// Re-export types
pub use types::{
    Config, FetchConfig, PipelineConfig, ScheduleConfig, SiteConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
