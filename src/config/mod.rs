//! Configuration module for Catalog-Crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional; a missing file section falls back to its defaults.
//!
//! # Example
//!
//! ```no_run
//! use catalog_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Crawler will use {} workers", config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    default_workers, Config, CrawlerConfig, OutputConfig, UserAgentConfig, DEFAULT_BASE_URL,
    DEFAULT_MAX_WORKERS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
