//! Configuration module for Listing-Spy
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use listing_spy::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("listing-spy.toml")).unwrap();
//! println!("Each source gets {} attempts", config.scraper.max_attempts);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, NotificationsConfig, ScraperConfig, StorageConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
