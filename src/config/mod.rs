//! Configuration module for Redirect-Resolver
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so an empty file (or no file at all) yields a usable
//! configuration.
//!
//! # Example
//!
//! ```no_run
//! use redirect_resolver::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("resolver.toml")).unwrap();
//! println!("Following at most {} redirects", config.resolver.max_redirects);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, HopMethod, ResolverConfig, SchedulerConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
