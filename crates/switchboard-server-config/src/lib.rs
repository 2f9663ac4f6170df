// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for Switchboard.
//!
//! Sources, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. A TOML file (`/etc/switchboard/switchboard.toml`, or a caller-supplied path)
//! 3. Environment variables (`SWITCHBOARD_*`)
//!
//! # Usage
//!
//! ```ignore
//! use switchboard_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("flags stored at {}", config.database.url);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::SwitchboardConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct SwitchboardConfig {
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub flags: FlagsConfig,
}

/// Load configuration from all sources with standard precedence.
pub fn load_config() -> Result<SwitchboardConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	];
	load_from(sources)
}

/// Load configuration with a custom config file path in place of the system one.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<SwitchboardConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	];
	load_from(sources)
}

/// Load configuration from environment only.
pub fn load_config_from_env() -> Result<SwitchboardConfig, ConfigError> {
	let mut merged = SwitchboardConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

fn load_from(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<SwitchboardConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = SwitchboardConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize a merged layer into resolved config.
pub fn finalize(layer: SwitchboardConfigLayer) -> Result<SwitchboardConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let flags = layer.flags.unwrap_or_default().finalize();

	database.validate()?;
	validate_config(&flags)?;

	info!(
		database = %database.url,
		log_level = %logging.level,
		default_page_size = flags.default_page_size,
		max_page_size = flags.max_page_size,
		actor = flags.actor.as_deref().unwrap_or("-"),
		"configuration loaded"
	);

	Ok(SwitchboardConfig {
		database,
		logging,
		flags,
	})
}

fn validate_config(flags: &FlagsConfig) -> Result<(), ConfigError> {
	if flags.default_page_size == 0 || flags.max_page_size == 0 {
		return Err(ConfigError::Validation(
			"flags page sizes must be greater than zero".to_string(),
		));
	}
	if flags.default_page_size > flags.max_page_size {
		return Err(ConfigError::Validation(format!(
			"flags.default_page_size ({}) exceeds flags.max_page_size ({})",
			flags.default_page_size, flags.max_page_size
		)));
	}
	Ok(())
}
