// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Where flags, values and revisions are stored.

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:./switchboard.db";

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
	/// SQLite URL, e.g. `sqlite:/var/lib/switchboard/flags.db` or `sqlite::memory:`
	pub url: String,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			url: DEFAULT_DATABASE_URL.to_string(),
		}
	}
}

impl DatabaseConfig {
	/// Only SQLite is supported. A `postgres://` URL would otherwise be taken
	/// for a file name and silently create a new empty database.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.url.starts_with("sqlite:") {
			return Err(ConfigError::InvalidValue {
				key: "database.url".to_string(),
				message: format!("expected a sqlite: URL, got '{}'", self.url),
			});
		}
		Ok(())
	}

	/// Whether the flags disappear when the process exits.
	pub fn is_ephemeral(&self) -> bool {
		self.url.contains(":memory:") || self.url.contains("mode=memory")
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: DatabaseConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
	}

	pub fn finalize(self) -> DatabaseConfig {
		self.url
			.map(|url| DatabaseConfig { url })
			.unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_url() {
		let config = DatabaseConfigLayer::default().finalize();
		assert_eq!(config.url, "sqlite:./switchboard.db");
		assert!(config.validate().is_ok());
		assert!(!config.is_ephemeral());
	}

	#[test]
	fn test_later_layer_wins() {
		let mut layer = DatabaseConfigLayer {
			url: Some("sqlite:/etc/first.db".to_string()),
		};
		layer.merge(DatabaseConfigLayer {
			url: Some("sqlite:/var/lib/switchboard/flags.db".to_string()),
		});
		layer.merge(DatabaseConfigLayer::default());
		assert_eq!(layer.finalize().url, "sqlite:/var/lib/switchboard/flags.db");
	}

	#[test]
	fn test_non_sqlite_url_rejected() {
		let config = DatabaseConfig {
			url: "postgres://localhost/flags".to_string(),
		};
		let err = config.validate().unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "database.url"));
	}

	#[test]
	fn test_memory_url_is_ephemeral() {
		let config = DatabaseConfig {
			url: "sqlite::memory:".to_string(),
		};
		assert!(config.validate().is_ok());
		assert!(config.is_ephemeral());
	}
}
