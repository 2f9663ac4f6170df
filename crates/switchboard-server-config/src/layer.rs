// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

use crate::sections::{DatabaseConfigLayer, FlagsConfigLayer, LoggingConfigLayer};

/// One partially specified configuration, as read from a single source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SwitchboardConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	#[serde(default)]
	pub flags: Option<FlagsConfigLayer>,
}

fn merge_section<T: Default>(target: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	if let Some(other) = other {
		merge(target.get_or_insert_with(T::default), other);
	}
}

impl SwitchboardConfigLayer {
	/// Overlays `other` on top of `self`. Fields set in `other` win.
	pub fn merge(&mut self, other: SwitchboardConfigLayer) {
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_section(&mut self.flags, other.flags, FlagsConfigLayer::merge);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_partial_toml() {
		let layer: SwitchboardConfigLayer = toml::from_str(
			r#"
			[flags]
			max_page_size = 200
			"#,
		)
		.unwrap();

		assert!(layer.database.is_none());
		assert_eq!(layer.flags.unwrap().max_page_size, Some(200));
	}

	#[test]
	fn test_merge_sections_independently() {
		let mut base: SwitchboardConfigLayer = toml::from_str(
			r#"
			[database]
			url = "sqlite:/tmp/a.db"

			[logging]
			level = "debug"
			"#,
		)
		.unwrap();
		let over: SwitchboardConfigLayer = toml::from_str(
			r#"
			[logging]
			level = "warn"
			"#,
		)
		.unwrap();

		base.merge(over);
		assert_eq!(base.database.unwrap().url.as_deref(), Some("sqlite:/tmp/a.db"));
		assert_eq!(base.logging.unwrap().level.as_deref(), Some("warn"));
	}
}
