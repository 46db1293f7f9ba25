//! Engine settings
//!
//! ```toml
//! max_depth = 10
//! prune_nulls = true
//!
//! [policy_defaults]
//! may_create = true
//! may_edit = true
//! clear_before_set = false
//! ```

use crate::policy::PolicyDefaults;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default maximum nesting depth
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Errors raised while loading settings or policy declarations
#[derive(Debug, Error)]
pub enum SettingsError {
	#[error("Failed to read settings file {path}: {source}")]
	Io {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse settings: {message}")]
	Parse { message: String },

	#[error("Invalid setting '{key}': {message}")]
	Invalid { key: String, message: String },
}

/// Settings shared by every serializer of an application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NestedSettings {
	/// Deepest related serializer that may be entered while resolving
	pub max_depth: usize,
	/// Whether null leaves are stripped after normalization
	pub prune_nulls: bool,
	/// Values filling undeclared policy entries
	pub policy_defaults: PolicyDefaults,
}

impl Default for NestedSettings {
	fn default() -> Self {
		Self {
			max_depth: DEFAULT_MAX_DEPTH,
			prune_nulls: true,
			policy_defaults: PolicyDefaults::default(),
		}
	}
}

impl NestedSettings {
	/// Parse settings from TOML; missing keys keep their defaults
	pub fn from_toml_str(source: &str) -> Result<Self, SettingsError> {
		let settings: NestedSettings = toml::from_str(source).map_err(|e| SettingsError::Parse {
			message: e.to_string(),
		})?;
		settings.validate()?;
		Ok(settings)
	}

	/// Read and parse a TOML settings file
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
			path: path.display().to_string(),
			source,
		})?;
		Self::from_toml_str(&source)
	}

	pub fn with_max_depth(mut self, max_depth: usize) -> Self {
		self.max_depth = max_depth;
		self
	}

	pub fn with_prune_nulls(mut self, prune_nulls: bool) -> Self {
		self.prune_nulls = prune_nulls;
		self
	}

	pub fn with_policy_defaults(mut self, defaults: PolicyDefaults) -> Self {
		self.policy_defaults = defaults;
		self
	}

	fn validate(&self) -> Result<(), SettingsError> {
		if self.max_depth == 0 {
			return Err(SettingsError::Invalid {
				key: "max_depth".to_string(),
				message: "must be at least 1".to_string(),
			});
		}
		Ok(())
	}
}
