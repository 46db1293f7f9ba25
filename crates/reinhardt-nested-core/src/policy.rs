//! Per-attribute write policies
//!
//! A policy governs what a nested value may do to the related collection:
//! create new rows, edit existing ones, clear the relation before setting
//! it, and which identity fields find existing rows.
//!
//! Declarations are partial; completing one against the defaults fills only
//! the missing entries and never overwrites an explicit value. Completion is
//! pure, so applying it again to its own output changes nothing.

use crate::settings::SettingsError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default flag values used to complete declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyDefaults {
	pub may_create: bool,
	pub may_edit: bool,
	pub clear_before_set: bool,
}

impl Default for PolicyDefaults {
	fn default() -> Self {
		Self {
			may_create: true,
			may_edit: true,
			clear_before_set: false,
		}
	}
}

/// A possibly partial policy as written by the serializer author
///
/// # Examples
///
/// ```
/// use reinhardt_nested_core::policy::{PolicyDeclaration, PolicyDefaults};
///
/// let declared = PolicyDeclaration::new().identity("sku").may_edit(false);
/// let policy = declared.complete(&PolicyDefaults::default());
///
/// assert!(policy.may_create);
/// assert!(!policy.may_edit);
/// assert_eq!(policy.primary_identity(), Some("sku"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyDeclaration {
	pub may_create: Option<bool>,
	pub may_edit: Option<bool>,
	pub clear_before_set: Option<bool>,
	pub identity_fields: Option<Vec<String>>,
}

impl PolicyDeclaration {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn may_create(mut self, value: bool) -> Self {
		self.may_create = Some(value);
		self
	}

	pub fn may_edit(mut self, value: bool) -> Self {
		self.may_edit = Some(value);
		self
	}

	pub fn clear_before_set(mut self, value: bool) -> Self {
		self.clear_before_set = Some(value);
		self
	}

	/// Append an identity field; the first one appended is the primary one
	pub fn identity(mut self, field: impl Into<String>) -> Self {
		self.identity_fields
			.get_or_insert_with(Vec::new)
			.push(field.into());
		self
	}

	/// Replace the identity fields
	pub fn identity_fields<I, S>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.identity_fields = Some(fields.into_iter().map(Into::into).collect());
		self
	}

	/// Fill every missing entry from `defaults`
	pub fn merge_defaults(&self, defaults: &PolicyDefaults) -> PolicyDeclaration {
		PolicyDeclaration {
			may_create: Some(self.may_create.unwrap_or(defaults.may_create)),
			may_edit: Some(self.may_edit.unwrap_or(defaults.may_edit)),
			clear_before_set: Some(self.clear_before_set.unwrap_or(defaults.clear_before_set)),
			identity_fields: Some(self.identity_fields.clone().unwrap_or_default()),
		}
	}

	/// Whether every entry is present
	pub fn is_complete(&self) -> bool {
		self.may_create.is_some()
			&& self.may_edit.is_some()
			&& self.clear_before_set.is_some()
			&& self.identity_fields.is_some()
	}

	/// Complete against `defaults`
	pub fn complete(&self, defaults: &PolicyDefaults) -> AttributePolicy {
		let merged = self.merge_defaults(defaults);
		AttributePolicy {
			may_create: merged.may_create.unwrap_or(defaults.may_create),
			may_edit: merged.may_edit.unwrap_or(defaults.may_edit),
			clear_before_set: merged.clear_before_set.unwrap_or(defaults.clear_before_set),
			identity_fields: merged.identity_fields.unwrap_or_default(),
		}
	}
}

/// A completed policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributePolicy {
	pub may_create: bool,
	pub may_edit: bool,
	pub clear_before_set: bool,
	pub identity_fields: Vec<String>,
}

impl AttributePolicy {
	/// The identity field nested objects are classified and looked up by
	pub fn primary_identity(&self) -> Option<&str> {
		self.identity_fields.first().map(|f| f.as_str())
	}

	/// Identity fields tried by create-or-match before creating a row
	pub fn secondary_identities(&self) -> &[String] {
		self.identity_fields.get(1..).unwrap_or(&[])
	}
}

impl Default for AttributePolicy {
	fn default() -> Self {
		PolicyDeclaration::new().complete(&PolicyDefaults::default())
	}
}

impl From<&AttributePolicy> for PolicyDeclaration {
	fn from(policy: &AttributePolicy) -> Self {
		PolicyDeclaration {
			may_create: Some(policy.may_create),
			may_edit: Some(policy.may_edit),
			clear_before_set: Some(policy.clear_before_set),
			identity_fields: Some(policy.identity_fields.clone()),
		}
	}
}

/// Policy declarations keyed by attribute, as loaded from configuration
///
/// # Examples
///
/// ```
/// use reinhardt_nested_core::policy::PolicyDeclarations;
///
/// let declarations = PolicyDeclarations::from_toml_str(r#"
///     [items]
///     identity_fields = ["sku"]
///     clear_before_set = true
///
///     [customer]
///     may_create = false
/// "#).unwrap();
///
/// assert_eq!(declarations.len(), 2);
/// assert_eq!(declarations.get("customer").unwrap().may_create, Some(false));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyDeclarations(IndexMap<String, PolicyDeclaration>);

impl PolicyDeclarations {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parse declarations from a TOML document with one table per attribute
	pub fn from_toml_str(source: &str) -> Result<Self, SettingsError> {
		toml::from_str(source).map_err(|e| SettingsError::Parse {
			message: e.to_string(),
		})
	}

	pub fn insert(&mut self, attr: impl Into<String>, declaration: PolicyDeclaration) {
		self.0.insert(attr.into(), declaration);
	}

	pub fn get(&self, attr: &str) -> Option<&PolicyDeclaration> {
		self.0.get(attr)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&String, &PolicyDeclaration)> {
		self.0.iter()
	}
}
