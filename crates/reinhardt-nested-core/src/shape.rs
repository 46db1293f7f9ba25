//! Shape tagging for nested values
//!
//! Every nested value is tagged before any resolution strategy runs, so the
//! dispatch in the normalizer is a plain `match` over [`ValueShape`].

use serde_json::Value;

/// The shape of a single nested value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueShape {
	/// A primitive naming an existing row
	Bare,
	/// An object carrying the identity field of a nested-capable target
	IdentityObject,
	/// An object carrying the primary key of a plain target
	IdObject,
	/// An object carrying neither
	PlainObject,
	/// `null`; the value is dropped
	Null,
	/// A sequence where a single related value was expected
	Invalid,
}

impl ValueShape {
	pub fn as_str(&self) -> &'static str {
		match self {
			ValueShape::Bare => "bare",
			ValueShape::IdentityObject => "identity_object",
			ValueShape::IdObject => "id_object",
			ValueShape::PlainObject => "plain_object",
			ValueShape::Null => "null",
			ValueShape::Invalid => "invalid",
		}
	}
}

impl std::fmt::Display for ValueShape {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Classification rule for the values of one attribute
///
/// # Examples
///
/// ```
/// use reinhardt_nested_core::shape::{ShapeRule, ValueShape};
/// use serde_json::json;
///
/// let rule = ShapeRule::nested(Some("code"));
/// assert_eq!(rule.classify(&json!(5)), ValueShape::Bare);
/// assert_eq!(rule.classify(&json!({"code": "X"})), ValueShape::IdentityObject);
/// assert_eq!(rule.classify(&json!({"name": "new"})), ValueShape::PlainObject);
///
/// let rule = ShapeRule::plain("id");
/// assert_eq!(rule.classify(&json!({"id": 3, "qty": 1})), ValueShape::IdObject);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeRule {
	nested_capable: bool,
	identity_field: Option<String>,
	pk_name: String,
}

impl ShapeRule {
	/// Rule for a target that resolves nested values itself
	pub fn nested(identity_field: Option<&str>) -> Self {
		Self {
			nested_capable: true,
			identity_field: identity_field.map(str::to_string),
			pk_name: "id".to_string(),
		}
	}

	/// Rule for a plain target, addressed by its primary key
	pub fn plain(pk_name: impl Into<String>) -> Self {
		Self {
			nested_capable: false,
			identity_field: None,
			pk_name: pk_name.into(),
		}
	}

	/// Tag a value
	pub fn classify(&self, value: &Value) -> ValueShape {
		match value {
			Value::Null => ValueShape::Null,
			Value::Bool(_) | Value::Number(_) | Value::String(_) => ValueShape::Bare,
			Value::Array(_) => ValueShape::Invalid,
			Value::Object(map) => {
				if self.nested_capable {
					match &self.identity_field {
						Some(field) if map.contains_key(field) => ValueShape::IdentityObject,
						_ => ValueShape::PlainObject,
					}
				} else if map.contains_key(&self.pk_name) {
					ValueShape::IdObject
				} else {
					ValueShape::PlainObject
				}
			}
		}
	}
}
