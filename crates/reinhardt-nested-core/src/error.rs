//! Error taxonomy for nested serializers
//!
//! Every failure of the engine is fatal for the whole write: there are no
//! retries and no partial application. Plain field validation is the one
//! place where messages are aggregated per field before a single error is
//! raised.

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

/// Key used for errors that do not belong to a single field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Ordered `field -> messages` mapping
///
/// Used both for the aggregated errors of a root payload and as the
/// structured detail of a failed related payload.
///
/// # Examples
///
/// ```
/// use reinhardt_nested_core::error::FieldErrors;
///
/// let mut errors = FieldErrors::new();
/// errors.add("qty", "This field is required.");
/// errors.add("qty", "Must be positive.");
/// assert_eq!(errors.get("qty").map(|m| m.len()), Some(2));
/// assert!(!errors.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(IndexMap<String, Vec<String>>);

impl FieldErrors {
	/// Create an empty error map
	pub fn new() -> Self {
		Self::default()
	}

	/// Create an error map holding a single message
	pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
		let mut errors = Self::new();
		errors.add(field, message);
		errors
	}

	/// Append a message for a field
	pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
		self.0.entry(field.into()).or_default().push(message.into());
	}

	/// Merge messages collected by a nested payload under `field`
	pub fn nest(&mut self, field: &str, nested: &FieldErrors) {
		for (name, messages) in nested.iter() {
			for message in messages {
				self.add(field, format!("{}: {}", name, message));
			}
		}
	}

	pub fn get(&self, field: &str) -> Option<&Vec<String>> {
		self.0.get(field)
	}

	pub fn contains(&self, field: &str) -> bool {
		self.0.contains_key(field)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
		self.0.iter()
	}

	/// Field names in the order their first error was recorded
	pub fn fields(&self) -> Vec<&str> {
		self.0.keys().map(|k| k.as_str()).collect()
	}
}

impl std::fmt::Display for FieldErrors {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let rendered = self
			.0
			.iter()
			.map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
			.collect::<Vec<_>>()
			.join(", ");
		write!(f, "{{{}}}", rendered)
	}
}

/// Which policy flag a write attempted to bypass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyAction {
	/// Creating a new related row (`may_create`)
	Create,
	/// Patching an existing related row (`may_edit`)
	Edit,
}

impl PolicyAction {
	/// Name of the policy flag guarding this action
	pub fn flag(&self) -> &'static str {
		match self {
			PolicyAction::Create => "may_create",
			PolicyAction::Edit => "may_edit",
		}
	}
}

impl std::fmt::Display for PolicyAction {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			PolicyAction::Create => write!(f, "create"),
			PolicyAction::Edit => write!(f, "update"),
		}
	}
}

/// Errors reported by the persistence collaborator
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
	/// The collaborator does not know the model
	#[error("Unknown model '{0}'")]
	UnknownModel(String),
	/// The operation needs a persisted row
	#[error("Instance of '{model}' has no primary key")]
	Unsaved { model: String },
	/// The row vanished between lookup and write
	#[error("No '{model}' row with primary key {pk}")]
	NotFound { model: String, pk: String },
	/// Anything the backend itself reports
	#[error("Database error: {message}")]
	Backend { message: String },
}

/// Fatal errors of the nested serializer engine
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SerializerError {
	/// Missing identity field, missing related serializer, missing default
	/// permission list and similar definition mistakes
	#[error("Configuration error for attribute '{attr}': {message}")]
	Configuration { attr: String, message: String },

	/// An identity-field or primary-key lookup matched no row
	#[error("no {field} with value of ({value}) for attribute: {attr}")]
	LookupMiss {
		attr: String,
		field: String,
		value: String,
	},

	/// A create or edit was attempted while the attribute policy forbids it
	#[error("can not {action} attribute: \"{attr}\" when {flag} is set to false", flag = .action.flag())]
	PolicyViolation { attr: String, action: PolicyAction },

	/// Field-level validation of the root payload failed
	#[error("Validation failed: {0}")]
	Validation(FieldErrors),

	/// A related payload failed its own field-level validation
	#[error("Validation failed for attribute '{attr}': {errors}")]
	NestedValidation { attr: String, errors: FieldErrors },

	/// A nested value has a shape no resolution strategy accepts
	#[error("Unsupported value for attribute '{attr}': {message}")]
	InvalidShape { attr: String, message: String },

	/// An instance validator vetoed the instance
	#[error("Instance rejected by '{validator}': {reason}")]
	Rejected { validator: String, reason: String },

	/// A request context was needed but none was supplied
	#[error("can not find request in serializer context for \"{serializer}\" serializer")]
	MissingRequest { serializer: String },

	/// The permission chain refused the request
	#[error("Permission '{permission}' denied {method} on '{target}'")]
	PermissionDenied {
		permission: String,
		method: String,
		target: String,
	},

	/// Nested resolution went deeper than the configured limit
	#[error("Maximum nesting depth {max_depth} exceeded")]
	DepthExceeded { max_depth: usize },

	/// The persistence collaborator failed
	#[error(transparent)]
	Store(#[from] StoreError),
}

impl SerializerError {
	/// Create a configuration error
	pub fn configuration(attr: impl Into<String>, message: impl Into<String>) -> Self {
		SerializerError::Configuration {
			attr: attr.into(),
			message: message.into(),
		}
	}

	/// Create a lookup-miss error, rendering the looked-up value
	pub fn lookup_miss(
		attr: impl Into<String>,
		field: impl Into<String>,
		value: &serde_json::Value,
	) -> Self {
		SerializerError::LookupMiss {
			attr: attr.into(),
			field: field.into(),
			value: crate::value::display_value(value),
		}
	}

	/// Create a policy-violation error
	pub fn policy_violation(attr: impl Into<String>, action: PolicyAction) -> Self {
		SerializerError::PolicyViolation {
			attr: attr.into(),
			action,
		}
	}

	/// Create an invalid-shape error
	pub fn invalid_shape(attr: impl Into<String>, message: impl Into<String>) -> Self {
		SerializerError::InvalidShape {
			attr: attr.into(),
			message: message.into(),
		}
	}

	/// Check if this is a (root or nested) validation error
	pub fn is_validation_error(&self) -> bool {
		matches!(
			self,
			SerializerError::Validation(_) | SerializerError::NestedValidation { .. }
		)
	}

	/// Check if this is a policy violation
	pub fn is_policy_violation(&self) -> bool {
		matches!(self, SerializerError::PolicyViolation { .. })
	}

	/// Structured field errors, if this error carries any
	pub fn field_errors(&self) -> Option<&FieldErrors> {
		match self {
			SerializerError::Validation(errors) => Some(errors),
			SerializerError::NestedValidation { errors, .. } => Some(errors),
			_ => None,
		}
	}

	/// The payload attribute the error is about, if any
	pub fn attr(&self) -> Option<&str> {
		match self {
			SerializerError::Configuration { attr, .. }
			| SerializerError::LookupMiss { attr, .. }
			| SerializerError::PolicyViolation { attr, .. }
			| SerializerError::NestedValidation { attr, .. }
			| SerializerError::InvalidShape { attr, .. } => Some(attr),
			_ => None,
		}
	}

	/// Re-key a related serializer's failure under the attribute that
	/// embedded it
	///
	/// Root validation errors of the related payload become
	/// `NestedValidation` for `attr`; everything else passes through.
	pub fn nested_under(self, attr: &str) -> Self {
		match self {
			SerializerError::Validation(errors) => SerializerError::NestedValidation {
				attr: attr.to_string(),
				errors,
			},
			SerializerError::NestedValidation {
				attr: inner,
				errors,
			} => {
				let mut nested = FieldErrors::new();
				nested.nest(&inner, &errors);
				SerializerError::NestedValidation {
					attr: attr.to_string(),
					errors: nested,
				}
			}
			other => other,
		}
	}
}

/// Result alias used across the engine
pub type SerializerResult<T> = Result<T, SerializerError>;
