//! Related serializer capability
//!
//! A related attribute is handled either by another nested-capable
//! serializer, which resolves nested values itself and is addressed by the
//! attribute's identity fields, or by a plain serializer, which is addressed
//! by the target's primary key. The choice is made when the serializer is
//! defined, never by inspecting values at runtime.

use crate::context::SerializerContext;
use crate::serializer::NestedSerializer;
use async_trait::async_trait;
use reinhardt_nested_core::{AttributePolicy, Instance, ModelInfo, SerializerResult, ShapeRule};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Validated attribute values ready for persistence
pub type ValidatedData = Map<String, Value>;

/// A serializer bound to one model
#[async_trait]
pub trait ModelSerializer: Send + Sync {
	/// Name used in errors and logs
	fn name(&self) -> &str;

	/// Metadata of the model this serializer writes
	fn model(&self) -> &ModelInfo;

	/// Validate a payload, optionally bound to an existing row
	///
	/// When bound, required fields the row already holds count as supplied.
	async fn validate(
		&self,
		ctx: &SerializerContext,
		instance: Option<&Instance>,
		data: &Value,
	) -> SerializerResult<ValidatedData>;

	/// Persist a new row from validated data
	async fn create(
		&self,
		ctx: &SerializerContext,
		validated: ValidatedData,
	) -> SerializerResult<Instance>;

	/// Apply validated data to an existing row and persist it
	async fn update(
		&self,
		ctx: &SerializerContext,
		instance: Instance,
		validated: ValidatedData,
	) -> SerializerResult<Instance>;

	/// Build the outbound mapping for a row
	async fn to_representation(
		&self,
		ctx: &SerializerContext,
		instance: &Instance,
	) -> SerializerResult<Map<String, Value>>;
}

/// The serializer that handles a related attribute
#[derive(Clone)]
pub enum RelatedHandler {
	/// Supports nested resolution; looked up by identity fields
	Nested(Arc<NestedSerializer>),
	/// Plain model serializer; looked up by primary key
	Plain(Arc<dyn ModelSerializer>),
}

impl RelatedHandler {
	pub fn nested(serializer: NestedSerializer) -> Self {
		RelatedHandler::Nested(Arc::new(serializer))
	}

	pub fn plain<S: ModelSerializer + 'static>(serializer: S) -> Self {
		RelatedHandler::Plain(Arc::new(serializer))
	}

	pub fn serializer(&self) -> &dyn ModelSerializer {
		match self {
			RelatedHandler::Nested(s) => s.as_ref(),
			RelatedHandler::Plain(s) => s.as_ref(),
		}
	}

	pub fn is_nested_capable(&self) -> bool {
		matches!(self, RelatedHandler::Nested(_))
	}

	pub fn name(&self) -> &str {
		self.serializer().name()
	}

	pub fn model(&self) -> &ModelInfo {
		self.serializer().model()
	}

	/// Shape rule for values of an attribute handled by this serializer
	pub fn shape_rule(&self, policy: &AttributePolicy) -> ShapeRule {
		match self {
			RelatedHandler::Nested(_) => ShapeRule::nested(policy.primary_identity()),
			RelatedHandler::Plain(s) => ShapeRule::plain(s.model().pk_name()),
		}
	}

	/// Fields an existing related row is looked up by, primary one first
	pub fn lookup_fields<'a>(&'a self, policy: &'a AttributePolicy) -> Vec<&'a str> {
		match self {
			RelatedHandler::Nested(_) => policy.identity_fields.iter().map(|f| f.as_str()).collect(),
			RelatedHandler::Plain(s) => vec![s.model().pk_name()],
		}
	}
}

impl std::fmt::Debug for RelatedHandler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			RelatedHandler::Nested(s) => f.debug_tuple("Nested").field(&s.name()).finish(),
			RelatedHandler::Plain(s) => f.debug_tuple("Plain").field(&s.name()).finish(),
		}
	}
}
