//! Resolution strategies for nested values
//!
//! Each strategy turns one nested value into either a substitute value for
//! the payload or `None`, meaning the value is dropped. Strategies only read
//! from the store; every write is deferred to persistence. When several
//! rows match a lookup the first one in the store's natural order wins.

use crate::context::SerializerContext;
use crate::handler::RelatedHandler;
use reinhardt_nested_core::value::display_value;
use reinhardt_nested_core::{
	AttributePolicy, Instance, PolicyAction, SerializerError, SerializerResult, ValueShape,
};
use serde_json::{Map, Value};
use tracing::debug;

/// Resolves the values of one related attribute
pub(crate) struct Resolver<'a> {
	pub serializer: &'a str,
	pub attr: &'a str,
	pub policy: &'a AttributePolicy,
	pub handler: &'a RelatedHandler,
	pub ctx: &'a SerializerContext,
}

impl Resolver<'_> {
	/// Tag `value` and dispatch it to the matching strategy
	pub async fn resolve(&self, value: Value) -> SerializerResult<Option<Value>> {
		let shape = self.handler.shape_rule(self.policy).classify(&value);
		debug!(
			serializer = self.serializer,
			attr = self.attr,
			shape = %shape,
			"resolving nested value"
		);

		match (shape, value) {
			(ValueShape::Null, _) => Ok(None),
			(ValueShape::Invalid, value) => Err(SerializerError::invalid_shape(
				self.attr,
				format!("a list is not a valid related value: {}", value),
			)),
			(ValueShape::Bare, value) => self.key_lookup(&value).await.map(Some),
			(ValueShape::IdentityObject, Value::Object(map)) => {
				self.lookup_with_patch(map).await.map(Some)
			}
			(ValueShape::IdObject, Value::Object(map)) => {
				self.id_lookup_with_patch(map).await.map(Some)
			}
			(ValueShape::PlainObject, Value::Object(map)) => self.create_or_match(map).await,
			(shape, value) => Err(SerializerError::invalid_shape(
				self.attr,
				format!("value {} does not have shape {}", value, shape),
			)),
		}
	}

	fn primary_field(&self) -> SerializerResult<&str> {
		match self.handler {
			RelatedHandler::Nested(_) => self.policy.primary_identity().ok_or_else(|| {
				SerializerError::configuration(
					self.attr,
					"identity field is not declared for a nested-capable related serializer",
				)
			}),
			RelatedHandler::Plain(s) => Ok(s.model().pk_name()),
		}
	}

	async fn first_match(&self, field: &str, value: &Value) -> SerializerResult<Option<Instance>> {
		let rows = self
			.ctx
			.store()
			.filter(self.handler.model().name(), field, value)
			.await?;
		Ok(rows.into_iter().next())
	}

	async fn require_match(&self, field: &str, value: &Value) -> SerializerResult<Instance> {
		self.first_match(field, value)
			.await?
			.ok_or_else(|| SerializerError::lookup_miss(self.attr, field, value))
	}

	async fn bound_validate(
		&self,
		row: &Instance,
		data: Map<String, Value>,
	) -> SerializerResult<Map<String, Value>> {
		let child = self.ctx.child()?;
		self.handler
			.serializer()
			.validate(&child, Some(row), &Value::Object(data))
			.await
			.map_err(|e| e.nested_under(self.attr))
	}

	/// Fetch the row a bare key names and substitute its representation
	///
	/// The substitute always carries the key, even when the related
	/// serializer does not render that field.
	pub async fn key_lookup(&self, key: &Value) -> SerializerResult<Value> {
		let field = self.primary_field()?;
		let row = self.require_match(field, key).await?;
		let child = self.ctx.child()?;
		let mut rendered = self
			.handler
			.serializer()
			.to_representation(&child, &row)
			.await?;
		if rendered.is_empty() {
			return Err(SerializerError::lookup_miss(self.attr, field, key));
		}
		rendered
			.entry(field.to_string())
			.or_insert_with(|| key.clone());
		debug!(attr = self.attr, field, key = %display_value(key), "bare key resolved");
		Ok(Value::Object(rendered))
	}

	/// Validate a patch against the row its identity field names
	///
	/// The result is validated but unwritten, and always carries the
	/// identity value so persistence can find the row again.
	pub async fn lookup_with_patch(&self, data: Map<String, Value>) -> SerializerResult<Value> {
		let field = self.primary_field()?.to_string();
		let key = data.get(&field).cloned().unwrap_or(Value::Null);
		let row = self.require_match(&field, &key).await?;
		let mut validated = self.bound_validate(&row, data).await?;
		validated.entry(field).or_insert(key);
		Ok(Value::Object(validated))
	}

	/// Plain targets: check the patch against the row its primary key names
	/// and hand the raw data on
	pub async fn id_lookup_with_patch(&self, data: Map<String, Value>) -> SerializerResult<Value> {
		let pk_name = self.handler.model().pk_name().to_string();
		let key = data.get(&pk_name).cloned().ok_or_else(|| {
			SerializerError::invalid_shape(
				self.attr,
				format!("can not find sub_attribute \"{}\"", pk_name),
			)
		})?;
		let row = self.require_match(&pk_name, &key).await?;
		self.bound_validate(&row, data.clone()).await?;
		Ok(Value::Object(data))
	}

	/// Match a secondary identity if one is given, else validate a new row
	pub async fn create_or_match(&self, data: Map<String, Value>) -> SerializerResult<Option<Value>> {
		for field in self.policy.secondary_identities() {
			let Some(key) = data.get(field).cloned() else {
				continue;
			};
			if let Some(row) = self.first_match(field, &key).await? {
				debug!(attr = self.attr, field = %field, "secondary identity matched");
				let mut validated = self.bound_validate(&row, data).await?;
				validated.entry(field.clone()).or_insert(key);
				return Ok(Some(Value::Object(validated)));
			}
		}

		if !self.policy.may_create {
			return Err(SerializerError::policy_violation(
				self.attr,
				PolicyAction::Create,
			));
		}

		let child = self.ctx.child()?;
		let validated = self
			.handler
			.serializer()
			.validate(&child, None, &Value::Object(data))
			.await
			.map_err(|e| e.nested_under(self.attr))?;
		Ok(Some(Value::Object(validated)))
	}
}
