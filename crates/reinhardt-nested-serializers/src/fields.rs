//! Field layer
//!
//! Fields validate and coerce primitive values on the way in and read
//! attributes on the way out. Nested kinds only check the container shape;
//! their contents were resolved by the payload normalizer.

use crate::context::SerializerContext;
use crate::handler::RelatedHandler;
use indexmap::IndexMap;
use reinhardt_nested_core::{FieldErrors, Instance, ModelInfo, SerializerResult};
use serde_json::{Map, Value};
use std::sync::Arc;

/// External validator attached to a field
pub trait FieldValidator: Send + Sync {
	/// Check a coerced value; the error is the message reported for the field
	fn validate(&self, value: &Value) -> Result<(), String>;

	/// Uniqueness checks are skipped by nested-capable serializers
	fn is_uniqueness_check(&self) -> bool {
		false
	}
}

/// Minimum numeric value
#[derive(Debug, Clone, Copy)]
pub struct MinValueValidator(pub f64);

impl FieldValidator for MinValueValidator {
	fn validate(&self, value: &Value) -> Result<(), String> {
		match value.as_f64() {
			Some(n) if n < self.0 => Err(format!(
				"Ensure this value is greater than or equal to {}.",
				self.0
			)),
			_ => Ok(()),
		}
	}
}

/// Maximum string length in characters
#[derive(Debug, Clone, Copy)]
pub struct MaxLengthValidator(pub usize);

impl FieldValidator for MaxLengthValidator {
	fn validate(&self, value: &Value) -> Result<(), String> {
		match value.as_str() {
			Some(s) if s.chars().count() > self.0 => Err(format!(
				"Ensure this field has no more than {} characters.",
				self.0
			)),
			_ => Ok(()),
		}
	}
}

/// Uniqueness among a fixed set of taken values
///
/// Stands in for a database uniqueness check where the taken values are
/// known up front.
#[derive(Debug, Clone)]
pub struct UniqueValidator {
	taken: Vec<Value>,
}

impl UniqueValidator {
	pub fn new(taken: Vec<Value>) -> Self {
		Self { taken }
	}
}

impl FieldValidator for UniqueValidator {
	fn validate(&self, value: &Value) -> Result<(), String> {
		if self.taken.contains(value) {
			Err("This field must be unique.".to_string())
		} else {
			Ok(())
		}
	}

	fn is_uniqueness_check(&self) -> bool {
		true
	}
}

/// Value kind of a field
#[derive(Debug, Clone)]
pub enum FieldKind {
	Any,
	Boolean,
	Integer,
	Float,
	String,
	/// Free-form object with no model behind it; dropped from write payloads
	/// of nested-capable serializers
	Object,
	/// A single related row
	Nested(RelatedHandler),
	/// Many related rows
	NestedMany(RelatedHandler),
}

impl FieldKind {
	/// The related handler of a nested kind
	pub fn handler(&self) -> Option<&RelatedHandler> {
		match self {
			FieldKind::Nested(h) | FieldKind::NestedMany(h) => Some(h),
			_ => None,
		}
	}
}

/// A declared serializer field
#[derive(Clone)]
pub struct Field {
	pub name: String,
	pub kind: FieldKind,
	pub read_only: bool,
	pub required: bool,
	pub allow_null: bool,
	pub validators: Vec<Arc<dyn FieldValidator>>,
}

impl Field {
	pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
		Self {
			name: name.into(),
			kind,
			read_only: false,
			required: false,
			allow_null: false,
			validators: Vec::new(),
		}
	}

	pub fn any(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Any)
	}

	pub fn boolean(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Boolean)
	}

	pub fn integer(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Integer)
	}

	pub fn float(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Float)
	}

	pub fn string(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::String)
	}

	pub fn object(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Object)
	}

	pub fn nested(name: impl Into<String>, handler: RelatedHandler) -> Self {
		Self::new(name, FieldKind::Nested(handler))
	}

	pub fn nested_many(name: impl Into<String>, handler: RelatedHandler) -> Self {
		Self::new(name, FieldKind::NestedMany(handler))
	}

	pub fn read_only(mut self) -> Self {
		self.read_only = true;
		self
	}

	pub fn required(mut self) -> Self {
		self.required = true;
		self
	}

	pub fn allow_null(mut self) -> Self {
		self.allow_null = true;
		self
	}

	pub fn validator<V: FieldValidator + 'static>(mut self, validator: V) -> Self {
		self.validators.push(Arc::new(validator));
		self
	}

	/// Check and coerce one inbound value
	pub fn run_validation(&self, value: &Value, skip_unique: bool) -> Result<Value, Vec<String>> {
		if value.is_null() {
			return if self.allow_null {
				Ok(Value::Null)
			} else {
				Err(vec!["This field may not be null.".to_string()])
			};
		}

		let coerced = self.coerce(value).map_err(|message| vec![message])?;

		let messages: Vec<String> = self
			.validators
			.iter()
			.filter(|v| !(skip_unique && v.is_uniqueness_check()))
			.filter_map(|v| v.validate(&coerced).err())
			.collect();

		if messages.is_empty() {
			Ok(coerced)
		} else {
			Err(messages)
		}
	}

	fn coerce(&self, value: &Value) -> Result<Value, String> {
		match &self.kind {
			FieldKind::Any => Ok(value.clone()),
			FieldKind::Boolean => match value {
				Value::Bool(_) => Ok(value.clone()),
				Value::String(s) if matches!(s.as_str(), "true" | "True" | "1") => {
					Ok(Value::Bool(true))
				}
				Value::String(s) if matches!(s.as_str(), "false" | "False" | "0") => {
					Ok(Value::Bool(false))
				}
				_ => Err("Must be a valid boolean.".to_string()),
			},
			FieldKind::Integer => match value {
				Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
				Value::String(s) => s
					.trim()
					.parse::<i64>()
					.map(Value::from)
					.map_err(|_| "A valid integer is required.".to_string()),
				_ => Err("A valid integer is required.".to_string()),
			},
			FieldKind::Float => match value {
				Value::Number(_) => Ok(value.clone()),
				Value::String(s) => s
					.trim()
					.parse::<f64>()
					.ok()
					.and_then(serde_json::Number::from_f64)
					.map(Value::Number)
					.ok_or_else(|| "A valid number is required.".to_string()),
				_ => Err("A valid number is required.".to_string()),
			},
			FieldKind::String => match value {
				Value::String(_) => Ok(value.clone()),
				Value::Number(n) => Ok(Value::String(n.to_string())),
				_ => Err("Not a valid string.".to_string()),
			},
			FieldKind::Object | FieldKind::Nested(_) => match value {
				Value::Object(_) => Ok(value.clone()),
				other => Err(format!(
					"Invalid data. Expected a dictionary, but got {}.",
					type_name(other)
				)),
			},
			FieldKind::NestedMany(_) => match value {
				Value::Array(items) => {
					if let Some(bad) = items.iter().find(|v| !v.is_object()) {
						Err(format!(
							"Invalid data. Expected a dictionary, but got {}.",
							type_name(bad)
						))
					} else {
						Ok(value.clone())
					}
				}
				other => Err(format!(
					"Expected a list of items but got type \"{}\".",
					type_name(other)
				)),
			},
		}
	}
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("kind", &self.kind)
			.field("read_only", &self.read_only)
			.field("required", &self.required)
			.field("allow_null", &self.allow_null)
			.field("validators", &self.validators.len())
			.finish()
	}
}

/// Name of a JSON value's type as used in error messages
pub fn type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "bool",
		Value::Number(_) => "number",
		Value::String(_) => "str",
		Value::Array(_) => "list",
		Value::Object(_) => "dict",
	}
}

/// How a payload is checked against a field set
#[derive(Debug, Clone, Copy)]
pub struct ValidationOptions<'a> {
	/// Missing required fields are not reported
	pub partial: bool,
	/// Name of the model's primary key
	pub pk_name: &'a str,
	/// Whether a declared primary-key field accepts input
	pub pk_writable: bool,
	/// Existing row the payload is bound to
	pub instance: Option<&'a Instance>,
	/// Skip validators reporting `is_uniqueness_check`
	pub skip_unique: bool,
}

/// Ordered set of declared fields
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
	fields: IndexMap<String, Field>,
}

impl FieldSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add(&mut self, field: Field) {
		self.fields.insert(field.name.clone(), field);
	}

	pub fn with(mut self, field: Field) -> Self {
		self.add(field);
		self
	}

	pub fn get(&self, name: &str) -> Option<&Field> {
		self.fields.get(name)
	}

	pub fn iter(&self) -> impl Iterator<Item = &Field> {
		self.fields.values()
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	fn is_writable(&self, field: &Field, options: &ValidationOptions<'_>) -> bool {
		if field.name == options.pk_name {
			options.pk_writable
		} else {
			!field.read_only
		}
	}

	/// Validate every writable field of a payload
	///
	/// Unknown keys are ignored. All failures are collected before a single
	/// error map is returned.
	pub fn to_internal_value(
		&self,
		data: &Map<String, Value>,
		options: &ValidationOptions<'_>,
	) -> Result<Map<String, Value>, FieldErrors> {
		let mut validated = Map::new();
		let mut errors = FieldErrors::new();

		for field in self.fields.values() {
			if !self.is_writable(field, options) {
				continue;
			}
			match data.get(&field.name) {
				Some(value) => match field.run_validation(value, options.skip_unique) {
					Ok(value) => {
						validated.insert(field.name.clone(), value);
					}
					Err(messages) => {
						for message in messages {
							errors.add(&field.name, message);
						}
					}
				},
				None => {
					let held = options
						.instance
						.and_then(|i| i.get(&field.name))
						.is_some_and(|v| !v.is_null());
					if field.required && !options.partial && !held {
						errors.add(&field.name, "This field is required.");
					}
				}
			}
		}

		if errors.is_empty() {
			Ok(validated)
		} else {
			Err(errors)
		}
	}

	/// Build the outbound mapping of a row
	///
	/// Every declared field appears in order; attributes the row does not
	/// hold become `null`. Related rows are rendered by their serializer, and
	/// empty mappings are pruned from related sequences.
	pub async fn represent(
		&self,
		ctx: &SerializerContext,
		model: &ModelInfo,
		instance: &Instance,
	) -> SerializerResult<Map<String, Value>> {
		let mut output = Map::new();

		for field in self.fields.values() {
			let value = match &field.kind {
				FieldKind::Nested(handler) => {
					self.represent_one(ctx, model, instance, &field.name, handler)
						.await?
				}
				FieldKind::NestedMany(handler) => {
					self.represent_many(ctx, model, instance, &field.name, handler)
						.await?
				}
				_ => instance.get(&field.name).cloned().unwrap_or(Value::Null),
			};
			output.insert(field.name.clone(), value);
		}

		Ok(output)
	}

	async fn represent_one(
		&self,
		ctx: &SerializerContext,
		model: &ModelInfo,
		instance: &Instance,
		attr: &str,
		handler: &RelatedHandler,
	) -> SerializerResult<Value> {
		let Some(key) = instance.get(attr).filter(|v| !v.is_null()) else {
			return Ok(Value::Null);
		};
		let Some(to_field) = model.relation(attr).and_then(|r| r.to_field.as_deref()) else {
			return Ok(key.clone());
		};

		let rows = ctx
			.store()
			.filter(handler.model().name(), to_field, key)
			.await?;
		match rows.first() {
			Some(row) => {
				let child = ctx.child()?;
				let rendered = handler.serializer().to_representation(&child, row).await?;
				Ok(Value::Object(rendered))
			}
			None => Ok(Value::Null),
		}
	}

	async fn represent_many(
		&self,
		ctx: &SerializerContext,
		model: &ModelInfo,
		instance: &Instance,
		attr: &str,
		handler: &RelatedHandler,
	) -> SerializerResult<Value> {
		let is_to_many = model.relation(attr).is_some_and(|r| r.to_many);
		if !is_to_many || !instance.is_saved() {
			return Ok(instance.get(attr).cloned().unwrap_or(Value::Null));
		}

		let child = ctx.child()?;
		let mut rendered = Vec::new();
		for row in ctx.store().related(instance, attr).await? {
			let map = handler.serializer().to_representation(&child, &row).await?;
			if !map.is_empty() {
				rendered.push(Value::Object(map));
			}
		}
		Ok(Value::Array(rendered))
	}
}
