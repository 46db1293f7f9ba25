//! Plain model serializer
//!
//! Validates and writes the scalar columns of one model. It does not resolve
//! nested values; a parent addresses its rows by primary key.

use crate::context::SerializerContext;
use crate::fields::{Field, FieldSet, ValidationOptions, type_name};
use crate::handler::{ModelSerializer, ValidatedData};
use async_trait::async_trait;
use reinhardt_nested_core::{
	FieldErrors, Instance, ModelInfo, NON_FIELD_ERRORS, RelationKind, SerializerError,
	SerializerResult,
};
use serde_json::{Map, Value};

/// A serializer without nested resolution
///
/// # Examples
///
/// ```
/// use reinhardt_nested_core::ModelInfo;
/// use reinhardt_nested_serializers::{Field, ModelSerializer, PlainSerializer};
///
/// let serializer = PlainSerializer::new("TagSerializer", ModelInfo::new("Tag").with_field("label"))
///     .field(Field::integer("id").read_only())
///     .field(Field::string("label").required());
///
/// assert_eq!(serializer.name(), "TagSerializer");
/// ```
#[derive(Debug, Clone)]
pub struct PlainSerializer {
	name: String,
	model: ModelInfo,
	fields: FieldSet,
}

impl PlainSerializer {
	pub fn new(name: impl Into<String>, model: ModelInfo) -> Self {
		Self {
			name: name.into(),
			model,
			fields: FieldSet::new(),
		}
	}

	pub fn field(mut self, field: Field) -> Self {
		self.fields.add(field);
		self
	}

	pub fn fields(&self) -> &FieldSet {
		&self.fields
	}

	fn scalar_columns(&self, validated: ValidatedData) -> Map<String, Value> {
		validated
			.into_iter()
			.filter(|(attr, _)| {
				!self.model.is_pk(attr) && self.model.classify(attr) == RelationKind::Scalar
			})
			.collect()
	}
}

/// Reject anything but an object before field validation
pub(crate) fn expect_object<'a>(data: &'a Value) -> SerializerResult<&'a Map<String, Value>> {
	data.as_object().ok_or_else(|| {
		SerializerError::Validation(FieldErrors::single(
			NON_FIELD_ERRORS,
			format!(
				"Invalid data. Expected a dictionary, but got {}.",
				type_name(data)
			),
		))
	})
}

#[async_trait]
impl ModelSerializer for PlainSerializer {
	fn name(&self) -> &str {
		&self.name
	}

	fn model(&self) -> &ModelInfo {
		&self.model
	}

	async fn validate(
		&self,
		ctx: &SerializerContext,
		instance: Option<&Instance>,
		data: &Value,
	) -> SerializerResult<ValidatedData> {
		let map = expect_object(data)?;
		let options = ValidationOptions {
			partial: ctx.is_partial(),
			pk_name: self.model.pk_name(),
			pk_writable: false,
			instance,
			skip_unique: false,
		};
		self.fields
			.to_internal_value(map, &options)
			.map_err(SerializerError::Validation)
	}

	async fn create(
		&self,
		ctx: &SerializerContext,
		validated: ValidatedData,
	) -> SerializerResult<Instance> {
		let columns = self.scalar_columns(validated);
		Ok(ctx.store().create(self.model.name(), columns).await?)
	}

	async fn update(
		&self,
		ctx: &SerializerContext,
		mut instance: Instance,
		validated: ValidatedData,
	) -> SerializerResult<Instance> {
		for (attr, value) in self.scalar_columns(validated) {
			instance.set(attr, value);
		}
		ctx.store().save(&mut instance).await?;
		Ok(instance)
	}

	async fn to_representation(
		&self,
		ctx: &SerializerContext,
		instance: &Instance,
	) -> SerializerResult<Map<String, Value>> {
		self.fields.represent(ctx, &self.model, instance).await
	}
}
