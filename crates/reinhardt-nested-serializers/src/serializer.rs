//! Nested serializer
//!
//! `NestedSerializer` accepts nested input for related attributes: bare
//! keys, identity objects carrying a patch, or full payloads for new rows.
//! A write goes through four stages:
//!
//! 1. the payload normalizer rewrites every related attribute
//! 2. the field layer validates the normalized payload
//! 3. the persistence orchestrator writes the root row and its relations
//! 4. the gatekeeper approves the result
//!
//! Reads go through the gatekeeper and then the field layer.
//!
//! # Examples
//!
//! ```ignore
//! let items = NestedSerializer::builder("ItemSerializer", item_info)
//!     .field(Field::integer("id").read_only())
//!     .field(Field::string("sku"))
//!     .field(Field::integer("qty"))
//!     .permission_classes(vec![Arc::new(AllowAny)])
//!     .build()?;
//!
//! let orders = NestedSerializer::builder("OrderSerializer", order_info)
//!     .field(Field::integer("id").read_only())
//!     .field(Field::nested_many("items", RelatedHandler::nested(items)))
//!     .policy("items", PolicyDeclaration::new().identity("sku"))
//!     .permission_classes(vec![Arc::new(IsAuthenticated)])
//!     .build()?;
//!
//! let order = orders.write(&ctx, None, &json!({"items": [{"sku": "A1", "qty": 2}]})).await?;
//! ```

use crate::context::SerializerContext;
use crate::fields::{Field, FieldSet, ValidationOptions};
use crate::gatekeeper::{Gatekeeper, InstanceValidator};
use crate::handler::{ModelSerializer, ValidatedData};
use crate::normalizer;
use crate::permissions::{Permission, PermissionPolicy};
use crate::persistence::{self, CustomFields, NoCustomFields};
use crate::plain::expect_object;
use crate::policy_store::{NestedField, PolicyStore};
use async_trait::async_trait;
use http::Method;
use indexmap::IndexMap;
use reinhardt_nested_core::{
	Instance, ModelInfo, ModelStore, NestedSettings, PolicyDeclarations, SerializerError,
	SerializerResult,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::warn;

/// A serializer that resolves nested input for related attributes
pub struct NestedSerializer {
	name: String,
	model: ModelInfo,
	fields: FieldSet,
	policies: PolicyStore,
	settings: NestedSettings,
	permissions: PermissionPolicy,
	gatekeeper: Gatekeeper,
	custom_fields: Arc<dyn CustomFields>,
}

impl NestedSerializer {
	/// Start defining a serializer for `model`
	pub fn builder(name: impl Into<String>, model: ModelInfo) -> NestedSerializerBuilder {
		NestedSerializerBuilder::new(name, model)
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn model(&self) -> &ModelInfo {
		&self.model
	}

	pub fn fields(&self) -> &FieldSet {
		&self.fields
	}

	pub fn policies(&self) -> &PolicyStore {
		&self.policies
	}

	pub fn settings(&self) -> &NestedSettings {
		&self.settings
	}

	pub fn permissions(&self) -> &PermissionPolicy {
		&self.permissions
	}

	pub fn gatekeeper(&self) -> &Gatekeeper {
		&self.gatekeeper
	}

	pub(crate) fn custom_fields(&self) -> &dyn CustomFields {
		self.custom_fields.as_ref()
	}

	/// A root context honouring this serializer's depth limit
	pub fn context(&self, store: Arc<dyn ModelStore>) -> SerializerContext {
		SerializerContext::new(store).with_max_depth(self.settings.max_depth)
	}

	/// Persist validated data: create when `instance` is `None`, else update
	pub async fn save(
		&self,
		ctx: &SerializerContext,
		instance: Option<Instance>,
		validated: ValidatedData,
	) -> SerializerResult<Instance> {
		match instance {
			Some(instance) => persistence::update(self, ctx, instance, validated).await,
			None => persistence::create(self, ctx, validated).await,
		}
	}

	/// Validate a raw payload and persist it
	pub async fn write(
		&self,
		ctx: &SerializerContext,
		instance: Option<Instance>,
		data: &Value,
	) -> SerializerResult<Instance> {
		let validated = self.validate(ctx, instance.as_ref(), data).await?;
		self.save(ctx, instance, validated).await
	}
}

#[async_trait]
impl ModelSerializer for NestedSerializer {
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
		let normalized = normalizer::normalize(self, ctx, map).await?;
		let options = ValidationOptions {
			partial: ctx.is_partial(),
			pk_name: self.model.pk_name(),
			pk_writable: true,
			instance,
			skip_unique: true,
		};
		self.fields
			.to_internal_value(&normalized, &options)
			.map_err(SerializerError::Validation)
	}

	async fn create(
		&self,
		ctx: &SerializerContext,
		validated: ValidatedData,
	) -> SerializerResult<Instance> {
		persistence::create(self, ctx, validated).await
	}

	async fn update(
		&self,
		ctx: &SerializerContext,
		instance: Instance,
		validated: ValidatedData,
	) -> SerializerResult<Instance> {
		persistence::update(self, ctx, instance, validated).await
	}

	/// A row the gatekeeper rejects is rendered as an empty mapping
	async fn to_representation(
		&self,
		ctx: &SerializerContext,
		instance: &Instance,
	) -> SerializerResult<Map<String, Value>> {
		let request = ctx.require_request(&self.name)?;
		match self.gatekeeper.run(instance.clone(), request).await {
			Ok(approved) => {
				self.fields
					.represent(ctx, &self.model, &approved)
					.await
			}
			Err((validator, rejection)) => {
				warn!(
					serializer = %self.name,
					validator = %validator,
					reason = %rejection.reason,
					"hiding rejected row"
				);
				Ok(Map::new())
			}
		}
	}
}

impl std::fmt::Debug for NestedSerializer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("NestedSerializer")
			.field("name", &self.name)
			.field("model", &self.model.name())
			.field("fields", &self.fields.iter().map(|f| &f.name).collect::<Vec<_>>())
			.field("policies", &self.policies)
			.field("permissions", &self.permissions)
			.field("gatekeeper", &self.gatekeeper)
			.finish_non_exhaustive()
	}
}

/// Builder for [`NestedSerializer`]
pub struct NestedSerializerBuilder {
	name: String,
	model: ModelInfo,
	fields: FieldSet,
	declared: IndexMap<String, NestedField>,
	settings: NestedSettings,
	permissions: PermissionPolicy,
	gatekeeper: Gatekeeper,
	custom_fields: Arc<dyn CustomFields>,
}

impl NestedSerializerBuilder {
	pub fn new(name: impl Into<String>, model: ModelInfo) -> Self {
		Self {
			name: name.into(),
			model,
			fields: FieldSet::new(),
			declared: IndexMap::new(),
			settings: NestedSettings::default(),
			permissions: PermissionPolicy::new(),
			gatekeeper: Gatekeeper::new(),
			custom_fields: Arc::new(NoCustomFields),
		}
	}

	pub fn field(mut self, field: Field) -> Self {
		self.fields.add(field);
		self
	}

	/// Declare the policy of a related attribute
	pub fn policy(mut self, attr: impl Into<String>, policy: impl Into<NestedField>) -> Self {
		self.declared.insert(attr.into(), policy.into());
		self
	}

	/// Declare policies loaded from configuration; explicit handlers
	/// declared earlier are kept
	pub fn policies(mut self, declarations: PolicyDeclarations) -> Self {
		for (attr, declaration) in declarations.iter() {
			let entry = self.declared.entry(attr.clone()).or_default();
			entry.declaration = declaration.clone();
		}
		self
	}

	pub fn settings(mut self, settings: NestedSettings) -> Self {
		self.settings = settings;
		self
	}

	pub fn permissions(mut self, permissions: PermissionPolicy) -> Self {
		self.permissions = permissions;
		self
	}

	/// Set the default permission list
	pub fn permission_classes(mut self, permissions: Vec<Arc<dyn Permission>>) -> Self {
		self.permissions = self.permissions.with_default(permissions);
		self
	}

	/// Set the permission list used for one request method
	pub fn permission_classes_for(
		mut self,
		method: Method,
		permissions: Vec<Arc<dyn Permission>>,
	) -> Self {
		self.permissions = self.permissions.with_method(method, permissions);
		self
	}

	/// Append an instance validator to the gatekeeper chain
	pub fn validator<V: InstanceValidator + 'static>(mut self, validator: V) -> Self {
		self.gatekeeper = self.gatekeeper.with(validator);
		self
	}

	pub fn custom_fields<C: CustomFields + 'static>(mut self, custom_fields: C) -> Self {
		self.custom_fields = Arc::new(custom_fields);
		self
	}

	/// Complete every policy and check the definition
	///
	/// Fails when no default permission list is declared.
	pub fn build(self) -> SerializerResult<NestedSerializer> {
		self.permissions.ensure_default(&self.name)?;
		let policies = PolicyStore::build(
			&self.declared,
			&self.fields,
			self.settings.policy_defaults,
		);
		Ok(NestedSerializer {
			name: self.name,
			model: self.model,
			fields: self.fields,
			policies,
			settings: self.settings,
			permissions: self.permissions,
			gatekeeper: self.gatekeeper,
			custom_fields: self.custom_fields,
		})
	}
}
