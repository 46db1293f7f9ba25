//! Persistence orchestrator
//!
//! Writes validated data in a fixed order:
//!
//! ```text
//! create: permissions -> partition -> plan relations -> create root
//!         -> attach to-many -> attach to-one -> custom -> save -> gatekeeper
//! update: permissions -> gatekeeper -> partition -> plan relations
//!         -> set scalars -> attach to-many -> attach to-one -> custom -> save
//! ```
//!
//! Relations are planned completely (lookups, patch detection, policy
//! checks) before anything is written, so a policy violation never leaves a
//! half-applied attribute behind. A root row created and then rejected by
//! the gatekeeper, or whose relations fail to attach, is deleted again.

use crate::context::SerializerContext;
use crate::handler::{RelatedHandler, ValidatedData};
use crate::serializer::NestedSerializer;
use async_trait::async_trait;
use reinhardt_nested_core::value::display_value;
use reinhardt_nested_core::{
	AttributePolicy, Instance, ModelInfo, PolicyAction, RelationInfo, RelationKind,
	SerializerError, SerializerResult,
};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Whether a write creates or updates the root row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
	Create,
	Update,
}

/// Hook for attributes the model does not describe
///
/// The default implementation ignores them.
#[async_trait]
pub trait CustomFields: Send + Sync {
	async fn apply(
		&self,
		ctx: &SerializerContext,
		instance: &mut Instance,
		fields: &[(String, Value)],
		mode: WriteMode,
	) -> SerializerResult<()> {
		let _ = (ctx, instance, mode);
		if !fields.is_empty() {
			debug!(count = fields.len(), "ignoring custom attributes");
		}
		Ok(())
	}
}

/// The default custom-attribute hook
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCustomFields;

impl CustomFields for NoCustomFields {}

/// Validated attributes grouped by relation kind
#[derive(Debug, Default, PartialEq)]
pub struct Buckets {
	pub scalars: Vec<(String, Value)>,
	pub to_many: Vec<(String, Value)>,
	pub to_one: Vec<(String, Value)>,
	pub custom: Vec<(String, Value)>,
}

/// Split validated data by relation kind; the primary key is never written
pub fn partition(model: &ModelInfo, validated: ValidatedData) -> Buckets {
	let mut buckets = Buckets::default();
	for (attr, value) in validated {
		match model.classify(&attr) {
			RelationKind::Scalar if model.is_pk(&attr) => {
				debug!(model = model.name(), attr = %attr, "primary key is not assigned from payload");
			}
			RelationKind::Scalar => buckets.scalars.push((attr, value)),
			RelationKind::ToMany => buckets.to_many.push((attr, value)),
			RelationKind::ToOne => buckets.to_one.push((attr, value)),
			RelationKind::Custom => buckets.custom.push((attr, value)),
		}
	}
	buckets
}

/// Entries of `data` that differ from `current`, lookup fields excluded
pub fn compute_patch(
	data: &Map<String, Value>,
	current: &Map<String, Value>,
	lookup_fields: &[&str],
) -> Map<String, Value> {
	data.iter()
		.filter(|(k, _)| !lookup_fields.contains(&k.as_str()))
		.filter(|(k, v)| current.get(k.as_str()) != Some(*v))
		.map(|(k, v)| (k.clone(), v.clone()))
		.collect()
}

/// What to do with one related value
#[derive(Debug)]
enum ElementPlan {
	/// Attach an existing row as is
	Attach(Instance),
	/// Update an existing row, then attach it
	Patch(Instance, ValidatedData),
	/// Create a row, then attach it
	Create(ValidatedData),
}

#[derive(Debug)]
enum PlanTarget {
	ToMany(Vec<ElementPlan>),
	ToOne {
		to_field: String,
		element: Option<ElementPlan>,
	},
}

#[derive(Debug)]
struct RelationPlan {
	attr: String,
	handler: Option<RelatedHandler>,
	clear_before_set: bool,
	target: PlanTarget,
}

struct Planner<'a> {
	serializer: &'a NestedSerializer,
	ctx: &'a SerializerContext,
}

impl Planner<'_> {
	async fn plan_all(
		&self,
		to_many: Vec<(String, Value)>,
		to_one: Vec<(String, Value)>,
	) -> SerializerResult<Vec<RelationPlan>> {
		let mut plans = Vec::with_capacity(to_many.len() + to_one.len());
		for (attr, value) in to_many {
			plans.push(self.plan_relation(attr, value, true).await?);
		}
		for (attr, value) in to_one {
			plans.push(self.plan_relation(attr, value, false).await?);
		}
		Ok(plans)
	}

	async fn plan_relation(
		&self,
		attr: String,
		value: Value,
		to_many: bool,
	) -> SerializerResult<RelationPlan> {
		let resolved = self.serializer.policies().resolve(&attr);
		let relation = self.serializer.model().relation(&attr).ok_or_else(|| {
			SerializerError::configuration(&attr, "relation metadata is missing")
		})?;
		let handler = resolved.handler.as_ref();
		let policy = &resolved.policy;

		let target = if to_many {
			let items = match value {
				Value::Array(items) => items,
				Value::Null => Vec::new(),
				other => {
					return Err(SerializerError::invalid_shape(
						&attr,
						format!("expected a list of related values, got {}", other),
					));
				}
			};
			let mut elements = Vec::with_capacity(items.len());
			for item in items {
				elements.push(
					self.plan_element(&attr, policy, handler, relation, item)
						.await?,
				);
			}
			PlanTarget::ToMany(elements)
		} else {
			let to_field = relation.to_field.clone().ok_or_else(|| {
				SerializerError::configuration(&attr, "to-one relation has no target field")
			})?;
			let element = if value.is_null() {
				None
			} else {
				Some(
					self.plan_element(&attr, policy, handler, relation, value)
						.await?,
				)
			};
			PlanTarget::ToOne { to_field, element }
		};

		Ok(RelationPlan {
			clear_before_set: policy.clear_before_set,
			handler: handler.cloned(),
			attr,
			target,
		})
	}

	async fn first_match(
		&self,
		model: &str,
		field: &str,
		key: &Value,
	) -> SerializerResult<Option<Instance>> {
		let rows = self.ctx.store().filter(model, field, key).await?;
		Ok(rows.into_iter().next())
	}

	async fn plan_element(
		&self,
		attr: &str,
		policy: &AttributePolicy,
		handler: Option<&RelatedHandler>,
		relation: &RelationInfo,
		value: Value,
	) -> SerializerResult<ElementPlan> {
		let related_model = relation.related_model.as_str();

		let data = match value {
			Value::Object(data) => data,
			Value::Array(_) | Value::Null => {
				return Err(SerializerError::invalid_shape(
					attr,
					format!("{} is not a valid related value", value),
				));
			}
			key => {
				let field = handler
					.and_then(|h| h.lookup_fields(policy).first().map(|f| f.to_string()))
					.or_else(|| relation.to_field.clone())
					.unwrap_or_else(|| "id".to_string());
				let row = self
					.first_match(related_model, &field, &key)
					.await?
					.ok_or_else(|| SerializerError::lookup_miss(attr, &field, &key))?;
				return Ok(ElementPlan::Attach(row));
			}
		};

		let handler = handler.ok_or_else(|| {
			SerializerError::configuration(attr, "related serializer is not declared")
		})?;
		let lookup = handler.lookup_fields(policy);
		let child = self.ctx.child()?;

		let mut matched = None;
		if let Some(primary) = lookup.first() {
			if let Some(key) = data.get(*primary) {
				let row = self
					.first_match(related_model, primary, key)
					.await?
					.ok_or_else(|| SerializerError::lookup_miss(attr, *primary, key))?;
				matched = Some(row);
			}
		}
		if matched.is_none() {
			for field in lookup.iter().skip(1) {
				let Some(key) = data.get(*field) else {
					continue;
				};
				if let Some(row) = self.first_match(related_model, field, key).await? {
					matched = Some(row);
					break;
				}
			}
		}

		match matched {
			Some(row) => {
				let current = handler
					.serializer()
					.to_representation(&child, &row)
					.await?;
				let patch = compute_patch(&data, &current, &lookup);
				if patch.is_empty() {
					debug!(attr, pk = ?row.pk(), "attaching existing row");
					return Ok(ElementPlan::Attach(row));
				}
				if !policy.may_edit {
					return Err(SerializerError::policy_violation(attr, PolicyAction::Edit));
				}
				let patch = match handler {
					RelatedHandler::Nested(_) => patch,
					RelatedHandler::Plain(s) => s
						.validate(&child, Some(&row), &Value::Object(patch))
						.await
						.map_err(|e| e.nested_under(attr))?,
				};
				Ok(ElementPlan::Patch(row, patch))
			}
			None => {
				if !policy.may_create {
					return Err(SerializerError::policy_violation(
						attr,
						PolicyAction::Create,
					));
				}
				let data = match handler {
					RelatedHandler::Nested(_) => data,
					RelatedHandler::Plain(s) => s
						.validate(&child, None, &Value::Object(data))
						.await
						.map_err(|e| e.nested_under(attr))?,
				};
				Ok(ElementPlan::Create(data))
			}
		}
	}

	async fn realize(
		&self,
		attr: &str,
		handler: Option<&RelatedHandler>,
		element: ElementPlan,
	) -> SerializerResult<Instance> {
		let require = || {
			handler.ok_or_else(|| {
				SerializerError::configuration(attr, "related serializer is not declared")
			})
		};
		match element {
			ElementPlan::Attach(row) => Ok(row),
			ElementPlan::Patch(row, data) => {
				let handler = require()?;
				let child = self.ctx.child()?;
				handler
					.serializer()
					.update(&child, row, data)
					.await
					.map_err(|e| e.nested_under(attr))
			}
			ElementPlan::Create(data) => {
				let handler = require()?;
				let child = self.ctx.child()?;
				handler
					.serializer()
					.create(&child, data)
					.await
					.map_err(|e| e.nested_under(attr))
			}
		}
	}

	async fn apply(&self, root: &mut Instance, plan: RelationPlan) -> SerializerResult<()> {
		let store = self.ctx.store();
		let handler = plan.handler.as_ref();
		match plan.target {
			PlanTarget::ToMany(elements) => {
				if plan.clear_before_set {
					debug!(attr = %plan.attr, "clearing relation before set");
					store.clear(root, &plan.attr).await?;
				}
				for element in elements {
					let row = self.realize(&plan.attr, handler, element).await?;
					store.add(root, &plan.attr, &row).await?;
				}
			}
			PlanTarget::ToOne { to_field, element } => {
				let key = match element {
					Some(element) => {
						let row = self.realize(&plan.attr, handler, element).await?;
						row.get(&to_field).cloned().unwrap_or(Value::Null)
					}
					None => Value::Null,
				};
				debug!(attr = %plan.attr, key = %display_value(&key), "setting to-one relation");
				root.set(plan.attr.clone(), key);
			}
		}
		Ok(())
	}
}

/// Create the root row and everything attached to it
///
/// Any failure once the root row exists deletes it again.
pub(crate) async fn create(
	serializer: &NestedSerializer,
	ctx: &SerializerContext,
	validated: ValidatedData,
) -> SerializerResult<Instance> {
	let name = serializer.name();
	let request = ctx.require_request(name)?;
	serializer.permissions().check(name, request).await?;

	let buckets = partition(serializer.model(), validated);
	let planner = Planner { serializer, ctx };
	let plans = planner.plan_all(buckets.to_many, buckets.to_one).await?;

	let columns: Map<String, Value> = buckets.scalars.into_iter().collect();
	let mut instance = ctx.store().create(serializer.model().name(), columns).await?;

	let outcome = async {
		for plan in plans {
			planner.apply(&mut instance, plan).await?;
		}
		serializer
			.custom_fields()
			.apply(ctx, &mut instance, &buckets.custom, WriteMode::Create)
			.await?;
		ctx.store().save(&mut instance).await?;
		serializer
			.gatekeeper()
			.check(name, instance.clone(), Some(request))
			.await
	}
	.await;

	match outcome {
		Ok(approved) => {
			info!(serializer = name, pk = ?approved.pk(), "created");
			Ok(approved)
		}
		Err(err) => {
			warn!(serializer = name, pk = ?instance.pk(), error = %err, "deleting aborted row");
			ctx.store().delete(&instance).await?;
			Err(err)
		}
	}
}

/// Apply validated data to an existing root row
pub(crate) async fn update(
	serializer: &NestedSerializer,
	ctx: &SerializerContext,
	instance: Instance,
	validated: ValidatedData,
) -> SerializerResult<Instance> {
	let name = serializer.name();
	let request = ctx.require_request(name)?;
	serializer.permissions().check(name, request).await?;

	let mut approved = serializer
		.gatekeeper()
		.check(name, instance, Some(request))
		.await?;

	let buckets = partition(serializer.model(), validated);
	let planner = Planner { serializer, ctx };
	let plans = planner.plan_all(buckets.to_many, buckets.to_one).await?;

	for (attr, value) in buckets.scalars {
		approved.set(attr, value);
	}
	for plan in plans {
		planner.apply(&mut approved, plan).await?;
	}
	serializer
		.custom_fields()
		.apply(ctx, &mut approved, &buckets.custom, WriteMode::Update)
		.await?;
	ctx.store().save(&mut approved).await?;

	info!(serializer = name, pk = ?approved.pk(), "updated");
	Ok(approved)
}
