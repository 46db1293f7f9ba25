//! Persistence collaborator interface
//!
//! The engine never talks to a database directly. It issues the abstract
//! operations below against whatever implements [`ModelStore`]; query
//! execution, transactions and connection handling stay behind the trait.

use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A row of some model as seen by the engine
///
/// To-one relations are stored as the related row's key under the
/// relation's attribute name; to-many relations live in the store and are
/// reached through [`ModelStore::related`].
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
	model: String,
	pk_name: String,
	pk: Option<Value>,
	fields: Map<String, Value>,
}

impl Instance {
	/// Create an unsaved instance whose primary key is `id`
	pub fn new(model: impl Into<String>) -> Self {
		Self {
			model: model.into(),
			pk_name: "id".to_string(),
			pk: None,
			fields: Map::new(),
		}
	}

	pub fn with_pk_name(mut self, pk_name: impl Into<String>) -> Self {
		self.pk_name = pk_name.into();
		self
	}

	pub fn with_pk(mut self, pk: Value) -> Self {
		self.pk = Some(pk);
		self
	}

	pub fn with_fields(mut self, fields: Map<String, Value>) -> Self {
		for (name, value) in fields {
			self.set(name, value);
		}
		self
	}

	pub fn model(&self) -> &str {
		&self.model
	}

	pub fn pk_name(&self) -> &str {
		&self.pk_name
	}

	pub fn pk(&self) -> Option<&Value> {
		self.pk.as_ref()
	}

	/// The primary key, or `Unsaved` when the row was never persisted
	pub fn require_pk(&self) -> Result<&Value, StoreError> {
		self.pk.as_ref().ok_or_else(|| StoreError::Unsaved {
			model: self.model.clone(),
		})
	}

	pub fn is_saved(&self) -> bool {
		self.pk.is_some()
	}

	/// Read an attribute; the primary key is reachable under its name
	pub fn get(&self, name: &str) -> Option<&Value> {
		if name == self.pk_name {
			self.pk.as_ref()
		} else {
			self.fields.get(name)
		}
	}

	/// Write an attribute; writing the primary key name sets the key
	pub fn set(&mut self, name: impl Into<String>, value: Value) {
		let name = name.into();
		if name == self.pk_name {
			self.pk = if value.is_null() { None } else { Some(value) };
		} else {
			self.fields.insert(name, value);
		}
	}

	pub fn fields(&self) -> &Map<String, Value> {
		&self.fields
	}

	/// Whether `field` currently holds `value`
	pub fn matches(&self, field: &str, value: &Value) -> bool {
		self.get(field) == Some(value)
	}
}

/// Operations the engine needs from the persistence layer
///
/// Every method is awaited on its own; the engine never issues two calls
/// concurrently.
#[async_trait]
pub trait ModelStore: Send + Sync {
	/// Rows of `model` whose `field` equals `value`, in natural order
	async fn filter(&self, model: &str, field: &str, value: &Value)
	-> Result<Vec<Instance>, StoreError>;

	/// Persist a new row and return it with its primary key
	async fn create(&self, model: &str, fields: Map<String, Value>) -> Result<Instance, StoreError>;

	/// Persist the current state of an existing row
	async fn save(&self, instance: &mut Instance) -> Result<(), StoreError>;

	/// Delete a row together with its relation links
	async fn delete(&self, instance: &Instance) -> Result<(), StoreError>;

	/// Rows currently attached to a to-many relation
	async fn related(&self, instance: &Instance, attr: &str) -> Result<Vec<Instance>, StoreError>;

	/// Attach a row to a to-many relation; attaching twice is a no-op
	async fn add(&self, instance: &Instance, attr: &str, related: &Instance)
	-> Result<(), StoreError>;

	/// Detach the row with primary key `related_pk` from a to-many relation
	async fn remove(&self, instance: &Instance, attr: &str, related_pk: &Value)
	-> Result<(), StoreError>;

	/// Detach every row from a to-many relation
	async fn clear(&self, instance: &Instance, attr: &str) -> Result<(), StoreError> {
		for related in self.related(instance, attr).await? {
			let pk = related.require_pk()?.clone();
			self.remove(instance, attr, &pk).await?;
		}
		Ok(())
	}
}
