//! In-memory persistence collaborator

use async_trait::async_trait;
use parking_lot::Mutex;
use reinhardt_nested_core::{Instance, ModelInfo, ModelStore, StoreError};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Number of writes of each kind the store has served
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpCounters {
	pub creates: usize,
	pub saves: usize,
	pub deletes: usize,
	pub adds: usize,
	pub removes: usize,
}

impl OpCounters {
	/// Total number of writes
	pub fn writes(&self) -> usize {
		self.creates + self.saves + self.deletes + self.adds + self.removes
	}
}

#[derive(Debug)]
struct Table {
	pk_name: String,
	rows: Vec<Instance>,
	next_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LinkKey {
	model: String,
	pk: String,
	attr: String,
}

#[derive(Debug, Clone)]
struct Link {
	model: String,
	pk: Value,
}

#[derive(Debug, Default)]
struct State {
	tables: HashMap<String, Table>,
	links: HashMap<LinkKey, Vec<Link>>,
	counters: OpCounters,
}

impl State {
	fn table(&self, model: &str) -> Result<&Table, StoreError> {
		self.tables
			.get(model)
			.ok_or_else(|| StoreError::UnknownModel(model.to_string()))
	}

	fn table_mut(&mut self, model: &str) -> Result<&mut Table, StoreError> {
		self.tables
			.get_mut(model)
			.ok_or_else(|| StoreError::UnknownModel(model.to_string()))
	}

	fn insert(&mut self, model: &str, fields: Map<String, Value>) -> Result<Instance, StoreError> {
		let table = self.table_mut(model)?;
		let mut instance = Instance::new(model)
			.with_pk_name(table.pk_name.clone())
			.with_fields(fields);
		if !instance.is_saved() {
			instance.set(table.pk_name.clone(), Value::from(table.next_id));
			table.next_id += 1;
		}
		table.rows.push(instance.clone());
		Ok(instance)
	}

	fn find(&self, model: &str, pk: &Value) -> Result<Option<Instance>, StoreError> {
		Ok(self
			.table(model)?
			.rows
			.iter()
			.find(|row| row.pk() == Some(pk))
			.cloned())
	}
}

fn link_key(instance: &Instance, attr: &str) -> Result<LinkKey, StoreError> {
	Ok(LinkKey {
		model: instance.model().to_string(),
		pk: instance.require_pk()?.to_string(),
		attr: attr.to_string(),
	})
}

/// A [`ModelStore`] keeping rows in insertion order
///
/// Primary keys are auto-incremented integers unless a row is inserted with
/// its key. To-many relations live in link tables; deleting a row removes
/// every link that mentions it.
///
/// # Examples
///
/// ```
/// use reinhardt_nested_core::ModelInfo;
/// use reinhardt_nested_testkit::InMemoryStore;
/// use serde_json::json;
///
/// let store = InMemoryStore::new().with_model(ModelInfo::new("Item").with_field("sku"));
/// let item = store.insert("Item", json!({"sku": "A1"}));
///
/// assert_eq!(item.pk(), Some(&json!(1)));
/// assert_eq!(store.count("Item"), 1);
/// assert_eq!(store.counters().writes(), 0);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
	state: Mutex<State>,
}

impl InMemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a model
	pub fn register(&self, info: &ModelInfo) {
		self.state.lock().tables.insert(
			info.name().to_string(),
			Table {
				pk_name: info.pk_name().to_string(),
				rows: Vec::new(),
				next_id: 1,
			},
		);
	}

	pub fn with_model(self, info: ModelInfo) -> Self {
		self.register(&info);
		self
	}

	/// Seed a row without counting it as a write
	///
	/// # Panics
	///
	/// Panics when the model is not registered or `fields` is not an object.
	pub fn insert(&self, model: &str, fields: Value) -> Instance {
		let Value::Object(fields) = fields else {
			panic!("seed rows must be objects");
		};
		self.state
			.lock()
			.insert(model, fields)
			.unwrap_or_else(|e| panic!("failed to seed {}: {}", model, e))
	}

	/// Seed a to-many link without counting it as a write
	///
	/// # Panics
	///
	/// Panics when `owner` has no primary key.
	pub fn link(&self, owner: &Instance, attr: &str, related: &Instance) {
		let key = link_key(owner, attr).unwrap_or_else(|e| panic!("{}", e));
		let related_pk = related
			.pk()
			.cloned()
			.unwrap_or_else(|| panic!("related row has no primary key"));
		self.state.lock().links.entry(key).or_default().push(Link {
			model: related.model().to_string(),
			pk: related_pk,
		});
	}

	/// Current state of a row
	pub fn get(&self, model: &str, pk: &Value) -> Option<Instance> {
		self.state.lock().find(model, pk).ok().flatten()
	}

	/// Every row of a model in insertion order
	pub fn rows(&self, model: &str) -> Vec<Instance> {
		self.state
			.lock()
			.tables
			.get(model)
			.map(|t| t.rows.clone())
			.unwrap_or_default()
	}

	pub fn count(&self, model: &str) -> usize {
		self.state
			.lock()
			.tables
			.get(model)
			.map(|t| t.rows.len())
			.unwrap_or(0)
	}

	/// Primary keys linked to `owner` through `attr`, in link order
	pub fn linked_pks(&self, owner: &Instance, attr: &str) -> Vec<Value> {
		let Ok(key) = link_key(owner, attr) else {
			return Vec::new();
		};
		self.state
			.lock()
			.links
			.get(&key)
			.map(|links| links.iter().map(|l| l.pk.clone()).collect())
			.unwrap_or_default()
	}

	pub fn counters(&self) -> OpCounters {
		self.state.lock().counters
	}
}

#[async_trait]
impl ModelStore for InMemoryStore {
	async fn filter(
		&self,
		model: &str,
		field: &str,
		value: &Value,
	) -> Result<Vec<Instance>, StoreError> {
		let state = self.state.lock();
		Ok(state
			.table(model)?
			.rows
			.iter()
			.filter(|row| row.matches(field, value))
			.cloned()
			.collect())
	}

	async fn create(&self, model: &str, fields: Map<String, Value>) -> Result<Instance, StoreError> {
		let mut state = self.state.lock();
		let instance = state.insert(model, fields)?;
		state.counters.creates += 1;
		Ok(instance)
	}

	async fn save(&self, instance: &mut Instance) -> Result<(), StoreError> {
		let pk = instance.require_pk()?.clone();
		let mut state = self.state.lock();
		let table = state.table_mut(instance.model())?;
		let row = table
			.rows
			.iter_mut()
			.find(|row| row.pk() == Some(&pk))
			.ok_or_else(|| StoreError::NotFound {
				model: instance.model().to_string(),
				pk: pk.to_string(),
			})?;
		*row = instance.clone();
		state.counters.saves += 1;
		Ok(())
	}

	async fn delete(&self, instance: &Instance) -> Result<(), StoreError> {
		let pk = instance.require_pk()?.clone();
		let model = instance.model().to_string();
		let mut state = self.state.lock();
		let table = state.table_mut(&model)?;
		let before = table.rows.len();
		table.rows.retain(|row| row.pk() != Some(&pk));
		if table.rows.len() == before {
			return Err(StoreError::NotFound {
				model,
				pk: pk.to_string(),
			});
		}

		let pk_key = pk.to_string();
		state
			.links
			.retain(|key, _| !(key.model == model && key.pk == pk_key));
		for links in state.links.values_mut() {
			links.retain(|l| !(l.model == model && l.pk == pk));
		}
		state.counters.deletes += 1;
		Ok(())
	}

	async fn related(&self, instance: &Instance, attr: &str) -> Result<Vec<Instance>, StoreError> {
		let key = link_key(instance, attr)?;
		let state = self.state.lock();
		let Some(links) = state.links.get(&key) else {
			return Ok(Vec::new());
		};
		let mut rows = Vec::with_capacity(links.len());
		for link in links {
			if let Some(row) = state.find(&link.model, &link.pk)? {
				rows.push(row);
			}
		}
		Ok(rows)
	}

	async fn add(&self, instance: &Instance, attr: &str, related: &Instance) -> Result<(), StoreError> {
		let key = link_key(instance, attr)?;
		let related_pk = related.require_pk()?.clone();
		let mut state = self.state.lock();
		let links = state.links.entry(key).or_default();
		if !links
			.iter()
			.any(|l| l.model == related.model() && l.pk == related_pk)
		{
			links.push(Link {
				model: related.model().to_string(),
				pk: related_pk,
			});
		}
		state.counters.adds += 1;
		Ok(())
	}

	async fn remove(
		&self,
		instance: &Instance,
		attr: &str,
		related_pk: &Value,
	) -> Result<(), StoreError> {
		let key = link_key(instance, attr)?;
		let mut state = self.state.lock();
		if let Some(links) = state.links.get_mut(&key) {
			links.retain(|l| &l.pk != related_pk);
		}
		state.counters.removes += 1;
		Ok(())
	}
}
