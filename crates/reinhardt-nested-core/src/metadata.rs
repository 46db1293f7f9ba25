//! Relation metadata and the relation classifier
//!
//! `ModelInfo` is the read-only description of a model the ORM layer hands
//! to the engine: its scalar fields, its primary key and its relations.
//! It is declared once with the serializer definition and queried by the
//! normalizer and the persistence orchestrator.

use indexmap::IndexMap;

/// Metadata for one relation of a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationInfo {
	/// Whether the relation holds many related rows
	pub to_many: bool,
	/// Field on the related model the relation points at (to-one only)
	pub to_field: Option<String>,
	/// Name of the related model
	pub related_model: String,
}

impl RelationInfo {
	/// Create a to-one relation (foreign key / one-to-one)
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_nested_core::metadata::RelationInfo;
	///
	/// let relation = RelationInfo::to_one("Customer", "id");
	/// assert!(!relation.to_many);
	/// assert_eq!(relation.to_field.as_deref(), Some("id"));
	/// ```
	pub fn to_one(related_model: impl Into<String>, to_field: impl Into<String>) -> Self {
		Self {
			to_many: false,
			to_field: Some(to_field.into()),
			related_model: related_model.into(),
		}
	}

	/// Create a to-many relation (many-to-many)
	pub fn to_many(related_model: impl Into<String>) -> Self {
		Self {
			to_many: true,
			to_field: None,
			related_model: related_model.into(),
		}
	}
}

/// How an attribute relates to a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
	/// A column of the model itself (primary key included)
	Scalar,
	/// A foreign key or one-to-one relation
	ToOne,
	/// A many-to-many relation
	ToMany,
	/// Anything the model does not describe
	Custom,
}

/// Field information for a model
///
/// # Examples
///
/// ```
/// use reinhardt_nested_core::metadata::{ModelInfo, RelationInfo, RelationKind};
///
/// let info = ModelInfo::new("Order")
///     .with_field("note")
///     .with_relation("customer", RelationInfo::to_one("Customer", "id"))
///     .with_relation("items", RelationInfo::to_many("Item"));
///
/// assert_eq!(info.classify("note"), RelationKind::Scalar);
/// assert_eq!(info.classify("id"), RelationKind::Scalar);
/// assert_eq!(info.classify("customer"), RelationKind::ToOne);
/// assert_eq!(info.classify("items"), RelationKind::ToMany);
/// assert_eq!(info.classify("coupon"), RelationKind::Custom);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
	name: String,
	pk_name: String,
	fields: Vec<String>,
	relations: IndexMap<String, RelationInfo>,
}

impl ModelInfo {
	/// Create metadata for a model whose primary key is `id`
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			pk_name: "id".to_string(),
			fields: Vec::new(),
			relations: IndexMap::new(),
		}
	}

	/// Override the primary key name
	pub fn with_pk(mut self, pk_name: impl Into<String>) -> Self {
		self.pk_name = pk_name.into();
		self
	}

	/// Add a scalar field
	pub fn with_field(mut self, name: impl Into<String>) -> Self {
		self.fields.push(name.into());
		self
	}

	/// Add several scalar fields
	pub fn with_fields<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.fields.extend(names.into_iter().map(Into::into));
		self
	}

	/// Add a relation
	pub fn with_relation(mut self, name: impl Into<String>, relation: RelationInfo) -> Self {
		self.relations.insert(name.into(), relation);
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn pk_name(&self) -> &str {
		&self.pk_name
	}

	/// Scalar fields, primary key excluded
	pub fn fields(&self) -> &[String] {
		&self.fields
	}

	/// Scalar fields with the primary key first
	pub fn fields_and_pk(&self) -> Vec<&str> {
		std::iter::once(self.pk_name.as_str())
			.chain(
				self.fields
					.iter()
					.map(|f| f.as_str())
					.filter(|f| *f != self.pk_name),
			)
			.collect()
	}

	pub fn relations(&self) -> &IndexMap<String, RelationInfo> {
		&self.relations
	}

	pub fn relation(&self, attr: &str) -> Option<&RelationInfo> {
		self.relations.get(attr)
	}

	pub fn is_pk(&self, attr: &str) -> bool {
		self.pk_name == attr
	}

	/// Classify an attribute against this model
	///
	/// A relation is to-many when its metadata reports multiplicity and
	/// to-one when it names a target field. Anything else the model owns is
	/// scalar; anything the model does not know is custom.
	pub fn classify(&self, attr: &str) -> RelationKind {
		if let Some(relation) = self.relations.get(attr) {
			if relation.to_many {
				return RelationKind::ToMany;
			}
			if relation.to_field.is_some() {
				return RelationKind::ToOne;
			}
		}
		if self.is_pk(attr) || self.fields.iter().any(|f| f == attr) {
			RelationKind::Scalar
		} else {
			RelationKind::Custom
		}
	}
}
