//! Core types for nested writable serializers
//!
//! This crate holds everything the resolution engine needs that does not
//! depend on a serializer implementation:
//!
//! - [`error`]: the fatal error taxonomy and aggregated field errors
//! - [`metadata`]: relation metadata and the relation classifier
//! - [`policy`]: per-attribute write policies and their completion
//! - [`shape`]: shape tagging of nested values
//! - [`value`]: payload helpers such as null pruning
//! - [`store`]: the persistence collaborator trait
//! - [`request`]: the explicit request context
//! - [`settings`]: engine settings loaded from TOML

pub mod error;
pub mod metadata;
pub mod policy;
pub mod request;
pub mod settings;
pub mod shape;
pub mod store;
pub mod value;

pub use error::{
	FieldErrors, NON_FIELD_ERRORS, PolicyAction, SerializerError, SerializerResult, StoreError,
};
pub use metadata::{ModelInfo, RelationInfo, RelationKind};
pub use policy::{AttributePolicy, PolicyDeclaration, PolicyDeclarations, PolicyDefaults};
pub use request::Request;
pub use settings::{NestedSettings, SettingsError};
pub use shape::{ShapeRule, ValueShape};
pub use store::{Instance, ModelStore};
pub use value::prune_nulls;
