//! Nested writable serializers
//!
//! This crate provides the resolution engine behind [`NestedSerializer`]:
//!
//! - **Payload normalizer**: rewrites related attributes before validation
//! - **Resolution strategies**: key lookup, lookup with patch, id lookup
//!   with patch and create-or-match
//! - **Persistence orchestrator**: partitions validated data and writes
//!   the root row and its relations under per-attribute policies
//! - **Gatekeeper**: instance validator chain around every read and write
//! - **Permission bridge**: per-method permission lists checked before writes
//!
//! ## Policies
//!
//! Each related attribute is governed by a policy:
//!
//! | Flag | Default | Meaning |
//! |------|---------|---------|
//! | `may_create` | `true` | new related rows may be created |
//! | `may_edit` | `true` | existing related rows may be patched |
//! | `clear_before_set` | `false` | a to-many relation is emptied before it is set |
//! | `identity_fields` | `[]` | fields that find existing rows, primary first |

pub mod context;
pub mod fields;
pub mod gatekeeper;
pub mod handler;
mod normalizer;
pub mod permissions;
pub mod persistence;
pub mod plain;
pub mod policy_store;
pub mod serializer;
mod strategies;

pub use context::SerializerContext;
pub use fields::{
	Field, FieldKind, FieldSet, FieldValidator, MaxLengthValidator, MinValueValidator,
	UniqueValidator,
};
pub use gatekeeper::{Gatekeeper, InstanceValidator, Rejection};
pub use handler::{ModelSerializer, RelatedHandler, ValidatedData};
pub use permissions::{
	AllowAny, DenyAll, IsAdminUser, IsAuthenticated, IsAuthenticatedOrReadOnly, Permission,
	PermissionContext, PermissionPolicy,
};
pub use persistence::{CustomFields, NoCustomFields, WriteMode};
pub use plain::PlainSerializer;
pub use policy_store::{NestedField, PolicyStore, ResolvedPolicy};
pub use serializer::{NestedSerializer, NestedSerializerBuilder};
