//! # Reinhardt Nested
//!
//! Writable nested serializers for Reinhardt.
//!
//! A single serializer definition accepts, for every related attribute,
//! any of these input shapes:
//!
//! - a **bare key** naming an existing row (`"customer": 5`)
//! - an **identity object**, optionally carrying a patch
//!   (`{"sku": "A1", "qty": 2}`)
//! - a **plain object** describing a new row (`{"name": "gadget"}`)
//!
//! Each value is resolved into a lookup (optionally followed by an update)
//! of an existing row or the creation of a new one, governed by a
//! per-attribute policy (`may_create`, `may_edit`, `clear_before_set`,
//! `identity_fields`), a per-method permission list and an instance
//! validator chain.
//!
//! ## Crates
//!
//! - `reinhardt-nested-core`: errors, relation metadata, policies, value
//!   shapes, the persistence collaborator trait, request and settings
//! - `reinhardt-nested-serializers`: the engine and [`NestedSerializer`]
//! - `reinhardt-nested-testkit` (feature `testkit`): in-memory store and
//!   request fixtures
//!
//! ## Quick Example
//!
//! ```ignore
//! use reinhardt_nested::prelude::*;
//!
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
//! let ctx = orders
//!     .context(store)
//!     .with_request(Request::new(Method::POST).with_user("alice"));
//! let order = orders
//!     .write(&ctx, None, &json!({"items": [{"sku": "A1", "qty": 2}, {"sku": "B7"}]}))
//!     .await?;
//! ```

#[cfg(feature = "testkit")]
pub use reinhardt_nested_testkit as testkit;

pub use reinhardt_nested_core::{
	AttributePolicy, FieldErrors, Instance, ModelInfo, ModelStore, NestedSettings,
	PolicyAction, PolicyDeclaration, PolicyDeclarations, PolicyDefaults, RelationInfo,
	RelationKind, Request, SerializerError, SerializerResult, SettingsError, StoreError,
};
pub use reinhardt_nested_serializers::{
	AllowAny, CustomFields, DenyAll, Field, FieldKind, FieldValidator, Gatekeeper,
	InstanceValidator, IsAdminUser, IsAuthenticated, IsAuthenticatedOrReadOnly, MaxLengthValidator,
	MinValueValidator, ModelSerializer, NestedField, NestedSerializer, NestedSerializerBuilder,
	NoCustomFields, Permission, PermissionContext, PermissionPolicy, PlainSerializer, Rejection,
	RelatedHandler, SerializerContext, UniqueValidator, ValidatedData, WriteMode,
};

/// Prelude module for convenient imports
pub mod prelude {
	pub use crate::{
		AllowAny, AttributePolicy, CustomFields, DenyAll, Field, FieldErrors, FieldKind,
		FieldValidator, Gatekeeper, Instance, InstanceValidator, IsAdminUser, IsAuthenticated,
		IsAuthenticatedOrReadOnly, ModelInfo, ModelSerializer, ModelStore, NestedField,
		NestedSerializer, NestedSerializerBuilder, NestedSettings, Permission, PermissionContext,
		PermissionPolicy, PlainSerializer, PolicyAction, PolicyDeclaration, PolicyDeclarations,
		Rejection, RelatedHandler, RelationInfo, Request, SerializerContext, SerializerError,
		SerializerResult, ValidatedData, WriteMode,
	};

	// External
	pub use async_trait::async_trait;
	pub use http::Method;
	pub use serde_json::json;
	pub use std::sync::Arc;
}
