//! Per-serializer policy store
//!
//! Built once when a serializer is defined and read-only afterwards.
//! Attributes that were never declared get a default policy computed on
//! each lookup; nothing is written back.

use crate::fields::FieldSet;
use crate::handler::RelatedHandler;
use indexmap::IndexMap;
use reinhardt_nested_core::{AttributePolicy, PolicyDeclaration, PolicyDefaults};
use std::borrow::Cow;

/// A policy declaration with an optional explicit related handler
#[derive(Debug, Clone, Default)]
pub struct NestedField {
	pub declaration: PolicyDeclaration,
	pub handler: Option<RelatedHandler>,
}

impl NestedField {
	pub fn new(declaration: PolicyDeclaration) -> Self {
		Self {
			declaration,
			handler: None,
		}
	}

	/// Use `handler` instead of the one inferred from the declared field
	pub fn with_handler(mut self, handler: RelatedHandler) -> Self {
		self.handler = Some(handler);
		self
	}
}

impl From<PolicyDeclaration> for NestedField {
	fn from(declaration: PolicyDeclaration) -> Self {
		Self::new(declaration)
	}
}

/// A completed policy together with the handler it resolves through
#[derive(Debug, Clone)]
pub struct ResolvedPolicy {
	pub policy: AttributePolicy,
	pub handler: Option<RelatedHandler>,
}

/// Completed policies keyed by attribute
#[derive(Debug, Clone, Default)]
pub struct PolicyStore {
	entries: IndexMap<String, ResolvedPolicy>,
	defaults: PolicyDefaults,
}

impl PolicyStore {
	/// Complete every declaration and every nested field of `fields`
	pub fn build(
		declared: &IndexMap<String, NestedField>,
		fields: &FieldSet,
		defaults: PolicyDefaults,
	) -> Self {
		let mut entries = IndexMap::new();

		for (attr, nested) in declared {
			let handler = nested.handler.clone().or_else(|| {
				fields
					.get(attr)
					.and_then(|f| f.kind.handler())
					.cloned()
			});
			entries.insert(
				attr.clone(),
				ResolvedPolicy {
					policy: nested.declaration.complete(&defaults),
					handler,
				},
			);
		}

		for field in fields.iter() {
			if entries.contains_key(&field.name) {
				continue;
			}
			if let Some(handler) = field.kind.handler() {
				entries.insert(
					field.name.clone(),
					ResolvedPolicy {
						policy: PolicyDeclaration::new().complete(&defaults),
						handler: Some(handler.clone()),
					},
				);
			}
		}

		Self { entries, defaults }
	}

	/// The policy governing `attr`
	pub fn resolve(&self, attr: &str) -> Cow<'_, ResolvedPolicy> {
		match self.entries.get(attr) {
			Some(entry) => Cow::Borrowed(entry),
			None => Cow::Owned(ResolvedPolicy {
				policy: PolicyDeclaration::new().complete(&self.defaults),
				handler: None,
			}),
		}
	}

	pub fn is_declared(&self, attr: &str) -> bool {
		self.entries.contains_key(attr)
	}
}
