//! Payload normalizer
//!
//! Runs before field validation and rewrites every related attribute so
//! that it holds only values the field layer can check: representations of
//! existing rows, validated patches, or validated new payloads. Failures
//! abort the whole payload.

use crate::context::SerializerContext;
use crate::fields::FieldKind;
use crate::serializer::NestedSerializer;
use crate::strategies::Resolver;
use reinhardt_nested_core::{RelationKind, SerializerError, SerializerResult, prune_nulls};
use serde_json::{Map, Value};
use tracing::debug;

/// Normalize a root payload for `serializer`
pub(crate) async fn normalize(
	serializer: &NestedSerializer,
	ctx: &SerializerContext,
	data: &Map<String, Value>,
) -> SerializerResult<Map<String, Value>> {
	let mut output = data.clone();
	let attrs: Vec<String> = data.keys().cloned().collect();

	for attr in attrs {
		if matches!(
			serializer.fields().get(&attr).map(|f| &f.kind),
			Some(FieldKind::Object)
		) {
			debug!(serializer = serializer.name(), attr = %attr, "dropping free-form object");
			output.remove(&attr);
			continue;
		}

		let resolved = serializer.policies().resolve(&attr);
		let kind = serializer.model().classify(&attr);
		let handler = match (kind, resolved.handler.as_ref()) {
			(RelationKind::ToOne | RelationKind::ToMany, Some(handler)) => handler,
			_ => continue,
		};

		let resolver = Resolver {
			serializer: serializer.name(),
			attr: &attr,
			policy: &resolved.policy,
			handler,
			ctx,
		};

		let Some(value) = output.remove(&attr) else {
			continue;
		};

		match kind {
			RelationKind::ToMany => {
				let items = match value {
					Value::Array(items) => items,
					Value::Null => {
						output.insert(attr.clone(), Value::Null);
						continue;
					}
					other => {
						return Err(SerializerError::invalid_shape(
							&attr,
							format!("expected a list of related values, got {}", other),
						));
					}
				};
				let mut resolved_items = Vec::with_capacity(items.len());
				for item in items {
					if let Some(resolved) = resolver.resolve(item).await? {
						resolved_items.push(resolved);
					}
				}
				output.insert(attr.clone(), Value::Array(resolved_items));
			}
			_ => {
				if let Some(resolved) = resolver.resolve(value).await? {
					output.insert(attr.clone(), resolved);
				}
			}
		}
	}

	if serializer.settings().prune_nulls {
		let mut payload = Value::Object(output);
		prune_nulls(&mut payload);
		output = match payload {
			Value::Object(map) => map,
			_ => Map::new(),
		};
	}

	Ok(output)
}
