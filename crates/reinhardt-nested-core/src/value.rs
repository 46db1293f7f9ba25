//! Payload value helpers

use serde_json::{Map, Value};

/// Remove every `null` leaf from a payload, depth first
///
/// Nulls are removed from the object or sequence that contains them.
/// Objects that were already empty are removed from any sequence containing
/// them; objects that only become empty through pruning are kept.
///
/// # Examples
///
/// ```
/// use reinhardt_nested_core::value::prune_nulls;
/// use serde_json::json;
///
/// let mut payload = json!({
///     "note": null,
///     "items": [{"sku": "A1", "qty": null}, null, {}],
/// });
/// prune_nulls(&mut payload);
///
/// assert_eq!(payload, json!({"items": [{"sku": "A1"}]}));
/// ```
pub fn prune_nulls(value: &mut Value) {
	match value {
		Value::Object(map) => prune_object(map),
		Value::Array(items) => prune_array(items),
		_ => {}
	}
}

fn prune_object(map: &mut Map<String, Value>) {
	map.retain(|_, v| !v.is_null());
	for v in map.values_mut() {
		prune_nulls(v);
	}
}

fn prune_array(items: &mut Vec<Value>) {
	items.retain(|v| match v {
		Value::Null => false,
		Value::Object(map) => !map.is_empty(),
		_ => true,
	});
	for v in items.iter_mut() {
		prune_nulls(v);
	}
}

/// Whether a payload holds a `null` anywhere
pub fn contains_null(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::Object(map) => map.values().any(contains_null),
		Value::Array(items) => items.iter().any(contains_null),
		_ => false,
	}
}

/// Render a value for log and error messages without quoting strings
pub fn display_value(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}
