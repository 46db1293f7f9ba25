//! Payload resolution tests
//!
//! Validation resolves every related value against the store but never
//! writes; these tests inspect the validated data it produces.

use reinhardt_nested::prelude::*;
use reinhardt_nested::testkit::fixtures::create_request;
use reinhardt_nested::testkit::init_test_logging;
use reinhardt_nested_integration_tests::*;
use rstest::*;

// ============================================================================
// Shape dispatch (to-one, identity field "code")
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_bare_key_becomes_representation(create_request: Request) {
	init_test_logging();
	let store = shop_store();
	seed_customer(&store, json!(5), "Five");
	let orders = default_order_serializer();
	let ctx = context(&orders, &store, create_request);

	let validated = orders
		.validate(&ctx, None, &json!({"customer": 5}))
		.await
		.unwrap();

	assert_eq!(
		validated["customer"],
		json!({"id": 1, "code": 5, "name": "Five"})
	);
}

#[rstest]
#[tokio::test]
async fn test_identity_object_is_validated_against_row(create_request: Request) {
	let store = shop_store();
	seed_customer(&store, json!("X"), "Ann");
	let orders = default_order_serializer();
	let ctx = context(&orders, &store, create_request);

	let validated = orders
		.validate(&ctx, None, &json!({"customer": {"code": "X", "name": "Bob"}}))
		.await
		.unwrap();

	assert_eq!(validated["customer"], json!({"code": "X", "name": "Bob"}));
	// Nothing is written before persistence
	assert_eq!(store.get("Customer", &json!(1)).unwrap().get("name"), Some(&json!("Ann")));
}

#[rstest]
#[tokio::test]
async fn test_identity_object_inherits_required_fields_from_row(create_request: Request) {
	let store = shop_store();
	seed_customer(&store, json!("X"), "Ann");
	let orders = default_order_serializer();
	let ctx = context(&orders, &store, create_request);

	// `name` is required, but the bound row already holds one
	let validated = orders
		.validate(&ctx, None, &json!({"customer": {"code": "X"}}))
		.await
		.unwrap();

	assert_eq!(validated["customer"], json!({"code": "X"}));
}

#[rstest]
#[tokio::test]
async fn test_plain_object_is_validated_as_new_row(create_request: Request) {
	let store = shop_store();
	let orders = default_order_serializer();
	let ctx = context(&orders, &store, create_request);

	let validated = orders
		.validate(&ctx, None, &json!({"customer": {"name": "new"}}))
		.await
		.unwrap();

	assert_eq!(validated["customer"], json!({"name": "new"}));
	assert_eq!(store.count("Customer"), 0);
}

#[rstest]
#[tokio::test]
async fn test_null_to_one_is_dropped(create_request: Request) {
	let store = shop_store();
	let orders = default_order_serializer();
	let ctx = context(&orders, &store, create_request);

	let validated = orders
		.validate(&ctx, None, &json!({"note": "n", "customer": null}))
		.await
		.unwrap();

	assert!(!validated.contains_key("customer"));
	assert_eq!(validated["note"], json!("n"));
}

#[rstest]
#[case::list_for_to_one(json!({"customer": [1, 2]}), "customer")]
#[case::list_inside_to_many(json!({"items": [["A1"]]}), "items")]
#[case::scalar_for_to_many(json!({"items": "A1"}), "items")]
#[tokio::test]
async fn test_invalid_shapes(
	create_request: Request,
	#[case] payload: serde_json::Value,
	#[case] attr: &str,
) {
	let store = shop_store();
	let orders = default_order_serializer();
	let ctx = context(&orders, &store, create_request);

	let err = orders.validate(&ctx, None, &payload).await.unwrap_err();

	assert!(
		matches!(&err, SerializerError::InvalidShape { attr: a, .. } if a == attr),
		"unexpected error: {:?}",
		err
	);
}

// ============================================================================
// Lookups
// ============================================================================

#[rstest]
#[case::bare_key(json!({"customer": "C9"}))]
#[case::identity_object(json!({"customer": {"code": "C9", "name": "x"}}))]
#[tokio::test]
async fn test_unknown_identity_is_lookup_miss(
	create_request: Request,
	#[case] payload: serde_json::Value,
) {
	let store = shop_store();
	seed_customer(&store, json!("C1"), "Ann");
	let orders = default_order_serializer();
	let ctx = context(&orders, &store, create_request);

	let err = orders.validate(&ctx, None, &payload).await.unwrap_err();

	match err {
		SerializerError::LookupMiss { attr, field, .. } => {
			assert_eq!(attr, "customer");
			assert_eq!(field, "code");
		}
		other => panic!("expected LookupMiss, got {:?}", other),
	}
}

#[rstest]
#[tokio::test]
async fn test_first_match_wins(create_request: Request) {
	let store = shop_store();
	seed_item(&store, "DUP", "first", 1);
	seed_item(&store, "DUP", "second", 2);
	let orders = default_order_serializer();
	let ctx = context(&orders, &store, create_request);

	for _ in 0..3 {
		let validated = orders
			.validate(&ctx, None, &json!({"items": ["DUP", "DUP"]}))
			.await
			.unwrap();
		let items = validated["items"].as_array().unwrap();
		assert_eq!(items.len(), 2);
		assert!(items.iter().all(|item| item["id"] == json!(1)));
		assert!(items.iter().all(|item| item["name"] == json!("first")));
	}
}

#[rstest]
#[tokio::test]
async fn test_secondary_identity_matches_plain_object(create_request: Request) {
	let store = shop_store();
	seed_item(&store, "A1", "bolt", 5);
	let orders = order_serializer(
		PolicyDeclaration::new().identity_fields(["sku", "name"]),
		PolicyDeclaration::new().identity("code"),
	);
	let ctx = context(&orders, &store, create_request);

	let validated = orders
		.validate(&ctx, None, &json!({"items": [{"name": "bolt", "qty": 9}]}))
		.await
		.unwrap();

	assert_eq!(validated["items"], json!([{"name": "bolt", "qty": 9}]));
}

#[rstest]
#[tokio::test]
async fn test_missing_identity_field_is_configuration_error(create_request: Request) {
	let store = shop_store();
	seed_item(&store, "A1", "bolt", 5);
	let orders = order_serializer(
		PolicyDeclaration::new(),
		PolicyDeclaration::new().identity("code"),
	);
	let ctx = context(&orders, &store, create_request);

	let err = orders
		.validate(&ctx, None, &json!({"items": ["A1"]}))
		.await
		.unwrap_err();

	assert!(matches!(err, SerializerError::Configuration { ref attr, .. } if attr == "items"));
}

#[rstest]
#[tokio::test]
async fn test_plain_handler_resolves_by_primary_key(create_request: Request) {
	let store = shop_store();
	store.insert("Tag", json!({"label": "sale"}));
	store.insert("Tag", json!({"label": "clearance"}));
	let items = item_serializer();
	let ctx = context(&items, &store, create_request);

	let validated = items
		.validate(
			&ctx,
			None,
			&json!({"sku": "N1", "tags": [1, {"id": 2, "label": "renamed"}, {"label": "fresh"}]}),
		)
		.await
		.unwrap();

	assert_eq!(
		validated["tags"],
		json!([
			{"id": 1, "label": "sale"},
			{"id": 2, "label": "renamed"},
			{"label": "fresh"}
		])
	);
}

#[rstest]
#[tokio::test]
async fn test_plain_handler_unknown_primary_key(create_request: Request) {
	let store = shop_store();
	let items = item_serializer();
	let ctx = context(&items, &store, create_request);

	let err = items
		.validate(&ctx, None, &json!({"tags": [{"id": 7, "label": "x"}]}))
		.await
		.unwrap_err();

	assert!(matches!(
		err,
		SerializerError::LookupMiss { ref attr, ref field, .. } if attr == "tags" && field == "id"
	));
}

// ============================================================================
// Output hygiene
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_nulls_are_pruned(create_request: Request) {
	let store = shop_store();
	let orders = default_order_serializer();
	let ctx = context(&orders, &store, create_request);

	let validated = orders
		.validate(
			&ctx,
			None,
			&json!({"note": null, "items": [{"name": "n", "qty": null}, null, {}]}),
		)
		.await
		.unwrap();

	let validated = serde_json::Value::Object(validated);
	assert!(!has_null(&validated));
	assert_eq!(validated, json!({"items": [{"name": "n"}]}));
}

fn has_null(value: &serde_json::Value) -> bool {
	match value {
		serde_json::Value::Null => true,
		serde_json::Value::Array(items) => items.iter().any(has_null),
		serde_json::Value::Object(map) => map.values().any(has_null),
		_ => false,
	}
}

#[rstest]
#[tokio::test]
async fn test_free_form_object_is_dropped(create_request: Request) {
	let store = shop_store();
	let orders = default_order_serializer();
	let ctx = context(&orders, &store, create_request);

	let validated = orders
		.validate(&ctx, None, &json!({"note": "n", "meta": {"source": "web"}}))
		.await
		.unwrap();

	assert!(!validated.contains_key("meta"));
}

#[rstest]
#[case::list(json!([1, 2]), "list")]
#[case::string(json!("order"), "str")]
#[tokio::test]
async fn test_non_object_payload(
	create_request: Request,
	#[case] payload: serde_json::Value,
	#[case] type_name: &str,
) {
	let store = shop_store();
	let orders = default_order_serializer();
	let ctx = context(&orders, &store, create_request);

	let err = orders.validate(&ctx, None, &payload).await.unwrap_err();

	let errors = err.field_errors().expect("field errors");
	let messages = errors.get("non_field_errors").expect("non-field errors");
	assert_eq!(
		messages[0],
		format!("Invalid data. Expected a dictionary, but got {}.", type_name)
	);
}

#[rstest]
#[tokio::test]
async fn test_nested_errors_keep_their_structure(create_request: Request) {
	let store = shop_store();
	let orders = default_order_serializer();
	let ctx = context(&orders, &store, create_request);

	let err = orders
		.validate(&ctx, None, &json!({"items": [{"name": "x", "qty": -1}]}))
		.await
		.unwrap_err();

	match err {
		SerializerError::NestedValidation { attr, errors } => {
			assert_eq!(attr, "items");
			assert!(errors.contains("qty"));
		}
		other => panic!("expected NestedValidation, got {:?}", other),
	}
}

#[rstest]
#[tokio::test]
async fn test_validation_never_writes(create_request: Request) {
	let store = shop_store();
	seed_item(&store, "A1", "bolt", 5);
	seed_customer(&store, json!("C1"), "Ann");
	let orders = default_order_serializer();
	let ctx = context(&orders, &store, create_request);

	orders
		.validate(
			&ctx,
			None,
			&json!({
				"customer": {"code": "C1", "name": "Bob"},
				"items": ["A1", {"sku": "A1", "qty": 3}, {"name": "gadget"}]
			}),
		)
		.await
		.unwrap();

	assert_eq!(store.counters().writes(), 0);
	assert_eq!(store.count("Item"), 1);
}
