//! Permission checks, request requirements and the instance gatekeeper

use reinhardt_nested::prelude::*;
use reinhardt_nested::testkit::fixtures::{
	admin, anonymous, authenticated, create_request, read_request, update_request,
};
use reinhardt_nested_integration_tests::*;
use rstest::*;

/// Records the reviewing user on every approved order
struct StampReviewer;

#[async_trait]
impl InstanceValidator for StampReviewer {
	async fn validate(&self, mut instance: Instance, request: &Request) -> Result<Instance, Rejection> {
		let user = request.user.clone().unwrap_or_default();
		instance.set("reviewed_by", json!(user));
		Ok(instance)
	}
}

struct RejectAll;

#[async_trait]
impl InstanceValidator for RejectAll {
	async fn validate(&self, _instance: Instance, _request: &Request) -> Result<Instance, Rejection> {
		Err(Rejection::new("orders are closed"))
	}
}

/// Hides rows whose `note` (orders) or `name` (items) is "locked"
struct HideLocked;

#[async_trait]
impl InstanceValidator for HideLocked {
	async fn validate(&self, instance: Instance, _request: &Request) -> Result<Instance, Rejection> {
		let locked = json!("locked");
		if instance.get("note") == Some(&locked) || instance.get("name") == Some(&locked) {
			return Err(Rejection::new("row is locked"));
		}
		Ok(instance)
	}
}

fn default_policies() -> (PolicyDeclaration, PolicyDeclaration) {
	(
		PolicyDeclaration::new().identity("sku"),
		PolicyDeclaration::new().identity("code"),
	)
}

// ============================================================================
// Permissions
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_anonymous_create_is_denied() {
	let store = shop_store();
	let orders = default_order_serializer();
	let ctx = context(&orders, &store, anonymous(Method::POST));

	let err = orders
		.write(&ctx, None, &json!({"note": "x", "items": [{"name": "gadget"}]}))
		.await
		.unwrap_err();

	assert_eq!(
		err,
		SerializerError::PermissionDenied {
			permission: "IsAuthenticated".to_string(),
			method: "POST".to_string(),
			target: "OrderSerializer".to_string(),
		}
	);
	assert_eq!(store.counters().writes(), 0);
}

#[rstest]
#[case::user_put(authenticated(Method::PUT, "alice"), false)]
#[case::admin_put(admin(Method::PUT), true)]
#[tokio::test]
async fn test_method_specific_permissions(#[case] request: Request, #[case] allowed: bool) {
	let store = shop_store();
	let order = store.insert("Order", json!({"note": "open"}));
	let (items, customer) = default_policies();
	let orders = order_builder(items, customer)
		.permission_classes_for(Method::PUT, vec![Arc::new(IsAdminUser)])
		.build()
		.unwrap();
	let ctx = context(&orders, &store, request);

	let result = orders
		.write(&ctx, Some(order), &json!({"note": "closed"}))
		.await;

	assert_eq!(result.is_ok(), allowed, "result: {:?}", result);
	let expected_note = if allowed { "closed" } else { "open" };
	assert_eq!(
		store.get("Order", &json!(1)).unwrap().get("note"),
		Some(&json!(expected_note))
	);
}

#[rstest]
#[tokio::test]
async fn test_nested_serializer_checks_its_own_permissions(create_request: Request) {
	let store = shop_store();
	let locked_items = item_builder()
		.permission_classes(vec![Arc::new(DenyAll)])
		.build()
		.unwrap();
	let (items, customer) = default_policies();
	let orders = order_builder(items, customer)
		.field(Field::nested_many(
			"items",
			RelatedHandler::nested(locked_items),
		))
		.build()
		.unwrap();
	let ctx = context(&orders, &store, create_request);

	let err = orders
		.write(&ctx, None, &json!({"items": [{"name": "gadget"}]}))
		.await
		.unwrap_err();

	assert!(matches!(
		err,
		SerializerError::PermissionDenied { ref target, .. } if target == "ItemSerializer"
	));
	assert_eq!(store.count("Item"), 0);
	assert_eq!(store.count("Order"), 0);
}

#[rstest]
#[tokio::test]
async fn test_rejected_nested_create_deletes_root(create_request: Request) {
	let store = shop_store();
	let guarded_items = item_builder().validator(RejectAll).build().unwrap();
	let (items, customer) = default_policies();
	let orders = order_builder(items, customer)
		.field(Field::nested_many(
			"items",
			RelatedHandler::nested(guarded_items),
		))
		.build()
		.unwrap();
	let ctx = context(&orders, &store, create_request);

	let err = orders
		.write(&ctx, None, &json!({"note": "x", "items": [{"name": "gadget"}]}))
		.await
		.unwrap_err();

	assert!(matches!(
		err,
		SerializerError::Rejected { ref validator, .. } if validator == "RejectAll"
	));
	assert_eq!(store.count("Order"), 0);
	assert_eq!(store.count("Item"), 0);
}

#[rstest]
fn test_missing_default_permissions_fails_definition() {
	let err = NestedSerializer::builder("OrderSerializer", order_info())
		.field(Field::string("note"))
		.build()
		.unwrap_err();

	assert!(matches!(
		err,
		SerializerError::Configuration { ref attr, .. } if attr == "permission_classes"
	));
}

// ============================================================================
// Request context
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_write_without_request() {
	let store = shop_store();
	let orders = default_order_serializer();
	let ctx = orders.context(store.clone());

	let err = orders
		.write(&ctx, None, &json!({"note": "x"}))
		.await
		.unwrap_err();

	assert_eq!(
		err,
		SerializerError::MissingRequest {
			serializer: "OrderSerializer".to_string(),
		}
	);
	assert_eq!(store.counters().writes(), 0);
}

#[rstest]
#[tokio::test]
async fn test_read_without_request() {
	let store = shop_store();
	let order = store.insert("Order", json!({"note": "x"}));
	let orders = default_order_serializer();
	let ctx = orders.context(store.clone());

	let err = orders.to_representation(&ctx, &order).await.unwrap_err();

	assert!(matches!(err, SerializerError::MissingRequest { .. }));
}

// ============================================================================
// Gatekeeper
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_validators_thread_instance(create_request: Request) {
	let store = shop_store();
	let (items, customer) = default_policies();
	let orders = order_builder(items, customer)
		.validator(StampReviewer)
		.build()
		.unwrap();
	let ctx = context(&orders, &store, create_request);

	let order = orders
		.write(&ctx, None, &json!({"note": "x"}))
		.await
		.unwrap();

	assert_eq!(order.get("reviewed_by"), Some(&json!("alice")));
}

#[rstest]
#[tokio::test]
async fn test_rejected_create_deletes_root(create_request: Request) {
	let store = shop_store();
	let (items, customer) = default_policies();
	let orders = order_builder(items, customer)
		.validator(StampReviewer)
		.validator(RejectAll)
		.build()
		.unwrap();
	let ctx = context(&orders, &store, create_request);

	let err = orders
		.write(&ctx, None, &json!({"note": "x"}))
		.await
		.unwrap_err();

	assert_eq!(
		err,
		SerializerError::Rejected {
			validator: "RejectAll".to_string(),
			reason: "orders are closed".to_string(),
		}
	);
	assert_eq!(store.count("Order"), 0);
	assert_eq!(store.counters().deletes, 1);
}

#[rstest]
#[tokio::test]
async fn test_rejected_update_changes_nothing(update_request: Request) {
	let store = shop_store();
	let order = store.insert("Order", json!({"note": "locked"}));
	seed_item(&store, "A1", "bolt", 1);
	let (items, customer) = default_policies();
	let orders = order_builder(items, customer)
		.validator(HideLocked)
		.build()
		.unwrap();
	let ctx = context(&orders, &store, update_request);

	let err = orders
		.write(
			&ctx,
			Some(order.clone()),
			&json!({"note": "open", "items": [{"sku": "A1", "qty": 7}]}),
		)
		.await
		.unwrap_err();

	assert!(matches!(err, SerializerError::Rejected { .. }));
	assert_eq!(store.counters().writes(), 0);
	assert_eq!(store.get("Order", &json!(1)).unwrap().get("note"), Some(&json!("locked")));
	assert_eq!(store.get("Item", &json!(1)).unwrap().get("qty"), Some(&json!(1)));
	assert!(store.linked_pks(&order, "items").is_empty());
}

#[rstest]
#[tokio::test]
async fn test_rejected_row_reads_as_empty(read_request: Request) {
	let store = shop_store();
	let order = store.insert("Order", json!({"note": "locked"}));
	let (items, customer) = default_policies();
	let orders = order_builder(items, customer)
		.validator(HideLocked)
		.build()
		.unwrap();
	let ctx = context(&orders, &store, read_request);

	let rendered = orders.to_representation(&ctx, &order).await.unwrap();

	assert!(rendered.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_rejected_related_rows_are_hidden(create_request: Request) {
	let store = shop_store();
	let order = store.insert("Order", json!({"note": "open"}));
	let visible = seed_item(&store, "A1", "bolt", 1);
	let hidden = seed_item(&store, "B2", "locked", 1);
	store.link(&order, "items", &visible);
	store.link(&order, "items", &hidden);

	let guarded_items = item_builder().validator(HideLocked).build().unwrap();
	let (items, customer) = default_policies();
	let orders = order_builder(items, customer)
		.field(Field::nested_many(
			"items",
			RelatedHandler::nested(guarded_items),
		))
		.build()
		.unwrap();
	let ctx = context(&orders, &store, create_request);

	let rendered = orders.to_representation(&ctx, &order).await.unwrap();
	assert_eq!(
		rendered["items"],
		json!([{"id": 1, "sku": "A1", "name": "bolt", "qty": 1, "tags": []}])
	);

	// A bare key naming a hidden row cannot be resolved
	let err = orders
		.validate(&ctx, None, &json!({"items": ["B2"]}))
		.await
		.unwrap_err();
	assert!(matches!(err, SerializerError::LookupMiss { .. }));
}
