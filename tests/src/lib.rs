//! Shared fixtures for the nested serializer integration tests
//!
//! A small shop: an order has one customer and many items, and every item
//! carries plain tags.
//!
//! | Serializer           | Model    | Related attributes              |
//! |----------------------|----------|---------------------------------|
//! | `TagSerializer`      | Tag      |                                 |
//! | `ItemSerializer`     | Item     | `tags` (plain, by primary key)  |
//! | `CustomerSerializer` | Customer |                                 |
//! | `OrderSerializer`    | Order    | `customer` (to-one), `items`    |

use reinhardt_nested::MinValueValidator;
use reinhardt_nested::prelude::*;
use reinhardt_nested::testkit::InMemoryStore;
use serde_json::Value;

pub fn tag_info() -> ModelInfo {
	ModelInfo::new("Tag").with_field("label")
}

pub fn item_info() -> ModelInfo {
	ModelInfo::new("Item")
		.with_fields(["sku", "name", "qty"])
		.with_relation("tags", RelationInfo::to_many("Tag"))
}

pub fn customer_info() -> ModelInfo {
	ModelInfo::new("Customer").with_fields(["code", "name"])
}

pub fn order_info() -> ModelInfo {
	ModelInfo::new("Order")
		.with_field("note")
		.with_relation("customer", RelationInfo::to_one("Customer", "id"))
		.with_relation("items", RelationInfo::to_many("Item"))
}

/// An empty store with every shop model registered
pub fn shop_store() -> Arc<InMemoryStore> {
	Arc::new(
		InMemoryStore::new()
			.with_model(tag_info())
			.with_model(item_info())
			.with_model(customer_info())
			.with_model(order_info()),
	)
}

pub fn tag_serializer() -> PlainSerializer {
	PlainSerializer::new("TagSerializer", tag_info())
		.field(Field::integer("id").read_only())
		.field(Field::string("label").required())
}

pub fn item_builder() -> NestedSerializerBuilder {
	NestedSerializer::builder("ItemSerializer", item_info())
		.field(Field::integer("id").read_only())
		.field(Field::string("sku"))
		.field(Field::string("name"))
		.field(Field::integer("qty").validator(MinValueValidator(0.0)))
		.field(Field::nested_many(
			"tags",
			RelatedHandler::plain(tag_serializer()),
		))
		.permission_classes(vec![Arc::new(AllowAny)])
}

pub fn item_serializer() -> NestedSerializer {
	item_builder()
		.build()
		.expect("item serializer definition is valid")
}

pub fn customer_serializer() -> NestedSerializer {
	NestedSerializer::builder("CustomerSerializer", customer_info())
		.field(Field::integer("id").read_only())
		.field(Field::string("code"))
		.field(Field::string("name").required())
		.permission_classes(vec![Arc::new(AllowAny)])
		.build()
		.expect("customer serializer definition is valid")
}

/// Order serializer definition with the given related policies
///
/// Only authenticated users may write orders.
pub fn order_builder(items: PolicyDeclaration, customer: PolicyDeclaration) -> NestedSerializerBuilder {
	NestedSerializer::builder("OrderSerializer", order_info())
		.field(Field::integer("id").read_only())
		.field(Field::string("note"))
		.field(Field::object("meta"))
		.field(Field::nested(
			"customer",
			RelatedHandler::nested(customer_serializer()),
		))
		.field(Field::nested_many(
			"items",
			RelatedHandler::nested(item_serializer()),
		))
		.policy("items", items)
		.policy("customer", customer)
		.permission_classes(vec![Arc::new(IsAuthenticated)])
}

pub fn order_serializer(items: PolicyDeclaration, customer: PolicyDeclaration) -> NestedSerializer {
	order_builder(items, customer)
		.build()
		.expect("order serializer definition is valid")
}

/// Items looked up by `sku`, customers by `code`, everything else default
pub fn default_order_serializer() -> NestedSerializer {
	order_serializer(
		PolicyDeclaration::new().identity("sku"),
		PolicyDeclaration::new().identity("code"),
	)
}

/// A context over `store` carrying `request`
pub fn context(
	serializer: &NestedSerializer,
	store: &Arc<InMemoryStore>,
	request: Request,
) -> SerializerContext {
	serializer.context(store.clone()).with_request(request)
}

pub fn seed_item(store: &InMemoryStore, sku: &str, name: &str, qty: i64) -> Instance {
	store.insert("Item", json!({"sku": sku, "name": name, "qty": qty}))
}

pub fn seed_customer(store: &InMemoryStore, code: Value, name: &str) -> Instance {
	store.insert("Customer", json!({"code": code, "name": name}))
}
