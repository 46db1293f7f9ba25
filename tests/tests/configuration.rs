//! Serializers configured from TOML documents

use reinhardt_nested::prelude::*;
use reinhardt_nested::testkit::fixtures::create_request;
use reinhardt_nested::{PolicyDefaults, SettingsError};
use reinhardt_nested_integration_tests::*;
use rstest::*;

const POLICIES: &str = r#"
[items]
identity_fields = ["sku", "name"]
clear_before_set = true

[customer]
identity_fields = ["code"]
may_create = false
"#;

fn configured_orders(settings: NestedSettings) -> NestedSerializer {
	NestedSerializer::builder("OrderSerializer", order_info())
		.field(Field::integer("id").read_only())
		.field(Field::string("note"))
		.field(Field::nested(
			"customer",
			RelatedHandler::nested(customer_serializer()),
		))
		.field(Field::nested_many(
			"items",
			RelatedHandler::nested(item_serializer()),
		))
		.policies(PolicyDeclarations::from_toml_str(POLICIES).unwrap())
		.settings(settings)
		.permission_classes(vec![Arc::new(IsAuthenticated)])
		.build()
		.unwrap()
}

#[rstest]
fn test_declared_policies_are_completed() {
	let orders = configured_orders(NestedSettings::default());

	let items = orders.policies().resolve("items");
	assert!(items.policy.may_create);
	assert!(items.policy.may_edit);
	assert!(items.policy.clear_before_set);
	assert_eq!(items.policy.primary_identity(), Some("sku"));
	assert_eq!(items.policy.secondary_identities(), ["name".to_string()]);
	assert!(items.handler.is_some());

	let customer = orders.policies().resolve("customer");
	assert!(!customer.policy.may_create);
	assert!(customer.policy.may_edit);
}

#[rstest]
fn test_settings_defaults_fill_undeclared_flags() {
	let settings = NestedSettings::from_toml_str(
		r#"
[policy_defaults]
may_edit = false
"#,
	)
	.unwrap();
	assert_eq!(
		settings.policy_defaults,
		PolicyDefaults {
			may_create: true,
			may_edit: false,
			clear_before_set: false,
		}
	);

	let orders = configured_orders(settings);

	// Flags a declaration leaves out come from the defaults
	let items = orders.policies().resolve("items");
	assert!(!items.policy.may_edit);
	assert!(items.policy.clear_before_set);
	assert!(!orders.policies().resolve("customer").policy.may_edit);
	// Undeclared attributes resolve to the defaults
	let note = orders.policies().resolve("note");
	assert!(note.policy.may_create);
	assert!(!note.policy.may_edit);
	assert!(note.policy.identity_fields.is_empty());
}

#[rstest]
#[case::zero_depth("max_depth = 0", "max_depth")]
fn test_invalid_settings(#[case] source: &str, #[case] key: &str) {
	let err = NestedSettings::from_toml_str(source).unwrap_err();
	assert!(matches!(err, SettingsError::Invalid { key: ref k, .. } if k == key));
}

#[rstest]
fn test_unknown_policy_key_is_rejected() {
	let err = PolicyDeclarations::from_toml_str("[items]\nmay_delete = true\n").unwrap_err();
	assert!(matches!(err, SettingsError::Parse { .. }));
}

#[rstest]
#[tokio::test]
async fn test_configured_policies_drive_writes(create_request: Request) {
	let store = shop_store();
	seed_customer(&store, json!("C1"), "Ann");
	let orders = configured_orders(NestedSettings::default());
	let ctx = context(&orders, &store, create_request);

	let err = orders
		.write(&ctx, None, &json!({"customer": {"name": "Zed"}}))
		.await
		.unwrap_err();
	assert!(err.is_policy_violation());

	let order = orders
		.write(
			&ctx,
			None,
			&json!({"customer": "C1", "items": [{"name": "gadget", "qty": 1}]}),
		)
		.await
		.unwrap();
	assert_eq!(order.get("customer"), Some(&json!(1)));
	assert_eq!(store.linked_pks(&order, "items"), vec![json!(1)]);
}

#[rstest]
#[tokio::test]
async fn test_depth_limit(create_request: Request) {
	let store = shop_store();
	store.insert("Tag", json!({"label": "sale"}));
	let settings = NestedSettings::from_toml_str("max_depth = 1").unwrap();
	let orders = configured_orders(settings);
	let ctx = context(&orders, &store, create_request);

	// One level of nesting fits
	orders
		.validate(&ctx, None, &json!({"items": [{"name": "gadget"}]}))
		.await
		.unwrap();

	// Tags sit two levels below the order
	let err = orders
		.validate(&ctx, None, &json!({"items": [{"name": "gadget", "tags": [1]}]}))
		.await
		.unwrap_err();
	assert_eq!(err, SerializerError::DepthExceeded { max_depth: 1 });
}

#[rstest]
#[case::pruned(true, true)]
#[case::kept(false, false)]
#[tokio::test]
async fn test_null_pruning_toggle(
	create_request: Request,
	#[case] prune_nulls: bool,
	#[case] accepted: bool,
) {
	let store = shop_store();
	let orders = configured_orders(NestedSettings::default().with_prune_nulls(prune_nulls));
	let ctx = context(&orders, &store, create_request);

	let result = orders
		.validate(&ctx, None, &json!({"note": null}))
		.await;

	assert_eq!(result.is_ok(), accepted, "result: {:?}", result);
	if let Err(err) = result {
		let errors = err.field_errors().expect("field errors");
		assert_eq!(errors.get("note").unwrap()[0], "This field may not be null.");
	}
}
