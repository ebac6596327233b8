//! Checkout session boundary tests: minor-unit conversion, image filtering,
//! compensation on persistence failure, and response serialization.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use heartwood_integration_tests::{TestHarness, customer, product};
use heartwood_storefront::services::orders::{
    OrderError, OrderItemRequest, PlaceOrderRequest, ShippingAddressRequest,
};

fn address() -> ShippingAddressRequest {
    ShippingAddressRequest {
        street: "45 Banyan Road".to_owned(),
        city: "Mumbai".to_owned(),
        postal_code: "400001".to_owned(),
        country: "India".to_owned(),
        contact_number: None,
    }
}

fn single_item_request(
    product_id: heartwood_core::ProductId,
    quantity: u32,
    unit_price: Decimal,
) -> PlaceOrderRequest {
    let subtotal = unit_price * Decimal::from(quantity);
    PlaceOrderRequest {
        order_items: vec![OrderItemRequest {
            product: product_id,
            quantity,
        }],
        shipping_address: address(),
        items_subtotal: subtotal,
        shipping_cost: Decimal::from(50),
        total_price: subtotal + Decimal::from(50),
    }
}

#[tokio::test]
async fn line_items_carry_rounded_minor_units() {
    let harness = TestHarness::new();
    let user = customer();

    // 2.345 major units rounds half-up to 235 minor units
    let id = harness
        .catalog
        .add(product("Sample Swatch", Decimal::new(2345, 3), None));

    harness
        .service
        .place_order(&user, single_item_request(id, 2, Decimal::new(2345, 3)))
        .await
        .unwrap();

    let requests = harness.gateway.created_requests();
    assert_eq!(requests[0].line_items.len(), 1);
    assert_eq!(requests[0].line_items[0].unit_amount, 235);
    assert_eq!(requests[0].line_items[0].quantity, 2);
}

#[tokio::test]
async fn loopback_image_urls_never_reach_the_gateway() {
    let harness = TestHarness::new();
    let user = customer();

    let local = harness.catalog.add(product(
        "Local Chair",
        Decimal::from(100),
        Some("http://localhost:5000/uploads/chair.jpg"),
    ));
    harness
        .service
        .place_order(&user, single_item_request(local, 1, Decimal::from(100)))
        .await
        .unwrap();

    let public = harness.catalog.add(product(
        "Public Chair",
        Decimal::from(100),
        Some("https://images.example.com/chair.jpg"),
    ));
    harness
        .service
        .place_order(&user, single_item_request(public, 1, Decimal::from(100)))
        .await
        .unwrap();

    let relative = harness.catalog.add(product(
        "Relative Chair",
        Decimal::from(100),
        Some("/uploads/chair.jpg"),
    ));
    harness
        .service
        .place_order(&user, single_item_request(relative, 1, Decimal::from(100)))
        .await
        .unwrap();

    let requests = harness.gateway.created_requests();
    assert_eq!(requests[0].line_items[0].image_url, None);
    assert_eq!(
        requests[1].line_items[0].image_url,
        Some("https://images.example.com/chair.jpg".to_owned())
    );
    assert_eq!(requests[2].line_items[0].image_url, None);

    // Filtering applies only at the gateway boundary; the stored order
    // keeps the original URL.
    let orders = harness.service.list_orders_for_user(&user).await.unwrap();
    let local_order = orders
        .iter()
        .find(|o| o.items[0].name == "Local Chair")
        .unwrap();
    assert_eq!(
        local_order.items[0].image_url,
        Some("http://localhost:5000/uploads/chair.jpg".to_owned())
    );
}

#[tokio::test]
async fn persistence_failure_expires_the_session() {
    let harness = TestHarness::new();
    let user = customer();
    let id = harness
        .catalog
        .add(product("Rustic Coffee Table", Decimal::from(450), None));

    harness.store.fail_next_insert();

    let result = harness
        .service
        .place_order(&user, single_item_request(id, 1, Decimal::from(450)))
        .await;

    assert!(matches!(result, Err(OrderError::Repository(_))));

    // Compensation: the session the gateway created was expired, and no
    // order was stored.
    let created = harness.gateway.created_requests();
    assert_eq!(created.len(), 1);
    assert_eq!(harness.gateway.expired_sessions(), vec!["cs_test_0"]);
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn gateway_failure_persists_nothing() {
    let harness = TestHarness::new();
    let user = customer();
    let id = harness
        .catalog
        .add(product("Minimalist Oak Bookshelf", Decimal::from(600), None));

    harness.gateway.fail_create();

    let result = harness
        .service
        .place_order(&user, single_item_request(id, 1, Decimal::from(600)))
        .await;

    assert!(matches!(result, Err(OrderError::Gateway(_))));
    assert!(harness.store.is_empty());
    assert!(harness.gateway.expired_sessions().is_empty());
}

#[tokio::test]
async fn orders_serialize_in_client_shape() {
    let harness = TestHarness::new();
    let user = customer();
    let id = harness
        .catalog
        .add(product("Solid Walnut Dining Table", Decimal::from(1200), None));

    let placed = harness
        .service
        .place_order(&user, single_item_request(id, 1, Decimal::from(1200)))
        .await
        .unwrap();

    let json = serde_json::to_value(&placed.order).unwrap();

    // camelCase keys, string-encoded decimals, lowercase status
    assert_eq!(json["status"], "pending");
    assert_eq!(json["isPaid"], false);
    assert_eq!(json["totalPrice"], "1250");
    assert_eq!(json["itemsSubtotal"], "1200");
    assert_eq!(json["shippingCost"], "50");
    assert!(json["checkoutSessionId"].is_string());
    assert_eq!(json["shippingAddress"]["postalCode"], "400001");
    assert_eq!(json["items"][0]["unitPrice"], "1200");
    assert!(json["paidAt"].is_null());
}
