//! Order lifecycle tests: placement, payment confirmation, and the
//! single-transition guarantee under concurrency.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use heartwood_core::OrderStatus;
use heartwood_integration_tests::{TestHarness, admin, customer, product};
use heartwood_storefront::models::session::CurrentUser;
use heartwood_storefront::payments::{SessionPaymentStatus, SessionState};
use heartwood_storefront::services::orders::{
    OrderError, OrderItemRequest, PlaceOrderRequest, PlacedOrder, ShippingAddressRequest,
};

fn address() -> ShippingAddressRequest {
    ShippingAddressRequest {
        street: "12 Teak Lane".to_owned(),
        city: "Pune".to_owned(),
        postal_code: "411001".to_owned(),
        country: "India".to_owned(),
        contact_number: Some("+91 98765 43210".to_owned()),
    }
}

/// Seed a chair at ₹250 and place an order for two of them.
async fn place_chair_order(harness: &TestHarness, user: &CurrentUser) -> PlacedOrder {
    let chair = harness
        .catalog
        .add(product("Modern Wooden Chair", Decimal::from(250), None));

    harness
        .service
        .place_order(
            user,
            PlaceOrderRequest {
                order_items: vec![OrderItemRequest {
                    product: chair,
                    quantity: 2,
                }],
                shipping_address: address(),
                items_subtotal: Decimal::from(500),
                shipping_cost: Decimal::from(50),
                total_price: Decimal::from(550),
            },
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn place_order_snapshots_catalog_and_opens_session() {
    let harness = TestHarness::new();
    let user = customer();

    let placed = place_chair_order(&harness, &user).await;

    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert!(!placed.order.is_paid);
    assert_eq!(placed.order.paid_at, None);
    assert_eq!(placed.order.user_id, user.id);
    assert_eq!(placed.order.items_subtotal, Decimal::from(500));
    assert_eq!(placed.order.shipping_cost, Decimal::from(50));
    assert_eq!(placed.order.total_price, Decimal::from(550));

    // Line items are snapshotted from the catalog
    assert_eq!(placed.order.items.len(), 1);
    assert_eq!(placed.order.items[0].name, "Modern Wooden Chair");
    assert_eq!(placed.order.items[0].unit_price, Decimal::from(250));
    assert_eq!(placed.order.items[0].quantity, 2);

    // The redirect points at the gateway-hosted page
    assert!(placed.redirect_url.starts_with("https://checkout.test/pay/"));

    // The order is persisted and linked to the session
    let stored = harness.store.get(placed.order.id).unwrap();
    assert_eq!(stored.checkout_session_id, placed.order.checkout_session_id);
}

#[tokio::test]
async fn place_order_sends_redirect_urls_and_metadata() {
    let harness = TestHarness::new();
    let user = customer();

    place_chair_order(&harness, &user).await;

    let requests = harness.gateway.created_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].success_url,
        "https://shop.heartwood.test/profile?success=true&session_id={CHECKOUT_SESSION_ID}"
    );
    assert_eq!(
        requests[0].cancel_url,
        "https://shop.heartwood.test/cart?canceled=true"
    );
    assert_eq!(requests[0].user_id, user.id);
    assert_eq!(requests[0].customer_email, user.email);
}

#[tokio::test]
async fn place_order_rejects_pricing_mismatch() {
    let harness = TestHarness::new();
    let user = customer();
    let chair = harness
        .catalog
        .add(product("Modern Wooden Chair", Decimal::from(250), None));

    // Client claims the chair costs ₹1; the catalog disagrees.
    let result = harness
        .service
        .place_order(
            &user,
            PlaceOrderRequest {
                order_items: vec![OrderItemRequest {
                    product: chair,
                    quantity: 2,
                }],
                shipping_address: address(),
                items_subtotal: Decimal::from(2),
                shipping_cost: Decimal::from(50),
                total_price: Decimal::from(52),
            },
        )
        .await;

    assert!(matches!(result, Err(OrderError::Validation(_))));
    // Rejected before any gateway call or persistence
    assert!(harness.gateway.created_requests().is_empty());
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn place_order_rejects_empty_cart_and_incomplete_address() {
    let harness = TestHarness::new();
    let user = customer();
    let chair = harness
        .catalog
        .add(product("Modern Wooden Chair", Decimal::from(250), None));

    let empty_cart = harness
        .service
        .place_order(
            &user,
            PlaceOrderRequest {
                order_items: vec![],
                shipping_address: address(),
                items_subtotal: Decimal::ZERO,
                shipping_cost: Decimal::from(50),
                total_price: Decimal::from(50),
            },
        )
        .await;
    assert!(matches!(empty_cart, Err(OrderError::Validation(_))));

    let mut no_city = address();
    no_city.city = String::new();
    let missing_field = harness
        .service
        .place_order(
            &user,
            PlaceOrderRequest {
                order_items: vec![OrderItemRequest {
                    product: chair,
                    quantity: 1,
                }],
                shipping_address: no_city,
                items_subtotal: Decimal::from(250),
                shipping_cost: Decimal::from(50),
                total_price: Decimal::from(300),
            },
        )
        .await;
    assert!(matches!(missing_field, Err(OrderError::Validation(_))));

    // Nothing reached the gateway and nothing was persisted
    assert!(harness.gateway.created_requests().is_empty());
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn place_order_rejects_unknown_product() {
    let harness = TestHarness::new();
    let user = customer();

    let result = harness
        .service
        .place_order(
            &user,
            PlaceOrderRequest {
                order_items: vec![OrderItemRequest {
                    product: heartwood_core::ProductId::generate(),
                    quantity: 1,
                }],
                shipping_address: address(),
                items_subtotal: Decimal::from(250),
                shipping_cost: Decimal::from(50),
                total_price: Decimal::from(300),
            },
        )
        .await;

    assert!(matches!(result, Err(OrderError::Validation(_))));
    assert!(harness.gateway.created_requests().is_empty());
}

#[tokio::test]
async fn confirm_payment_marks_order_paid() {
    let harness = TestHarness::new();
    let user = customer();
    let placed = place_chair_order(&harness, &user).await;

    harness
        .gateway
        .set_session_state(SessionState::Complete, SessionPaymentStatus::Paid);

    let confirmed = harness
        .service
        .confirm_payment(&placed.order.checkout_session_id)
        .await
        .unwrap();

    assert_eq!(confirmed.status, OrderStatus::Paid);
    assert!(confirmed.is_paid);
    assert!(confirmed.paid_at.is_some());
    assert_eq!(harness.store.transition_count(), 1);
}

#[tokio::test]
async fn confirm_payment_is_idempotent() {
    let harness = TestHarness::new();
    let user = customer();
    let placed = place_chair_order(&harness, &user).await;

    harness
        .gateway
        .set_session_state(SessionState::Complete, SessionPaymentStatus::Paid);

    let first = harness
        .service
        .confirm_payment(&placed.order.checkout_session_id)
        .await
        .unwrap();
    let second = harness
        .service
        .confirm_payment(&placed.order.checkout_session_id)
        .await
        .unwrap();

    // paid_at is set exactly once and never moves
    assert_eq!(first.paid_at, second.paid_at);
    assert_eq!(harness.store.transition_count(), 1);
}

#[tokio::test]
async fn confirm_payment_rejects_unpaid_session() {
    let harness = TestHarness::new();
    let user = customer();
    let placed = place_chair_order(&harness, &user).await;

    // Gateway still reports the session open and unpaid
    let result = harness
        .service
        .confirm_payment(&placed.order.checkout_session_id)
        .await;

    assert!(matches!(result, Err(OrderError::PaymentIncomplete)));
    let stored = harness.store.get(placed.order.id).unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
    assert!(!stored.is_paid);
}

#[tokio::test]
async fn confirm_payment_closes_out_expired_session() {
    let harness = TestHarness::new();
    let user = customer();
    let placed = place_chair_order(&harness, &user).await;

    harness
        .gateway
        .set_session_state(SessionState::Expired, SessionPaymentStatus::Unpaid);

    let result = harness
        .service
        .confirm_payment(&placed.order.checkout_session_id)
        .await;
    assert!(matches!(result, Err(OrderError::SessionExpired)));

    // The order is reconciled to Expired, terminally
    let stored = harness.store.get(placed.order.id).unwrap();
    assert_eq!(stored.status, OrderStatus::Expired);
    assert!(!stored.is_paid);

    // Further confirmations fail without consulting the gateway
    harness
        .gateway
        .set_session_state(SessionState::Complete, SessionPaymentStatus::Paid);
    let retry = harness
        .service
        .confirm_payment(&placed.order.checkout_session_id)
        .await;
    assert!(matches!(retry, Err(OrderError::SessionExpired)));
}

#[tokio::test]
async fn confirm_payment_requires_known_session() {
    let harness = TestHarness::new();

    let unknown = harness.service.confirm_payment("cs_test_missing").await;
    assert!(matches!(unknown, Err(OrderError::NotFound)));

    let blank = harness.service.confirm_payment("   ").await;
    assert!(matches!(blank, Err(OrderError::Validation(_))));
}

#[tokio::test]
async fn concurrent_confirmations_produce_one_transition() {
    let harness = TestHarness::new();
    let user = customer();
    let placed = place_chair_order(&harness, &user).await;

    harness
        .gateway
        .set_session_state(SessionState::Complete, SessionPaymentStatus::Paid);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = harness.service.clone();
        let session_id = placed.order.checkout_session_id.clone();
        handles.push(tokio::spawn(async move {
            service.confirm_payment(&session_id).await
        }));
    }

    let mut paid_ats = Vec::new();
    for handle in handles {
        let order = handle.await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        paid_ats.push(order.paid_at.unwrap());
    }

    // Exactly one caller performed the transition; everyone observed the
    // same paid_at.
    assert_eq!(harness.store.transition_count(), 1);
    assert!(paid_ats.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn mark_paid_requires_admin_and_is_idempotent() {
    let harness = TestHarness::new();
    let user = customer();
    let placed = place_chair_order(&harness, &user).await;

    let denied = harness.service.mark_paid(placed.order.id, &user).await;
    assert!(matches!(denied, Err(OrderError::NotAuthorized)));

    let first = harness
        .service
        .mark_paid(placed.order.id, &admin())
        .await
        .unwrap();
    assert_eq!(first.status, OrderStatus::Paid);
    assert!(first.paid_at.is_some());

    let second = harness
        .service
        .mark_paid(placed.order.id, &admin())
        .await
        .unwrap();
    assert_eq!(second.paid_at, first.paid_at);
    assert_eq!(harness.store.transition_count(), 1);
}

#[tokio::test]
async fn get_order_enforces_ownership() {
    let harness = TestHarness::new();
    let owner = customer();
    let placed = place_chair_order(&harness, &owner).await;

    let got = harness
        .service
        .get_order(placed.order.id, &owner)
        .await
        .unwrap();
    assert_eq!(got.id, placed.order.id);

    let stranger = customer();
    let denied = harness.service.get_order(placed.order.id, &stranger).await;
    assert!(matches!(denied, Err(OrderError::NotAuthorized)));

    // Admins can inspect any order
    let seen = harness
        .service
        .get_order(placed.order.id, &admin())
        .await
        .unwrap();
    assert_eq!(seen.id, placed.order.id);
}

#[tokio::test]
async fn list_orders_returns_only_own_orders() {
    let harness = TestHarness::new();
    let alice = customer();
    let bob = customer();

    let alice_order = place_chair_order(&harness, &alice).await;
    place_chair_order(&harness, &bob).await;

    let orders = harness.service.list_orders_for_user(&alice).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, alice_order.order.id);
}

#[tokio::test]
async fn list_orders_returns_most_recent_first() {
    let harness = TestHarness::new();
    let user = customer();

    let mut placed_ids = Vec::new();
    for _ in 0..3 {
        placed_ids.push(place_chair_order(&harness, &user).await.order.id);
        // Keep creation timestamps strictly increasing
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let listed: Vec<_> = harness
        .service
        .list_orders_for_user(&user)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.id)
        .collect();

    placed_ids.reverse();
    assert_eq!(listed, placed_ids);
}

#[tokio::test]
async fn confirm_payment_lost_race_to_expiry_reports_expired() {
    let harness = TestHarness::new();
    let user = customer();
    let placed = place_chair_order(&harness, &user).await;

    harness
        .gateway
        .set_session_state(SessionState::Complete, SessionPaymentStatus::Paid);
    // A reconciliation expires the order between the gateway check and the
    // paid transition
    harness.store.preempt_next_transition(OrderStatus::Expired);

    let result = harness
        .service
        .confirm_payment(&placed.order.checkout_session_id)
        .await;

    assert!(matches!(result, Err(OrderError::SessionExpired)));
    let stored = harness.store.get(placed.order.id).unwrap();
    assert_eq!(stored.status, OrderStatus::Expired);
    assert!(!stored.is_paid);
}

#[tokio::test]
async fn mark_paid_lost_race_never_reports_success() {
    let harness = TestHarness::new();
    let user = customer();
    let placed = place_chair_order(&harness, &user).await;

    harness.store.preempt_next_transition(OrderStatus::Canceled);

    let result = harness.service.mark_paid(placed.order.id, &admin()).await;

    assert!(matches!(result, Err(OrderError::Validation(_))));
    assert_eq!(
        harness.store.get(placed.order.id).unwrap().status,
        OrderStatus::Canceled
    );
}
