//! Test doubles and fixtures for exercising the order lifecycle in memory.
//!
//! The order service talks to three collaborators through traits: the order
//! store, the payment gateway, and the product catalog. This crate provides
//! in-memory implementations of all three so the lifecycle semantics can be
//! tested without Postgres or a live gateway.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p heartwood-integration-tests
//! ```

// Test support code: panicking on a poisoned mutex or a bad fixture is fine.
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use heartwood_core::{CurrencyCode, Email, OrderId, OrderStatus, ProductId, UserId};
use heartwood_storefront::db::{OrderStore, ProductCatalog, RepositoryError};
use heartwood_storefront::models::order::{NewOrder, Order};
use heartwood_storefront::models::product::Product;
use heartwood_storefront::models::session::CurrentUser;
use heartwood_storefront::payments::{
    CheckoutSession, CreateSessionRequest, PaymentError, PaymentGateway, SessionPaymentStatus,
    SessionState,
};
use heartwood_storefront::services::orders::{CheckoutSettings, OrderService};

// =============================================================================
// Order store double
// =============================================================================

/// In-memory [`OrderStore`] with the same compare-and-set semantics as the
/// Postgres repository.
#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: Mutex<HashMap<OrderId, Order>>,
    /// Count of effective (winning) transitions out of `Pending`.
    transitions: AtomicUsize,
    fail_next_insert: AtomicBool,
    preempt_next_transition: Mutex<Option<OrderStatus>>,
}

impl InMemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `insert` fail, for exercising compensation paths.
    pub fn fail_next_insert(&self) {
        self.fail_next_insert.store(true, Ordering::SeqCst);
    }

    /// Apply `status` to the target order immediately before the next
    /// transition attempt, simulating a concurrent writer winning the race.
    pub fn preempt_next_transition(&self, status: OrderStatus) {
        *self.preempt_next_transition.lock().unwrap() = Some(status);
    }

    /// Number of effective transitions out of `Pending` so far.
    #[must_use]
    pub fn transition_count(&self) -> usize {
        self.transitions.load(Ordering::SeqCst)
    }

    /// Direct read of a stored order, bypassing the trait.
    #[must_use]
    pub fn get(&self, id: OrderId) -> Option<Order> {
        self.orders.lock().unwrap().get(&id).cloned()
    }

    /// Number of stored orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.lock().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut orders = self.orders.lock().unwrap();

        if orders
            .values()
            .any(|o| o.checkout_session_id == order.checkout_session_id)
        {
            return Err(RepositoryError::Conflict(
                "an order already exists for this checkout session".to_owned(),
            ));
        }

        let stored = Order {
            id: order.id,
            user_id: order.user_id,
            items: order.items,
            shipping_address: order.shipping_address,
            items_subtotal: order.items_subtotal,
            shipping_cost: order.shipping_cost,
            total_price: order.total_price,
            currency: order.currency,
            status: OrderStatus::Pending,
            checkout_session_id: order.checkout_session_id,
            is_paid: false,
            paid_at: None,
            created_at: Utc::now(),
        };
        orders.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .values()
            .find(|o| o.checkout_session_id == session_id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .orders
            .lock()
            .unwrap()
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn transition_from_pending(
        &self,
        id: OrderId,
        next: OrderStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<bool, RepositoryError> {
        let mut orders = self.orders.lock().unwrap();
        let Some(order) = orders.get_mut(&id) else {
            return Ok(false);
        };

        if let Some(preempt) = self.preempt_next_transition.lock().unwrap().take()
            && order.status == OrderStatus::Pending
        {
            order.status = preempt;
            order.is_paid = false;
            self.transitions.fetch_add(1, Ordering::SeqCst);
        }

        if order.status != OrderStatus::Pending {
            return Ok(false);
        }

        order.status = next;
        order.is_paid = next == OrderStatus::Paid;
        order.paid_at = paid_at;
        self.transitions.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

// =============================================================================
// Payment gateway double
// =============================================================================

/// Scriptable [`PaymentGateway`] double.
///
/// `create_checkout_session` hands out sequential session IDs and records
/// every request; `retrieve_session` answers with a configurable state.
#[derive(Default)]
pub struct StubGateway {
    created: Mutex<Vec<CreateSessionRequest>>,
    expired: Mutex<Vec<String>>,
    counter: AtomicUsize,
    fail_create: AtomicBool,
    retrieve: Mutex<Option<(SessionState, SessionPaymentStatus)>>,
}

impl StubGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `create_checkout_session` call fail.
    pub fn fail_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    /// Script the state `retrieve_session` reports.
    pub fn set_session_state(&self, status: SessionState, payment_status: SessionPaymentStatus) {
        *self.retrieve.lock().unwrap() = Some((status, payment_status));
    }

    /// Requests passed to `create_checkout_session`, in call order.
    #[must_use]
    pub fn created_requests(&self) -> Vec<CreateSessionRequest> {
        self.created.lock().unwrap().clone()
    }

    /// Session IDs passed to `expire_session`, in call order.
    #[must_use]
    pub fn expired_sessions(&self) -> Vec<String> {
        self.expired.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_checkout_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(PaymentError::Api {
                status: 500,
                message: "gateway unavailable".to_owned(),
            });
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let id = format!("cs_test_{n}");
        self.created.lock().unwrap().push(request);

        Ok(CheckoutSession {
            url: Some(format!("https://checkout.test/pay/{id}")),
            id,
            status: SessionState::Open,
            payment_status: SessionPaymentStatus::Unpaid,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError> {
        let scripted = *self.retrieve.lock().unwrap();
        let (status, payment_status) =
            scripted.unwrap_or((SessionState::Open, SessionPaymentStatus::Unpaid));

        Ok(CheckoutSession {
            id: session_id.to_owned(),
            url: None,
            status,
            payment_status,
        })
    }

    async fn expire_session(&self, session_id: &str) -> Result<(), PaymentError> {
        self.expired.lock().unwrap().push(session_id.to_owned());
        Ok(())
    }
}

// =============================================================================
// Catalog double
// =============================================================================

/// In-memory [`ProductCatalog`].
#[derive(Default)]
pub struct InMemoryCatalog {
    products: Mutex<HashMap<ProductId, Product>>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product and return its ID.
    pub fn add(&self, product: Product) -> ProductId {
        let id = product.id;
        self.products.lock().unwrap().insert(id, product);
        id
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let mut products: Vec<Product> =
            self.products.lock().unwrap().values().cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// An order service wired to in-memory doubles, with handles kept for
/// scripting and inspection.
pub struct TestHarness {
    pub store: Arc<InMemoryOrderStore>,
    pub gateway: Arc<StubGateway>,
    pub catalog: Arc<InMemoryCatalog>,
    pub service: OrderService,
}

impl TestHarness {
    /// Wire up a service with default settings: INR, flat ₹50 shipping.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryOrderStore::new());
        let gateway = Arc::new(StubGateway::new());
        let catalog = Arc::new(InMemoryCatalog::new());

        let service = OrderService::new(
            store.clone(),
            gateway.clone(),
            catalog.clone(),
            CheckoutSettings {
                frontend_url: "https://shop.heartwood.test".to_owned(),
                currency: CurrencyCode::Inr,
                shipping_flat_rate: Decimal::from(50),
            },
        );

        Self {
            store,
            gateway,
            catalog,
            service,
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A regular signed-in customer.
#[must_use]
pub fn customer() -> CurrentUser {
    CurrentUser {
        id: UserId::generate(),
        email: Email::parse("buyer@example.com").unwrap(),
        is_admin: false,
    }
}

/// An admin user.
#[must_use]
pub fn admin() -> CurrentUser {
    CurrentUser {
        id: UserId::generate(),
        email: Email::parse("admin@example.com").unwrap(),
        is_admin: true,
    }
}

/// A catalog product with the given price, in stock.
#[must_use]
pub fn product(name: &str, price: Decimal, image_url: Option<&str>) -> Product {
    Product {
        id: ProductId::generate(),
        name: name.to_owned(),
        description: format!("{name} description"),
        category: "Chairs".to_owned(),
        price,
        image_url: image_url.map(str::to_owned),
        count_in_stock: 10,
        created_at: Utc::now(),
    }
}
