//! Order repository: the persistence collaborator for the order lifecycle.
//!
//! All payment-state mutations go through [`OrderStore::transition_from_pending`],
//! a compare-and-set keyed on the order ID and the current `pending` status.
//! Two concurrent confirmations therefore produce exactly one effective
//! transition; the loser sees `false` and re-reads the winner's state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use heartwood_core::{CurrencyCode, OrderId, OrderStatus, ProductId, UserId};

use super::RepositoryError;
use crate::models::order::{NewOrder, Order, OrderItem, ShippingAddress};

/// Persistence port for orders.
///
/// Implemented by [`OrderRepository`] for Postgres and by an in-memory
/// double in the integration-tests crate.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new `Pending` order together with its line items.
    async fn insert(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    /// Fetch an order by its ID.
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Fetch the unique order holding the given checkout session ID.
    async fn find_by_session(&self, session_id: &str) -> Result<Option<Order>, RepositoryError>;

    /// All orders for a user, most recent first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Compare-and-set transition out of `Pending`.
    ///
    /// Returns `true` iff this call performed the transition. `paid_at` is
    /// stored only when `next` is [`OrderStatus::Paid`].
    async fn transition_from_pending(
        &self,
        id: OrderId,
        next: OrderStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<bool, RepositoryError>;
}

/// Postgres-backed order repository.
pub struct OrderRepository {
    pool: PgPool,
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    street: String,
    city: String,
    postal_code: String,
    country: String,
    contact_number: Option<String>,
    items_subtotal: Decimal,
    shipping_cost: Decimal,
    total_price: Decimal,
    currency: String,
    status: OrderStatus,
    checkout_session_id: String,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct OrderItemRow {
    order_id: Uuid,
    product_id: Uuid,
    name: String,
    unit_price: Decimal,
    quantity: i32,
    image_url: Option<String>,
}

const SELECT_ORDER: &str = "SELECT id, user_id, street, city, postal_code, country, \
     contact_number, items_subtotal, shipping_cost, total_price, currency, status, \
     checkout_session_id, is_paid, paid_at, created_at FROM orders";

const SELECT_ITEMS: &str = "SELECT order_id, product_id, name, unit_price, quantity, \
     image_url FROM order_items";

impl OrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn assemble(row: OrderRow, items: Vec<OrderItemRow>) -> Result<Order, RepositoryError> {
        let currency = CurrencyCode::parse(&row.currency).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("unknown currency: {}", row.currency))
        })?;

        let mut order_items = Vec::with_capacity(items.len());
        for item in items {
            let quantity = u32::try_from(item.quantity).map_err(|_| {
                RepositoryError::DataCorruption(format!(
                    "invalid quantity {} on order {}",
                    item.quantity, row.id
                ))
            })?;
            order_items.push(OrderItem {
                product_id: ProductId::new(item.product_id),
                name: item.name,
                unit_price: item.unit_price,
                quantity,
                image_url: item.image_url,
            });
        }

        Ok(Order {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            items: order_items,
            shipping_address: ShippingAddress {
                street: row.street,
                city: row.city,
                postal_code: row.postal_code,
                country: row.country,
                contact_number: row.contact_number,
            },
            items_subtotal: row.items_subtotal,
            shipping_cost: row.shipping_cost,
            total_price: row.total_price,
            currency,
            status: row.status,
            checkout_session_id: row.checkout_session_id,
            is_paid: row.is_paid,
            paid_at: row.paid_at,
            created_at: row.created_at,
        })
    }

    async fn load_one(&self, row: Option<OrderRow>) -> Result<Option<Order>, RepositoryError> {
        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(&format!(
            "{SELECT_ITEMS} WHERE order_id = $1 ORDER BY position ASC"
        ))
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        Self::assemble(row, items).map(Some)
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn insert(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(
            "INSERT INTO orders (id, user_id, street, city, postal_code, country, \
             contact_number, items_subtotal, shipping_cost, total_price, currency, \
             status, checkout_session_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'pending', $12) \
             RETURNING id, user_id, street, city, postal_code, country, contact_number, \
             items_subtotal, shipping_cost, total_price, currency, status, \
             checkout_session_id, is_paid, paid_at, created_at",
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(&order.shipping_address.street)
        .bind(&order.shipping_address.city)
        .bind(&order.shipping_address.postal_code)
        .bind(&order.shipping_address.country)
        .bind(&order.shipping_address.contact_number)
        .bind(order.items_subtotal)
        .bind(order.shipping_cost)
        .bind(order.total_price)
        .bind(order.currency.as_gateway_str())
        .bind(&order.checkout_session_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(
                    "an order already exists for this checkout session".to_owned(),
                );
            }
            RepositoryError::Database(e)
        })?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_items (order_id, position, product_id, name, \
                 unit_price, quantity, image_url) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(order.id.as_uuid())
            .bind(i32::try_from(position).map_err(|_| {
                RepositoryError::DataCorruption("too many line items".to_owned())
            })?)
            .bind(item.product_id.as_uuid())
            .bind(&item.name)
            .bind(item.unit_price)
            .bind(i32::try_from(item.quantity).map_err(|_| {
                RepositoryError::DataCorruption("quantity out of range".to_owned())
            })?)
            .bind(&item.image_url)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Self::assemble(
            row,
            Vec::new(), // reassembled below from the input to avoid a re-read
        )
        .map(|mut stored| {
            stored.items = order.items;
            stored
        })
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{SELECT_ORDER} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        self.load_one(row).await
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_ORDER} WHERE checkout_session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        self.load_one(row).await
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_ORDER} WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut item_rows = sqlx::query_as::<_, OrderItemRow>(&format!(
            "{SELECT_ITEMS} WHERE order_id = ANY($1) ORDER BY position ASC"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let (mine, rest): (Vec<_>, Vec<_>) =
                item_rows.into_iter().partition(|i| i.order_id == row.id);
            item_rows = rest;
            orders.push(Self::assemble(row, mine)?);
        }

        Ok(orders)
    }

    async fn transition_from_pending(
        &self,
        id: OrderId,
        next: OrderStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET status = $2, is_paid = ($2 = 'paid'::order_status), \
             paid_at = $3, updated_at = now() \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id.as_uuid())
        .bind(next)
        .bind(paid_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
