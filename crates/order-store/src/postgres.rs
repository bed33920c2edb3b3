use async_trait::async_trait;
use common::{OrderId, PartId, UserId};
use domain::{Money, Order, OrderChange, OrderStatus, PaymentMethod};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::store::{OrderStore, validate_transition};
use crate::{OrderStoreError, Result};

const ORDER_COLUMNS: &str = "id, user_id, part_ids, total_price_cents, payment_method, \
     transaction_id, status, created_at, updated_at";

/// PostgreSQL-backed order store.
///
/// `transition` is a single `UPDATE ... WHERE status = $expected`, so the
/// database row lock decides races between concurrent writers.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and returns a store over the new pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);

        let status: String = row.try_get("status")?;
        let status = status
            .parse::<OrderStatus>()
            .map_err(|e| OrderStoreError::Corrupt(format!("order {id}: {e}")))?;

        let payment_method = row
            .try_get::<Option<String>, _>("payment_method")?
            .map(|method| method.parse::<PaymentMethod>())
            .transpose()
            .map_err(|e| OrderStoreError::Corrupt(format!("order {id}: {e}")))?;

        let part_ids: Vec<String> = row.try_get("part_ids")?;

        Ok(Order {
            id,
            user_id: UserId::new(row.try_get::<String, _>("user_id")?),
            part_ids: part_ids.into_iter().map(PartId::from).collect(),
            total_price: Money::from_cents(row.try_get("total_price_cents")?),
            payment_method,
            transaction_id: row.try_get("transaction_id")?,
            status,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn current_status(&self, id: OrderId) -> Result<Option<OrderStatus>> {
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        status
            .map(|s| {
                s.parse::<OrderStatus>()
                    .map_err(|e| OrderStoreError::Corrupt(format!("order {id}: {e}")))
            })
            .transpose()
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id))]
    async fn insert(&self, order: &Order) -> Result<()> {
        let part_ids: Vec<&str> = order.part_ids.iter().map(PartId::as_str).collect();

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, part_ids, total_price_cents, payment_method,
                                transaction_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_str())
        .bind(part_ids)
        .bind(order.total_price.cents())
        .bind(order.payment_method.map(|m| m.as_str()))
        .bind(order.transaction_id)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return OrderStoreError::AlreadyExists(order.id);
            }
            OrderStoreError::Database(e)
        })?;

        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    #[tracing::instrument(skip_all, fields(order_id = %id, expected = %expected))]
    async fn transition(
        &self,
        id: OrderId,
        expected: OrderStatus,
        change: OrderChange,
    ) -> Result<Order> {
        validate_transition(expected, &change)?;

        let (transaction_id, payment_method) = match change {
            OrderChange::Paid {
                transaction_id,
                payment_method,
            } => (Some(transaction_id), Some(payment_method.as_str())),
            OrderChange::Assembled | OrderChange::Cancelled => (None, None),
        };

        let row = sqlx::query(&format!(
            r#"
            UPDATE orders
            SET status = $3,
                transaction_id = COALESCE($4, transaction_id),
                payment_method = COALESCE($5, payment_method),
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(expected.as_str())
        .bind(change.target_status().as_str())
        .bind(transaction_id)
        .bind(payment_method)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Self::row_to_order(row);
        }

        // Nothing matched: tell a missing order from a lost race.
        match self.current_status(id).await? {
            None => Err(OrderStoreError::NotFound(id)),
            Some(actual) => {
                tracing::debug!(%actual, "conditional write lost");
                Err(OrderStoreError::StatusMismatch {
                    order_id: id,
                    expected,
                    actual,
                })
            }
        }
    }
}
