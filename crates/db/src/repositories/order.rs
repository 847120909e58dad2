use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use tably_core::domain::menu::MenuItemId;
use tably_core::domain::order::{Order, OrderId, OrderLine, OrderStatus};

use super::{cents_from_decimal, decimal_from_cents, OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn lines_for(&self, order_id: &str) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT menu_item_id, menu_item_name, quantity, unit_price_cents, special_instructions
             FROM order_lines
             WHERE order_id = ?
             ORDER BY id ASC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(line_from_row).collect()
    }
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn create(&self, order: Order) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (id, customer_name, customer_phone, total_cents, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&order.id.0)
        .bind(&order.customer_name)
        .bind(order.customer_phone.as_deref())
        .bind(cents_from_decimal(order.total)?)
        .bind(order.status.as_str())
        .bind(order.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for line in &order.lines {
            sqlx::query(
                "INSERT INTO order_lines (
                    order_id,
                    menu_item_id,
                    menu_item_name,
                    quantity,
                    unit_price_cents,
                    special_instructions
                 ) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&order.id.0)
            .bind(&line.menu_item_id.0)
            .bind(&line.menu_item_name)
            .bind(i64::from(line.quantity))
            .bind(cents_from_decimal(line.unit_price)?)
            .bind(line.special_instructions.as_deref())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, customer_name, customer_phone, total_cents, status, created_at
             FROM orders
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines = self.lines_for(&id.0).await?;
        Ok(Some(order_from_row(row, lines)?))
    }

    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError> {
        let rows = if let Some(status) = status {
            sqlx::query(
                "SELECT id, customer_name, customer_phone, total_cents, status, created_at
                 FROM orders
                 WHERE status = ?
                 ORDER BY created_at DESC",
            )
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT id, customer_name, customer_phone, total_cents, status, created_at
                 FROM orders
                 ORDER BY created_at DESC",
            )
            .fetch_all(&self.pool)
            .await?
        };

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let order_id: String = row.get("id");
            let lines = self.lines_for(&order_id).await?;
            orders.push(order_from_row(row, lines)?);
        }
        Ok(orders)
    }

    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::OrderNotFound(id.0.clone()));
        }
        Ok(())
    }
}

fn order_from_row(row: SqliteRow, lines: Vec<OrderLine>) -> Result<Order, RepositoryError> {
    let status_label: String = row.get("status");
    let status = OrderStatus::parse(&status_label)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown order status `{status_label}`")))?;

    let created_at_raw: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at_raw)
        .map_err(|err| RepositoryError::Decode(format!("bad created_at timestamp: {err}")))?
        .with_timezone(&Utc);

    Ok(Order {
        id: OrderId(row.get("id")),
        customer_name: row.get("customer_name"),
        customer_phone: row.get("customer_phone"),
        lines,
        total: decimal_from_cents(row.get::<i64, _>("total_cents")),
        status,
        created_at,
    })
}

fn line_from_row(row: SqliteRow) -> Result<OrderLine, RepositoryError> {
    let quantity: i64 = row.get("quantity");
    Ok(OrderLine {
        menu_item_id: MenuItemId(row.get("menu_item_id")),
        menu_item_name: row.get("menu_item_name"),
        quantity: u32::try_from(quantity)
            .map_err(|_| RepositoryError::Decode(format!("bad quantity {quantity}")))?,
        unit_price: decimal_from_cents(row.get::<i64, _>("unit_price_cents")),
        special_instructions: row.get("special_instructions"),
    })
}
