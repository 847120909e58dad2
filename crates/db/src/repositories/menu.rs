use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use tably_core::domain::menu::{MenuItem, MenuItemId};

use super::{cents_from_decimal, decimal_from_cents, MenuRepository, RepositoryError};
use crate::DbPool;

pub struct SqlMenuRepository {
    pool: DbPool,
}

impl SqlMenuRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MenuRepository for SqlMenuRepository {
    async fn list_available(&self) -> Result<Vec<MenuItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, category, price_cents, available
             FROM menu_items
             WHERE available = 1
             ORDER BY category, name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(item_from_row).collect()
    }

    async fn find_by_id(&self, id: &MenuItemId) -> Result<Option<MenuItem>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, category, price_cents, available
             FROM menu_items
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(item_from_row).transpose()
    }

    async fn save(&self, item: MenuItem) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO menu_items (id, name, category, price_cents, available)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                price_cents = excluded.price_cents,
                available = excluded.available,
                updated_at = datetime('now')",
        )
        .bind(&item.id.0)
        .bind(&item.name)
        .bind(&item.category)
        .bind(cents_from_decimal(item.price)?)
        .bind(i64::from(item.available))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_availability(
        &self,
        id: &MenuItemId,
        available: bool,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE menu_items SET available = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(i64::from(available))
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn item_from_row(row: SqliteRow) -> Result<MenuItem, RepositoryError> {
    Ok(MenuItem {
        id: MenuItemId(row.get("id")),
        name: row.get("name"),
        category: row.get("category"),
        price: decimal_from_cents(row.get::<i64, _>("price_cents")),
        available: row.get::<i64, _>("available") != 0,
    })
}
