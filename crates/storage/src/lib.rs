use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, info};

use shared::domain::{OrderRow, Table};

/// A store with whole-table semantics: there is no row-level API.
///
/// `read` never serves a cached copy. `update` replaces the stored table with
/// exactly the given sequence; concurrent writers are not detected and the
/// last completed `update` wins.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn read(&self) -> Result<Table>;
    async fn update(&self, table: &Table) -> Result<()>;
}

#[derive(Clone)]
pub struct SqliteTableStore {
    pool: Pool<Sqlite>,
}

impl SqliteTableStore {
    pub async fn open(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new().max_connections(5);
        if is_memory_url(database_url) {
            // Each in-memory connection is its own database; keep exactly one alive.
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options.connect_with(connect_options).await?;

        let store = Self { pool };
        store.ensure_orders_table().await?;
        info!(%database_url, "opened sqlite order store");
        Ok(store)
    }

    async fn ensure_orders_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                position      INTEGER PRIMARY KEY,
                order_date    TEXT NOT NULL,
                site_name     TEXT NOT NULL,
                address       TEXT NOT NULL DEFAULT '',
                company       TEXT NOT NULL DEFAULT '',
                manager       TEXT NOT NULL DEFAULT '',
                phone         TEXT NOT NULL DEFAULT '',
                item          TEXT NOT NULL,
                quantity      INTEGER NOT NULL CHECK (quantity >= 1),
                delivery_date TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure orders table exists")?;
        Ok(())
    }
}

#[async_trait]
impl TableStore for SqliteTableStore {
    async fn read(&self) -> Result<Table> {
        let rows = sqlx::query(
            "SELECT order_date, site_name, address, company, manager, phone, item, quantity, delivery_date
             FROM orders ORDER BY position ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to read orders")?;

        let mut table = Vec::with_capacity(rows.len());
        for row in rows {
            let quantity: i64 = row.try_get("quantity")?;
            table.push(OrderRow {
                order_date: row.try_get::<NaiveDate, _>("order_date")?,
                site_name: row.try_get("site_name")?,
                address: row.try_get("address")?,
                company: row.try_get("company")?,
                manager: row.try_get("manager")?,
                phone: row.try_get("phone")?,
                item: row.try_get("item")?,
                quantity: u32::try_from(quantity)
                    .with_context(|| format!("stored quantity {quantity} is out of range"))?,
                delivery_date: row.try_get::<NaiveDate, _>("delivery_date")?,
            });
        }
        debug!(rows = table.len(), "read orders from sqlite");
        Ok(Table::new(table))
    }

    async fn update(&self, table: &Table) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM orders")
            .execute(&mut *tx)
            .await
            .context("failed to clear orders")?;
        for (position, row) in table.rows().iter().enumerate() {
            sqlx::query(
                "INSERT INTO orders (position, order_date, site_name, address, company, manager, phone, item, quantity, delivery_date)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(position as i64)
            .bind(row.order_date)
            .bind(&row.site_name)
            .bind(&row.address)
            .bind(&row.company)
            .bind(&row.manager)
            .bind(&row.phone)
            .bind(&row.item)
            .bind(i64::from(row.quantity))
            .bind(row.delivery_date)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to write order at position {position}"))?;
        }
        tx.commit().await.context("failed to commit orders")?;
        debug!(rows = table.len(), "replaced orders in sqlite");
        Ok(())
    }
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_memory_url(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
