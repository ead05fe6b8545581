//! Inventory tables and queries.

use crate::db::DatabaseHandle;
use crate::error::AppError;
use chrono::NaiveDateTime;
use serde::Serialize;

const INVENTORY_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS item (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        uom TEXT NOT NULL DEFAULT 'Ea',
        min_stock INTEGER NOT NULL DEFAULT 0,
        created TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS item_transaction (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        item_id INTEGER NOT NULL REFERENCES item(id) ON DELETE CASCADE,
        qty INTEGER NOT NULL,
        note TEXT,
        created TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_item_transaction_item ON item_transaction (item_id)",
];

/// Item row with its on-hand quantity (sum of all transactions).
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct ItemSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub uom: String,
    pub min_stock: i64,
    pub on_hand: i64,
    pub created: NaiveDateTime,
}

const SUMMARY_SELECT: &str = r#"
    SELECT i.id, i.name, i.description, i.uom, i.min_stock, i.created,
           COALESCE(SUM(t.qty), 0) AS on_hand
    FROM item i
    LEFT JOIN item_transaction t ON t.item_id = i.id
    GROUP BY i.id
"#;

pub async fn initialize_tables(db: &mut DatabaseHandle) -> Result<(), AppError> {
    let conn = db.conn()?;
    for ddl in INVENTORY_TABLES {
        sqlx::query(ddl).execute(&mut *conn).await?;
    }
    Ok(())
}

pub async fn add_item(
    db: &mut DatabaseHandle,
    name: &str,
    description: Option<&str>,
    uom: &str,
    min_stock: i64,
) -> Result<i64, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("item name is required".into()));
    }
    let id = sqlx::query("INSERT INTO item (name, description, uom, min_stock) VALUES (?, ?, ?, ?)")
        .bind(name)
        .bind(description)
        .bind(uom)
        .bind(min_stock)
        .execute(db.conn()?)
        .await?
        .last_insert_rowid();
    Ok(id)
}

/// Record a stock movement; negative quantities are withdrawals.
pub async fn record_transaction(
    db: &mut DatabaseHandle,
    item_id: i64,
    qty: i64,
    note: Option<&str>,
) -> Result<i64, AppError> {
    let conn = db.conn()?;
    let known: Option<i64> = sqlx::query_scalar("SELECT id FROM item WHERE id = ?")
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;
    if known.is_none() {
        return Err(AppError::NotFound(format!("item {}", item_id)));
    }
    let id = sqlx::query("INSERT INTO item_transaction (item_id, qty, note) VALUES (?, ?, ?)")
        .bind(item_id)
        .bind(qty)
        .bind(note)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
    Ok(id)
}

pub async fn list_items(db: &mut DatabaseHandle) -> Result<Vec<ItemSummary>, AppError> {
    let sql = format!("{} ORDER BY i.name", SUMMARY_SELECT);
    Ok(sqlx::query_as::<_, ItemSummary>(&sql).fetch_all(db.conn()?).await?)
}

/// Items whose on-hand quantity is below their minimum stock.
pub async fn stock_report(db: &mut DatabaseHandle) -> Result<Vec<ItemSummary>, AppError> {
    let sql = format!(
        "{} HAVING COALESCE(SUM(t.qty), 0) < i.min_stock ORDER BY i.name",
        SUMMARY_SELECT
    );
    Ok(sqlx::query_as::<_, ItemSummary>(&sql).fetch_all(db.conn()?).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn on_hand_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = DatabaseHandle::open(&dir.path().join("inv.sqlite")).await.unwrap();
        initialize_tables(&mut db).await.unwrap();
        initialize_tables(&mut db).await.unwrap();

        let bolts = add_item(&mut db, "Bolts", Some("M6"), "Ea", 100).await.unwrap();
        let nuts = add_item(&mut db, "Nuts", None, "Ea", 10).await.unwrap();
        record_transaction(&mut db, bolts, 50, Some("initial")).await.unwrap();
        record_transaction(&mut db, nuts, 25, None).await.unwrap();
        record_transaction(&mut db, nuts, -5, Some("used")).await.unwrap();

        let items = list_items(&mut db).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Bolts");
        assert_eq!(items[0].on_hand, 50);
        assert_eq!(items[1].on_hand, 20);

        let low = stock_report(&mut db).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, bolts);

        assert!(matches!(
            record_transaction(&mut db, 999, 1, None).await,
            Err(AppError::NotFound(_))
        ));
        db.close().await;
    }
}
