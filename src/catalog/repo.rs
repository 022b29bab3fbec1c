use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// A catalog food product. Macros are per 100 g. `id` is absent until the
/// product has been persisted; before that its identity is the name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Option<i64>,
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub brand: Option<String>,
    pub barcode: Option<String>,
}

pub async fn find_by_name(db: &SqlitePool, name: &str) -> anyhow::Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, calories, protein, fat, carbs, brand, barcode
        FROM products
        WHERE name = ? COLLATE NOCASE
        "#,
    )
    .bind(name)
    .fetch_optional(db)
    .await?;
    Ok(product)
}

pub async fn find_by_id(db: &SqlitePool, id: i64) -> anyhow::Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, calories, protein, fat, carbs, brand, barcode
        FROM products
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(product)
}

/// Case-insensitive starts-with lookup, name ascending.
pub async fn find_by_prefix(
    db: &SqlitePool,
    prefix: &str,
    limit: i64,
) -> anyhow::Result<Vec<Product>> {
    let pattern = format!("{}%", escape_like(prefix));
    let products = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, calories, protein, fat, carbs, brand, barcode
        FROM products
        WHERE name LIKE ? ESCAPE '\' COLLATE NOCASE
        ORDER BY name ASC
        LIMIT ?
        "#,
    )
    .bind(pattern)
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(products)
}

/// Inserts the product unless a row with the same name (case-insensitive)
/// already exists, and returns the surviving row's id. A single upsert, so
/// racing calls for one name all observe the same id and never duplicate it.
pub async fn insert_if_absent(db: &SqlitePool, product: &Product) -> anyhow::Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO products (name, calories, protein, fat, carbs, brand, barcode)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(name) DO UPDATE SET name = excluded.name
        RETURNING id
        "#,
    )
    .bind(&product.name)
    .bind(product.calories)
    .bind(product.protein)
    .bind(product.fat)
    .bind(product.carbs)
    .bind(&product.brand)
    .bind(&product.barcode)
    .fetch_one(db)
    .await?;
    Ok(id)
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
