use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::meals::repo::MealType;

/// An immutable archived log entry. `logged_at` is the original consumption
/// instant; `product_name` is a snapshot taken at archive time.
#[derive(Debug, Clone, FromRow)]
pub struct ArchivedEntryRow {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub meal_type: MealType,
    pub quantity_g: i64,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub logged_at: i64,
    pub archived_at: i64,
}

pub async fn checkpoint(db: &SqlitePool, user_id: &Uuid) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT last_checked_date FROM rollover_checkpoints WHERE user_id = ?",
    )
    .bind(user_id.to_string())
    .fetch_optional(db)
    .await
}

pub async fn put_checkpoint(
    db: &SqlitePool,
    user_id: &Uuid,
    date: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO rollover_checkpoints (user_id, last_checked_date)
        VALUES (?, ?)
        ON CONFLICT(user_id) DO UPDATE SET last_checked_date = excluded.last_checked_date
        "#,
    )
    .bind(user_id.to_string())
    .bind(date)
    .execute(db)
    .await?;
    Ok(())
}

/// Users whose checkpoint is not `today` and who therefore still need a
/// rollover check. Drives the background tick.
pub async fn stale_checkpoint_users(
    db: &SqlitePool,
    today: &str,
) -> Result<Vec<Uuid>, sqlx::Error> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT user_id FROM rollover_checkpoints WHERE last_checked_date <> ?",
    )
    .bind(today)
    .fetch_all(db)
    .await?;
    Ok(ids
        .into_iter()
        .filter_map(|id| Uuid::parse_str(&id).ok())
        .collect())
}

/// Copies every log row older than the cutoff into the archive, snapshotting
/// the product name and preserving the original meal type and timestamp.
pub async fn copy_to_archive<'e, E>(
    executor: E,
    user_id: &Uuid,
    cutoff_ms: i64,
    archived_at_ms: i64,
) -> Result<u64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO nutrition_archive
            (user_id, product_id, product_name, meal_type, quantity_g,
             calories, protein, fat, carbs, logged_at, archived_at)
        SELECT nl.user_id, nl.product_id, COALESCE(p.name, ''), nl.meal_type, nl.quantity_g,
               nl.calories, nl.protein, nl.fat, nl.carbs, nl.logged_at, ?
        FROM nutrition_log nl
        LEFT JOIN products p ON p.id = nl.product_id
        WHERE nl.user_id = ? AND nl.logged_at < ?
        "#,
    )
    .bind(archived_at_ms)
    .bind(user_id.to_string())
    .bind(cutoff_ms)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

/// Deletes log rows by the same predicate the copy used. Evaluated inside the
/// same transaction, so a row logged after the cutoff is never swept.
pub async fn delete_older_than<'e, E>(
    executor: E,
    user_id: &Uuid,
    cutoff_ms: i64,
) -> Result<u64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query("DELETE FROM nutrition_log WHERE user_id = ? AND logged_at < ?")
        .bind(user_id.to_string())
        .bind(cutoff_ms)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// The atomic rollover: archive-copy and log-delete commit together or not at
/// all.
pub async fn archive_older_than(
    db: &SqlitePool,
    user_id: &Uuid,
    cutoff_ms: i64,
    archived_at_ms: i64,
) -> Result<u64, sqlx::Error> {
    let mut tx = db.begin().await?;
    copy_to_archive(&mut *tx, user_id, cutoff_ms, archived_at_ms).await?;
    let deleted = delete_older_than(&mut *tx, user_id, cutoff_ms).await?;
    tx.commit().await?;
    Ok(deleted)
}

pub async fn archive_page(
    db: &SqlitePool,
    user_id: &Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<ArchivedEntryRow>, sqlx::Error> {
    sqlx::query_as::<_, ArchivedEntryRow>(
        r#"
        SELECT id, product_id, product_name, meal_type, quantity_g,
               calories, protein, fat, carbs, logged_at, archived_at
        FROM nutrition_archive
        WHERE user_id = ?
        ORDER BY logged_at DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_id.to_string())
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::repo::{insert_if_absent, Product};
    use crate::db::test_pool;
    use crate::meals::repo::add_entry;

    async fn seed(db: &SqlitePool, user: &Uuid) -> i64 {
        let product_id = insert_if_absent(
            db,
            &Product {
                id: None,
                name: "Гречка".into(),
                calories: 343.0,
                protein: 13.0,
                fat: 3.4,
                carbs: 72.0,
                brand: None,
                barcode: None,
            },
        )
        .await
        .unwrap();
        add_entry(db, user, product_id, MealType::Dinner, 100, 343.0, 13.0, 3.4, 72.0, 1_000)
            .await
            .unwrap();
        product_id
    }

    #[tokio::test]
    async fn abandoned_transaction_leaves_log_intact_and_archive_empty() {
        let db = test_pool().await;
        let user = Uuid::new_v4();
        seed(&db, &user).await;

        {
            let mut tx = db.begin().await.unwrap();
            let copied = copy_to_archive(&mut *tx, &user, 2_000, 9_000).await.unwrap();
            assert_eq!(copied, 1);
            // сбой между копированием и удалением: транзакция не коммитится
        }

        let log_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nutrition_log")
            .fetch_one(&db)
            .await
            .unwrap();
        let archive_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nutrition_archive")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(log_count, 1, "entry must survive the failed rollover");
        assert_eq!(archive_count, 0, "no partial archive rows may persist");
    }

    #[tokio::test]
    async fn committed_rollover_moves_the_row_exactly_once() {
        let db = test_pool().await;
        let user = Uuid::new_v4();
        seed(&db, &user).await;

        let deleted = archive_older_than(&db, &user, 2_000, 9_000).await.unwrap();
        assert_eq!(deleted, 1);

        let log_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nutrition_log")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(log_count, 0);

        let archived = archive_page(&db, &user, 10, 0).await.unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].product_name, "Гречка");
        assert_eq!(archived[0].meal_type, MealType::Dinner);
        assert_eq!(archived[0].logged_at, 1_000);
        assert_eq!(archived[0].archived_at, 9_000);
    }

    #[tokio::test]
    async fn archive_snapshot_survives_product_deletion() {
        let db = test_pool().await;
        let user = Uuid::new_v4();
        let product_id = seed(&db, &user).await;
        archive_older_than(&db, &user, 2_000, 9_000).await.unwrap();

        sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(product_id)
            .execute(&db)
            .await
            .unwrap();

        let archived = archive_page(&db, &user, 10, 0).await.unwrap();
        assert_eq!(archived[0].product_name, "Гречка");
    }

    #[tokio::test]
    async fn checkpoint_upsert_roundtrip() {
        let db = test_pool().await;
        let user = Uuid::new_v4();
        assert!(checkpoint(&db, &user).await.unwrap().is_none());

        put_checkpoint(&db, &user, "2024-05-01").await.unwrap();
        put_checkpoint(&db, &user, "2024-05-02").await.unwrap();
        assert_eq!(checkpoint(&db, &user).await.unwrap().as_deref(), Some("2024-05-02"));

        let stale = stale_checkpoint_users(&db, "2024-05-03").await.unwrap();
        assert_eq!(stale, vec![user]);
        let fresh = stale_checkpoint_users(&db, "2024-05-02").await.unwrap();
        assert!(fresh.is_empty());
    }
}
