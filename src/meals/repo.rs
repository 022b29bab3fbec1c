use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

/// One consumed item in today's log. Macros are absolute amounts already
/// scaled to the consumed quantity, not per-100 g values.
#[derive(Debug, Clone, FromRow)]
pub struct LogEntryRow {
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
}

#[derive(Debug, Clone, FromRow)]
pub struct MealSummaryRow {
    pub meal_type: MealType,
    pub product_count: i64,
    pub total_quantity_g: i64,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_fat: f64,
    pub total_carbs: f64,
}

#[derive(Debug, Clone, FromRow)]
pub struct DailyTotalsRow {
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_fat: f64,
    pub total_carbs: f64,
}

#[allow(clippy::too_many_arguments)]
pub async fn add_entry(
    db: &SqlitePool,
    user_id: &Uuid,
    product_id: i64,
    meal_type: MealType,
    quantity_g: i64,
    calories: f64,
    protein: f64,
    fat: f64,
    carbs: f64,
    logged_at_ms: i64,
) -> anyhow::Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO nutrition_log
            (user_id, product_id, meal_type, quantity_g, calories, protein, fat, carbs, logged_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(user_id.to_string())
    .bind(product_id)
    .bind(meal_type)
    .bind(quantity_g)
    .bind(calories)
    .bind(protein)
    .bind(fat)
    .bind(carbs)
    .bind(logged_at_ms)
    .fetch_one(db)
    .await?;
    Ok(id)
}

pub async fn get_entry(
    db: &SqlitePool,
    user_id: &Uuid,
    entry_id: i64,
) -> anyhow::Result<Option<LogEntryRow>> {
    let row = sqlx::query_as::<_, LogEntryRow>(
        r#"
        SELECT nl.id, nl.product_id, p.name AS product_name, nl.meal_type,
               nl.quantity_g, nl.calories, nl.protein, nl.fat, nl.carbs, nl.logged_at
        FROM nutrition_log nl
        JOIN products p ON p.id = nl.product_id
        WHERE nl.id = ? AND nl.user_id = ?
        "#,
    )
    .bind(entry_id)
    .bind(user_id.to_string())
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn entries_by_type(
    db: &SqlitePool,
    user_id: &Uuid,
    meal_type: MealType,
    since_ms: i64,
) -> anyhow::Result<Vec<LogEntryRow>> {
    let rows = sqlx::query_as::<_, LogEntryRow>(
        r#"
        SELECT nl.id, nl.product_id, p.name AS product_name, nl.meal_type,
               nl.quantity_g, nl.calories, nl.protein, nl.fat, nl.carbs, nl.logged_at
        FROM nutrition_log nl
        JOIN products p ON p.id = nl.product_id
        WHERE nl.user_id = ? AND nl.meal_type = ? AND nl.logged_at >= ?
        ORDER BY nl.logged_at ASC
        "#,
    )
    .bind(user_id.to_string())
    .bind(meal_type)
    .bind(since_ms)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn update_entry_quantity(
    db: &SqlitePool,
    user_id: &Uuid,
    entry_id: i64,
    quantity_g: i64,
    calories: f64,
    protein: f64,
    fat: f64,
    carbs: f64,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE nutrition_log
        SET quantity_g = ?, calories = ?, protein = ?, fat = ?, carbs = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(quantity_g)
    .bind(calories)
    .bind(protein)
    .bind(fat)
    .bind(carbs)
    .bind(entry_id)
    .bind(user_id.to_string())
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_entry(db: &SqlitePool, user_id: &Uuid, entry_id: i64) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM nutrition_log WHERE id = ? AND user_id = ?")
        .bind(entry_id)
        .bind(user_id.to_string())
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn daily_totals(
    db: &SqlitePool,
    user_id: &Uuid,
    since_ms: i64,
) -> anyhow::Result<DailyTotalsRow> {
    let row = sqlx::query_as::<_, DailyTotalsRow>(
        r#"
        SELECT COALESCE(SUM(calories), 0.0) AS total_calories,
               COALESCE(SUM(protein), 0.0)  AS total_protein,
               COALESCE(SUM(fat), 0.0)      AS total_fat,
               COALESCE(SUM(carbs), 0.0)    AS total_carbs
        FROM nutrition_log
        WHERE user_id = ? AND logged_at >= ?
        "#,
    )
    .bind(user_id.to_string())
    .bind(since_ms)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn meal_summaries(
    db: &SqlitePool,
    user_id: &Uuid,
    since_ms: i64,
) -> anyhow::Result<Vec<MealSummaryRow>> {
    let rows = sqlx::query_as::<_, MealSummaryRow>(
        r#"
        SELECT meal_type,
               COUNT(id)                    AS product_count,
               COALESCE(SUM(quantity_g), 0) AS total_quantity_g,
               COALESCE(SUM(calories), 0.0) AS total_calories,
               COALESCE(SUM(protein), 0.0)  AS total_protein,
               COALESCE(SUM(fat), 0.0)      AS total_fat,
               COALESCE(SUM(carbs), 0.0)    AS total_carbs
        FROM nutrition_log
        WHERE user_id = ? AND logged_at >= ?
        GROUP BY meal_type
        "#,
    )
    .bind(user_id.to_string())
    .bind(since_ms)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::repo::{insert_if_absent, Product};
    use crate::db::test_pool;

    async fn seed_product(db: &SqlitePool, name: &str) -> i64 {
        insert_if_absent(
            db,
            &Product {
                id: None,
                name: name.to_string(),
                calories: 100.0,
                protein: 10.0,
                fat: 5.0,
                carbs: 20.0,
                brand: None,
                barcode: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn entries_are_scoped_by_user_and_meal_type() {
        let db = test_pool().await;
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let product_id = seed_product(&db, "Овсянка").await;

        add_entry(&db, &user, product_id, MealType::Breakfast, 150, 150.0, 15.0, 7.5, 30.0, 1_000)
            .await
            .unwrap();
        add_entry(&db, &user, product_id, MealType::Dinner, 100, 100.0, 10.0, 5.0, 20.0, 2_000)
            .await
            .unwrap();
        add_entry(&db, &other, product_id, MealType::Breakfast, 100, 100.0, 10.0, 5.0, 20.0, 3_000)
            .await
            .unwrap();

        let breakfast = entries_by_type(&db, &user, MealType::Breakfast, 0).await.unwrap();
        assert_eq!(breakfast.len(), 1);
        assert_eq!(breakfast[0].product_name, "Овсянка");
        assert_eq!(breakfast[0].quantity_g, 150);
    }

    #[tokio::test]
    async fn update_and_delete_require_the_owning_user() {
        let db = test_pool().await;
        let user = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let product_id = seed_product(&db, "Рис").await;
        let entry_id =
            add_entry(&db, &user, product_id, MealType::Lunch, 100, 130.0, 2.7, 0.3, 28.0, 1_000)
                .await
                .unwrap();

        assert!(!update_entry_quantity(&db, &stranger, entry_id, 200, 260.0, 5.4, 0.6, 56.0)
            .await
            .unwrap());
        assert!(update_entry_quantity(&db, &user, entry_id, 200, 260.0, 5.4, 0.6, 56.0)
            .await
            .unwrap());

        let updated = get_entry(&db, &user, entry_id).await.unwrap().unwrap();
        assert_eq!(updated.quantity_g, 200);
        assert_eq!(updated.calories, 260.0);

        assert!(!delete_entry(&db, &stranger, entry_id).await.unwrap());
        assert!(delete_entry(&db, &user, entry_id).await.unwrap());
        assert!(get_entry(&db, &user, entry_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn summaries_aggregate_only_rows_since_the_cutoff() {
        let db = test_pool().await;
        let user = Uuid::new_v4();
        let product_id = seed_product(&db, "Творог").await;

        // вчерашняя запись не попадает в сводку
        add_entry(&db, &user, product_id, MealType::Breakfast, 100, 101.0, 16.0, 1.0, 3.0, 500)
            .await
            .unwrap();
        add_entry(&db, &user, product_id, MealType::Breakfast, 200, 202.0, 32.0, 2.0, 6.0, 1_500)
            .await
            .unwrap();
        add_entry(&db, &user, product_id, MealType::Snack, 50, 50.5, 8.0, 0.5, 1.5, 1_600)
            .await
            .unwrap();

        let totals = daily_totals(&db, &user, 1_000).await.unwrap();
        assert_eq!(totals.total_calories, 252.5);

        let summaries = meal_summaries(&db, &user, 1_000).await.unwrap();
        assert_eq!(summaries.len(), 2);
        let breakfast = summaries
            .iter()
            .find(|s| s.meal_type == MealType::Breakfast)
            .unwrap();
        assert_eq!(breakfast.product_count, 1);
        assert_eq!(breakfast.total_quantity_g, 200);
    }

    #[tokio::test]
    async fn empty_log_yields_zero_totals() {
        let db = test_pool().await;
        let totals = daily_totals(&db, &Uuid::new_v4(), 0).await.unwrap();
        assert_eq!(totals.total_calories, 0.0);
        assert_eq!(totals.total_protein, 0.0);
    }
}
