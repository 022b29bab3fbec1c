use sqlx::SqlitePool;
use uuid::Uuid;

use super::dto::UpdateProfileRequest;

/// Applies the provided fields, leaving omitted ones untouched.
pub async fn update_profile(
    db: &SqlitePool,
    user_id: &Uuid,
    changes: &UpdateProfileRequest,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users SET
            name = COALESCE(?, name),
            age = COALESCE(?, age),
            height_cm = COALESCE(?, height_cm),
            weight_kg = COALESCE(?, weight_kg),
            target_weight_kg = COALESCE(?, target_weight_kg),
            gender = COALESCE(?, gender),
            activity = COALESCE(?, activity),
            goal = COALESCE(?, goal),
            daily_calories_goal = COALESCE(?, daily_calories_goal),
            daily_protein_goal = COALESCE(?, daily_protein_goal),
            daily_fat_goal = COALESCE(?, daily_fat_goal),
            daily_carbs_goal = COALESCE(?, daily_carbs_goal)
        WHERE id = ?
        "#,
    )
    .bind(&changes.name)
    .bind(changes.age)
    .bind(changes.height_cm)
    .bind(changes.weight_kg)
    .bind(changes.target_weight_kg)
    .bind(&changes.gender)
    .bind(&changes.activity)
    .bind(&changes.goal)
    .bind(changes.daily_calories_goal)
    .bind(changes.daily_protein_goal)
    .bind(changes.daily_fat_goal)
    .bind(changes.daily_carbs_goal)
    .bind(user_id.to_string())
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::{create, find_by_id};
    use crate::db::test_pool;

    #[tokio::test]
    async fn update_touches_only_the_provided_fields() {
        let db = test_pool().await;
        let user = create(&db, "p@q.r", "hash", Some("Анна")).await.unwrap();

        let changes = UpdateProfileRequest {
            name: None,
            age: Some(28),
            height_cm: Some(170),
            weight_kg: Some(62),
            target_weight_kg: None,
            gender: Some("female".into()),
            activity: Some("light".into()),
            goal: Some("maintenance".into()),
            daily_calories_goal: None,
            daily_protein_goal: None,
            daily_fat_goal: None,
            daily_carbs_goal: None,
        };
        assert!(update_profile(&db, &user.id, &changes).await.unwrap());

        let reloaded = find_by_id(&db, &user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.name.as_deref(), Some("Анна"), "omitted field kept");
        assert_eq!(reloaded.age, Some(28));
        assert_eq!(reloaded.weight_kg, Some(62));
        assert_eq!(reloaded.goal.as_deref(), Some("maintenance"));
    }

    #[tokio::test]
    async fn update_for_unknown_user_reports_no_rows() {
        let db = test_pool().await;
        let changes = UpdateProfileRequest {
            name: Some("Nobody".into()),
            age: None,
            height_cm: None,
            weight_kg: None,
            target_weight_kg: None,
            gender: None,
            activity: None,
            goal: None,
            daily_calories_goal: None,
            daily_protein_goal: None,
            daily_fat_goal: None,
            daily_carbs_goal: None,
        };
        assert!(!update_profile(&db, &Uuid::new_v4(), &changes).await.unwrap());
    }
}
