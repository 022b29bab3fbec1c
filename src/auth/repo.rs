use anyhow::Context;
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::unix_millis;

const USER_COLUMNS: &str = r#"
    id, email, password_hash, name, age, height_cm, weight_kg, target_weight_kg,
    gender, activity, goal,
    daily_calories_goal, daily_protein_goal, daily_fat_goal, daily_carbs_goal,
    created_at
"#;

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub age: Option<i64>,
    pub height_cm: Option<i64>,
    pub weight_kg: Option<i64>,
    pub target_weight_kg: Option<i64>,
    pub gender: Option<String>,
    pub activity: Option<String>,
    pub goal: Option<String>,
    pub daily_calories_goal: Option<i64>,
    pub daily_protein_goal: Option<i64>,
    pub daily_fat_goal: Option<i64>,
    pub daily_carbs_goal: Option<i64>,
    pub created_at: i64,
}

/// Raw row; user ids are stored as hyphenated uuid text.
#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    email: String,
    password_hash: String,
    name: Option<String>,
    age: Option<i64>,
    height_cm: Option<i64>,
    weight_kg: Option<i64>,
    target_weight_kg: Option<i64>,
    gender: Option<String>,
    activity: Option<String>,
    goal: Option<String>,
    daily_calories_goal: Option<i64>,
    daily_protein_goal: Option<i64>,
    daily_fat_goal: Option<i64>,
    daily_carbs_goal: Option<i64>,
    created_at: i64,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id).context("malformed user id")?;
        Ok(User {
            id,
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            age: row.age,
            height_cm: row.height_cm,
            weight_kg: row.weight_kg,
            target_weight_kg: row.target_weight_kg,
            gender: row.gender,
            activity: row.activity,
            goal: row.goal,
            daily_calories_goal: row.daily_calories_goal,
            daily_protein_goal: row.daily_protein_goal,
            daily_fat_goal: row.daily_fat_goal,
            daily_carbs_goal: row.daily_carbs_goal,
            created_at: row.created_at,
        })
    }
}

pub async fn find_by_email(db: &SqlitePool, email: &str) -> anyhow::Result<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
    ))
    .bind(email)
    .fetch_optional(db)
    .await?;
    row.map(User::try_from).transpose()
}

pub async fn find_by_id(db: &SqlitePool, id: &Uuid) -> anyhow::Result<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
    ))
    .bind(id.to_string())
    .fetch_optional(db)
    .await?;
    row.map(User::try_from).transpose()
}

pub async fn create(
    db: &SqlitePool,
    email: &str,
    password_hash: &str,
    name: Option<&str>,
) -> anyhow::Result<User> {
    let id = Uuid::new_v4();
    let created_at = unix_millis(OffsetDateTime::now_utc());
    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, name, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(email)
    .bind(password_hash)
    .bind(name)
    .bind(created_at)
    .execute(db)
    .await?;

    find_by_id(db, &id)
        .await?
        .context("user missing right after insert")
}
