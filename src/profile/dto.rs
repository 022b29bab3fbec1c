use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::goals::MacroGoals;
use crate::auth::repo::User;

#[derive(Debug, Serialize)]
pub struct ProfileOut {
    pub id: Uuid,
    pub email: String,
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
}

impl From<User> for ProfileOut {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            age: user.age,
            height_cm: user.height_cm,
            weight_kg: user.weight_kg,
            target_weight_kg: user.target_weight_kg,
            gender: user.gender,
            activity: user.activity,
            goal: user.goal,
            daily_calories_goal: user.daily_calories_goal,
            daily_protein_goal: user.daily_protein_goal,
            daily_fat_goal: user.daily_fat_goal,
            daily_carbs_goal: user.daily_carbs_goal,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
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
}

/// `effective` is what the dashboard tracks against; `computed` is the
/// recommendation derived from the profile, absent while the profile is
/// incomplete.
#[derive(Debug, Serialize)]
pub struct GoalsOut {
    pub effective: MacroGoals,
    pub computed: Option<MacroGoals>,
}
