use serde::Serialize;

use crate::auth::repo::User;

const SEDENTARY_MULTIPLIER: f64 = 1.2;
const LIGHT_ACTIVE_MULTIPLIER: f64 = 1.375;
const MODERATE_ACTIVE_MULTIPLIER: f64 = 1.55;
const VERY_ACTIVE_MULTIPLIER: f64 = 1.725;
const EXTRA_ACTIVE_MULTIPLIER: f64 = 1.9;

const WEIGHT_LOSS_CALORIE_DEFICIT: i64 = 500;
const WEIGHT_GAIN_CALORIE_SURPLUS: i64 = 500;
const MIN_CALORIES: i64 = 1200;
const PROTEIN_PER_KG: f64 = 1.8;
const FAT_PERCENTAGE: f64 = 0.25;
const CALORIES_PER_GRAM_PROTEIN: i64 = 4;
const CALORIES_PER_GRAM_FAT: i64 = 9;
const CALORIES_PER_GRAM_CARBS: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MacroGoals {
    pub calories: i64,
    pub protein_g: i64,
    pub fat_g: i64,
    pub carbs_g: i64,
}

/// Daily targets from the Mifflin-St Jeor equation, adjusted for activity
/// level and goal. `None` when the profile is missing a required field.
pub fn computed_goals(user: &User) -> Option<MacroGoals> {
    let weight = user.weight_kg?;
    let height = user.height_cm?;
    let age = user.age?;
    let gender = user.gender.as_deref()?;
    let activity = user.activity.as_deref()?;
    let goal = user.goal.as_deref()?;

    let bmr = bmr(weight, height, age, gender);
    let tdee = (bmr * activity_multiplier(activity)).round() as i64;
    let target_calories = adjust_for_goal(tdee, goal);
    if target_calories <= 0 {
        return None;
    }

    let protein_g = (weight as f64 * PROTEIN_PER_KG).round() as i64;
    let protein_calories = protein_g * CALORIES_PER_GRAM_PROTEIN;

    let fat_calories = (target_calories as f64 * FAT_PERCENTAGE).round() as i64;
    let fat_g = (fat_calories as f64 / CALORIES_PER_GRAM_FAT as f64).round() as i64;

    let remaining = target_calories - protein_calories - fat_calories;
    let carbs_g = if remaining <= 0 {
        0
    } else {
        (remaining as f64 / CALORIES_PER_GRAM_CARBS as f64).round() as i64
    };

    Some(MacroGoals {
        calories: target_calories,
        protein_g,
        fat_g,
        carbs_g,
    })
}

/// What the dashboard actually tracks against: stored per-user overrides,
/// falling back field by field to the stock defaults.
pub fn effective_goals(user: &User) -> MacroGoals {
    let calories = user.daily_calories_goal.unwrap_or(2000);
    let protein_g = user
        .daily_protein_goal
        .unwrap_or_else(|| (user.weight_kg.unwrap_or(70) as f64 * PROTEIN_PER_KG) as i64);
    let fat_g = user
        .daily_fat_goal
        .unwrap_or_else(|| ((calories as f64 * FAT_PERCENTAGE) / CALORIES_PER_GRAM_FAT as f64) as i64);
    let carbs_g = user.daily_carbs_goal.unwrap_or_else(|| {
        let remaining =
            calories - protein_g * CALORIES_PER_GRAM_PROTEIN - fat_g * CALORIES_PER_GRAM_FAT;
        (remaining.max(0) as f64 / CALORIES_PER_GRAM_CARBS as f64) as i64
    });
    MacroGoals {
        calories,
        protein_g,
        fat_g,
        carbs_g,
    }
}

fn bmr(weight_kg: i64, height_cm: i64, age: i64, gender: &str) -> f64 {
    let base = 10.0 * weight_kg as f64 + 6.25 * height_cm as f64 - 5.0 * age as f64;
    if gender.eq_ignore_ascii_case("male") {
        base + 5.0
    } else {
        base - 161.0
    }
}

fn activity_multiplier(activity: &str) -> f64 {
    match activity.to_lowercase().as_str() {
        "sedentary" => SEDENTARY_MULTIPLIER,
        "light" => LIGHT_ACTIVE_MULTIPLIER,
        "moderate" => MODERATE_ACTIVE_MULTIPLIER,
        "active" => VERY_ACTIVE_MULTIPLIER,
        "very_active" => EXTRA_ACTIVE_MULTIPLIER,
        _ => SEDENTARY_MULTIPLIER,
    }
}

fn adjust_for_goal(tdee: i64, goal: &str) -> i64 {
    match goal.to_lowercase().as_str() {
        "weight_loss" => {
            let result = tdee - WEIGHT_LOSS_CALORIE_DEFICIT;
            if result > 0 {
                result
            } else {
                MIN_CALORIES
            }
        }
        "weight_gain" => tdee + WEIGHT_GAIN_CALORIE_SURPLUS,
        _ => tdee,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "x@y.z".into(),
            password_hash: String::new(),
            name: None,
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
            created_at: 0,
        }
    }

    fn complete_male() -> User {
        User {
            age: Some(25),
            height_cm: Some(180),
            weight_kg: Some(75),
            gender: Some("male".into()),
            activity: Some("moderate".into()),
            goal: Some("weight_loss".into()),
            ..user()
        }
    }

    #[test]
    fn computed_goals_for_a_complete_male_profile() {
        let goals = computed_goals(&complete_male()).unwrap();
        // BMR 1755, TDEE 2720, минус дефицит 500
        assert_eq!(goals.calories, 2220);
        assert_eq!(goals.protein_g, 135);
        assert_eq!(goals.fat_g, 62);
        assert_eq!(goals.carbs_g, 281);
    }

    #[test]
    fn computed_goals_for_a_female_maintenance_profile() {
        let goals = computed_goals(&User {
            age: Some(30),
            height_cm: Some(165),
            weight_kg: Some(60),
            gender: Some("female".into()),
            activity: Some("sedentary".into()),
            goal: Some("maintenance".into()),
            ..user()
        })
        .unwrap();
        assert_eq!(goals.calories, 1584);
        assert_eq!(goals.protein_g, 108);
        assert_eq!(goals.fat_g, 44);
        assert_eq!(goals.carbs_g, 189);
    }

    #[test]
    fn weight_loss_never_drops_below_the_calorie_floor() {
        let goals = computed_goals(&User {
            age: Some(90),
            height_cm: Some(100),
            weight_kg: Some(30),
            gender: Some("female".into()),
            activity: Some("sedentary".into()),
            goal: Some("weight_loss".into()),
            ..user()
        })
        .unwrap();
        assert_eq!(goals.calories, MIN_CALORIES);
    }

    #[test]
    fn incomplete_profile_yields_no_computed_goals() {
        assert!(computed_goals(&user()).is_none());
        assert!(computed_goals(&User {
            weight_kg: Some(75),
            ..user()
        })
        .is_none());
    }

    #[test]
    fn effective_goals_fall_back_to_stock_defaults() {
        let goals = effective_goals(&user());
        assert_eq!(goals.calories, 2000);
        assert_eq!(goals.protein_g, 126);
        assert_eq!(goals.fat_g, 55);
        assert_eq!(goals.carbs_g, 250);
    }

    #[test]
    fn stored_overrides_win_over_defaults() {
        let goals = effective_goals(&User {
            daily_calories_goal: Some(1800),
            daily_protein_goal: Some(140),
            daily_fat_goal: Some(50),
            daily_carbs_goal: Some(160),
            ..user()
        });
        assert_eq!(
            goals,
            MacroGoals {
                calories: 1800,
                protein_g: 140,
                fat_g: 50,
                carbs_g: 160
            }
        );
    }
}
