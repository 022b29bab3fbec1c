use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::db::from_unix_millis;
use crate::meals::repo::{DailyTotalsRow, LogEntryRow, MealSummaryRow, MealType};
use crate::profile::goals::MacroGoals;

#[derive(Debug, Deserialize)]
pub struct AddEntryRequest {
    pub product_id: i64,
    pub meal_type: MealType,
    pub quantity_g: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEntryRequest {
    pub quantity_g: i64,
}

#[derive(Debug, Deserialize)]
pub struct EntriesParams {
    pub meal_type: MealType,
}

#[derive(Debug, Serialize)]
pub struct LogEntryOut {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub meal_type: MealType,
    pub quantity_g: i64,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub logged_at: OffsetDateTime,
}

impl From<LogEntryRow> for LogEntryOut {
    fn from(row: LogEntryRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            meal_type: row.meal_type,
            quantity_g: row.quantity_g,
            calories: row.calories,
            protein: row.protein,
            fat: row.fat,
            carbs: row.carbs,
            logged_at: from_unix_millis(row.logged_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MealSummaryOut {
    pub meal_type: MealType,
    pub product_count: i64,
    pub total_quantity_g: i64,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_fat: f64,
    pub total_carbs: f64,
}

impl From<MealSummaryRow> for MealSummaryOut {
    fn from(row: MealSummaryRow) -> Self {
        Self {
            meal_type: row.meal_type,
            product_count: row.product_count,
            total_quantity_g: row.total_quantity_g,
            total_calories: row.total_calories,
            total_protein: row.total_protein,
            total_fat: row.total_fat,
            total_carbs: row.total_carbs,
        }
    }
}

/// The nutrition dashboard payload: today's totals against the user's goals
/// plus a per-meal breakdown. Meal types with no entries appear with zeroed
/// counters so the client always renders all four sections.
#[derive(Debug, Serialize)]
pub struct DailySummaryOut {
    pub date: String,
    pub goals: MacroGoals,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_fat: f64,
    pub total_carbs: f64,
    pub meals: Vec<MealSummaryOut>,
}

impl DailySummaryOut {
    pub fn assemble(
        date: String,
        goals: MacroGoals,
        totals: DailyTotalsRow,
        summaries: Vec<MealSummaryRow>,
    ) -> Self {
        let meals = MealType::ALL
            .iter()
            .map(|meal_type| {
                summaries
                    .iter()
                    .find(|s| s.meal_type == *meal_type)
                    .map(|s| MealSummaryOut::from(s.clone()))
                    .unwrap_or(MealSummaryOut {
                        meal_type: *meal_type,
                        product_count: 0,
                        total_quantity_g: 0,
                        total_calories: 0.0,
                        total_protein: 0.0,
                        total_fat: 0.0,
                        total_carbs: 0.0,
                    })
            })
            .collect();
        Self {
            date,
            goals,
            total_calories: totals.total_calories,
            total_protein: totals.total_protein,
            total_fat: totals.total_fat,
            total_carbs: totals.total_carbs,
            meals,
        }
    }
}
