use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{LoggedMealItem, Meal, MealType};
use crate::nutrition::macros::MacroProfile;

#[derive(Debug, Clone, Deserialize)]
pub struct MealItemRequest {
    pub food_id: Uuid,
    #[serde(default = "default_multiplier")]
    pub serving_multiplier: f64,
    pub serving_size_override: Option<String>,
}

fn default_multiplier() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
pub struct CreateMealRequest {
    pub meal_type: MealType,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub logged_at: Option<OffsetDateTime>,
    /// Calendar day the meal counts toward (YYYY-MM-DD); defaults to the UTC day of `logged_at`.
    pub date: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<MealItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceItemsRequest {
    pub items: Vec<MealItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct MealItemView {
    #[serde(flatten)]
    pub item: LoggedMealItem,
    pub total: MacroProfile,
}

#[derive(Debug, Serialize)]
pub struct MealDetails {
    pub id: Uuid,
    pub meal_type: MealType,
    #[serde(with = "time::serde::rfc3339")]
    pub logged_at: OffsetDateTime,
    pub notes: Option<String>,
    pub items: Vec<MealItemView>,
    pub totals: MacroProfile,
}

impl From<Meal> for MealDetails {
    fn from(m: Meal) -> Self {
        let totals = m.totals();
        Self {
            id: m.id,
            meal_type: m.meal_type,
            logged_at: m.logged_at,
            notes: m.notes,
            items: m
                .items
                .into_iter()
                .map(|item| MealItemView {
                    total: item.total_macros(),
                    item,
                })
                .collect(),
            totals,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DayMeals {
    pub date: String,
    pub meals: Vec<MealDetails>,
    pub totals: MacroProfile,
}
