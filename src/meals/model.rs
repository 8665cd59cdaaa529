use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::nutrition::macros::MacroProfile;
use crate::nutrition::product::FoodProduct;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "breakfast" => MealType::Breakfast,
            "lunch" => MealType::Lunch,
            "dinner" => MealType::Dinner,
            _ => MealType::Snack,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum MealError {
    #[error("serving multiplier must be a positive number")]
    InvalidMultiplier,
}

/// A food as it was when logged. Later catalog edits don't touch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedMealItem {
    pub food_id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub serving_description: String,
    /// Per-serving values copied from the food.
    pub macros: MacroProfile,
    pub serving_multiplier: f64,
    pub serving_size_override: Option<String>,
}

impl LoggedMealItem {
    pub fn capture(
        food: &FoodProduct,
        serving_multiplier: f64,
        serving_size_override: Option<String>,
    ) -> Result<Self, MealError> {
        if !(serving_multiplier.is_finite() && serving_multiplier > 0.0) {
            return Err(MealError::InvalidMultiplier);
        }
        Ok(Self {
            food_id: food.id,
            name: food.name.clone(),
            brand: food.brand.clone(),
            serving_description: food.serving_description.clone(),
            macros: food.macros,
            serving_multiplier,
            serving_size_override: serving_size_override.filter(|s| !s.trim().is_empty()),
        })
    }

    pub fn total_macros(&self) -> MacroProfile {
        self.macros.scaled(self.serving_multiplier)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Meal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_type: MealType,
    #[serde(with = "time::serde::rfc3339")]
    pub logged_at: OffsetDateTime,
    pub notes: Option<String>,
    pub items: Vec<LoggedMealItem>,
}

impl Meal {
    pub fn totals(&self) -> MacroProfile {
        self.items.iter().map(LoggedMealItem::total_macros).sum()
    }
}
