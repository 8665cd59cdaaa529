use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::dto::MealItemRequest;
use super::model::{LoggedMealItem, Meal, MealError};
use crate::nutrition::macros::MacroProfile;
use crate::nutrition::repo::CatalogStore;
use crate::wellness::insights::NutritionSummary;

#[derive(Debug, Error)]
pub enum MealServiceError {
    #[error("food {0} not found")]
    UnknownFood(Uuid),
    #[error(transparent)]
    Invalid(#[from] MealError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Resolves requested foods from the catalog and snapshots them.
pub async fn capture_items(
    foods: &dyn CatalogStore,
    user_id: Uuid,
    requests: &[MealItemRequest],
) -> Result<Vec<LoggedMealItem>, MealServiceError> {
    let mut items = Vec::with_capacity(requests.len());
    for req in requests {
        let food = foods
            .find_by_id(req.food_id)
            .await?
            .filter(|f| f.owner_id.map_or(true, |o| o == user_id))
            .ok_or(MealServiceError::UnknownFood(req.food_id))?;
        items.push(LoggedMealItem::capture(
            &food,
            req.serving_multiplier,
            req.serving_size_override.clone(),
        )?);
    }
    Ok(items)
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyNutrition {
    pub meal_count: usize,
    pub totals: MacroProfile,
    pub calorie_goal: f64,
}

impl DailyNutrition {
    /// `None` when nothing was logged, so scoring uses its no-data default.
    pub fn as_summary(&self) -> Option<NutritionSummary> {
        (self.meal_count > 0).then(|| NutritionSummary {
            calories_consumed: self.totals.calories,
            calorie_goal: self.calorie_goal,
        })
    }
}

pub fn daily_nutrition(meals: &[Meal], calorie_goal: f64) -> DailyNutrition {
    DailyNutrition {
        meal_count: meals.len(),
        totals: meals.iter().map(Meal::totals).sum(),
        calorie_goal,
    }
}
