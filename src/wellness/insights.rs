use serde::{Deserialize, Serialize};

use super::labels::{clamp_score, score_label, ScoreLabel};
use super::sleep::DailySleepRecord;

const NO_DATA_SCORE: i32 = 50;
const NO_ACTIVITY_SCORE: i32 = 30;
const STEP_TARGET: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionSummary {
    pub calories_consumed: f64,
    pub calorie_goal: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub steps: i64,
    pub active_calories: f64,
    pub distance_m: f64,
    pub exercise_minutes: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyInsightScores {
    pub recovery: i32,
    pub stress: i32,
    pub strain: i32,
    pub readiness: i32,
    pub sleep: i32,
    /// Not clamped above 100; values past 100 mean the goal was exceeded.
    pub nutrition: i32,
    pub hydration: i32,
}

impl DailyInsightScores {
    /// Integer mean of recovery, sleep, nutrition and hydration.
    pub fn overall_wellness(&self) -> i32 {
        (self.recovery + self.sleep + self.nutrition + self.hydration) / 4
    }

    pub fn overall_label(&self) -> ScoreLabel {
        score_label(self.overall_wellness())
    }
}

fn activity_score(activity: Option<&ActivitySummary>) -> i32 {
    match activity {
        Some(a) => ((a.steps.max(0) as f64 / STEP_TARGET).min(1.0) * 100.0).round() as i32,
        None => NO_ACTIVITY_SCORE,
    }
}

fn nutrition_score(nutrition: Option<&NutritionSummary>) -> i32 {
    match nutrition {
        Some(n) => {
            let ratio = n.calories_consumed.max(0.0) / n.calorie_goal.max(1.0);
            (ratio * 100.0).round() as i32
        }
        None => NO_DATA_SCORE,
    }
}

fn hydration_score(hydration_ml: f64, goal_ml: f64) -> i32 {
    let ratio = (hydration_ml.max(0.0) / goal_ml.max(1.0)).min(1.0);
    (ratio * 100.0).round() as i32
}

/// Derives the day's insight scores. Missing inputs fall back to fixed
/// defaults; nothing here fails.
pub fn daily_insight_scores(
    sleep: Option<&DailySleepRecord>,
    nutrition: Option<&NutritionSummary>,
    activity: Option<&ActivitySummary>,
    hydration_ml: f64,
    hydration_goal_ml: f64,
) -> DailyInsightScores {
    let sleep = clamp_score(sleep.map_or(NO_DATA_SCORE, DailySleepRecord::score));
    let nutrition = nutrition_score(nutrition);
    let hydration = clamp_score(hydration_score(hydration_ml, hydration_goal_ml));
    let activity = activity_score(activity);

    // high load lowers recovery
    let recovery = clamp_score((sleep + 100 - activity) / 2);
    let stress = clamp_score((100 - activity).max(0));
    let strain = clamp_score(activity);

    DailyInsightScores {
        recovery,
        stress,
        strain,
        readiness: recovery,
        sleep,
        nutrition,
        hydration,
    }
}
