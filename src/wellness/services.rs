use serde::Serialize;
use sqlx::PgPool;
use time::{Date, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::energy::{tdee_breakdown, TdeeBreakdown};
use super::insights::{daily_insight_scores, DailyInsightScores};
use super::repo::{self, UserProfile};
use super::sleep::{SleepStage, StageSegment};
use crate::config::GoalDefaults;
use crate::meals::{self, services::daily_nutrition};

/// A raw sleep sample as exported by the phone's health store.
#[derive(Debug, Clone)]
pub struct HealthSleepSample {
    pub category: String,
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

/// Maps health samples to stage segments, dropping categories with no stage
/// and samples that don't move forward in time.
pub fn stages_from_samples(samples: &[HealthSleepSample]) -> Vec<StageSegment> {
    samples
        .iter()
        .filter_map(|s| {
            let stage = SleepStage::from_health_category(&s.category)?;
            let minutes = (s.end - s.start).as_seconds_f64() / 60.0;
            (minutes > 0.0).then_some(StageSegment {
                stage,
                start: s.start,
                duration_minutes: minutes,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Goals {
    pub calories: f64,
    pub hydration_ml: f64,
}

pub fn resolve_goals(profile: Option<&UserProfile>, defaults: &GoalDefaults) -> Goals {
    let positive = |v: Option<f64>| v.filter(|g| g.is_finite() && *g > 0.0);
    Goals {
        calories: profile
            .and_then(|p| positive(p.calorie_goal))
            .unwrap_or(defaults.calories),
        hydration_ml: profile
            .and_then(|p| positive(p.hydration_goal_ml))
            .unwrap_or(defaults.hydration_ml),
    }
}

/// Gathers everything logged for `date`, scores it and stores the result.
pub async fn recompute_day(
    db: &PgPool,
    defaults: &GoalDefaults,
    user_id: Uuid,
    date: Date,
) -> anyhow::Result<DailyInsightScores> {
    let (profile, sleep, day_meals, activity, water_ml) = tokio::try_join!(
        repo::get_profile(db, user_id),
        repo::get_sleep(db, user_id, date),
        meals::repo::list_by_date(db, user_id, date),
        repo::get_activity(db, user_id, date),
        repo::water_total(db, user_id, date),
    )?;

    let goals = resolve_goals(profile.as_ref(), defaults);
    let nutrition = daily_nutrition(&day_meals, goals.calories).as_summary();
    let scores = daily_insight_scores(
        sleep.as_ref(),
        nutrition.as_ref(),
        activity.as_ref(),
        water_ml,
        goals.hydration_ml,
    );
    debug!(%user_id, %date, ?scores, "insight scores computed");

    repo::upsert_scores(db, user_id, date, &scores).await?;
    Ok(scores)
}

#[derive(Debug, Clone, Serialize)]
pub struct EnergyReport {
    pub breakdown: TdeeBreakdown,
    pub tdee: f64,
    pub calories_consumed: f64,
    /// Consumed minus expended; negative is a deficit.
    pub balance: f64,
}

pub fn energy_report(breakdown: TdeeBreakdown, calories_consumed: f64) -> EnergyReport {
    let tdee = breakdown.total();
    EnergyReport {
        breakdown,
        tdee,
        calories_consumed,
        balance: calories_consumed - tdee,
    }
}

pub async fn energy_for_day(
    db: &PgPool,
    defaults: &GoalDefaults,
    user_id: Uuid,
    date: Date,
) -> anyhow::Result<EnergyReport> {
    let (profile, day_meals, activity) = tokio::try_join!(
        repo::get_profile(db, user_id),
        meals::repo::list_by_date(db, user_id, date),
        repo::get_activity(db, user_id, date),
    )?;

    let consumed = daily_nutrition(&day_meals, defaults.calories).totals.calories;
    let body = profile.map(|p| p.body).unwrap_or_default();
    let breakdown = tdee_breakdown(&body, date, activity.as_ref(), consumed);
    Ok(energy_report(breakdown, consumed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample(category: &str, start: OffsetDateTime, end: OffsetDateTime) -> HealthSleepSample {
        HealthSleepSample {
            category: category.into(),
            start,
            end,
        }
    }

    #[test]
    fn samples_map_to_stages() {
        let t0 = datetime!(2024-03-01 23:00 UTC);
        let t1 = datetime!(2024-03-02 00:30 UTC);
        let t2 = datetime!(2024-03-02 01:15 UTC);
        let stages = stages_from_samples(&[
            sample("inBed", t0, t2),
            sample("asleepCore", t0, t1),
            sample("asleepDeep", t1, t2),
            sample("asleepREM", t2, t2),
        ]);
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].stage, SleepStage::Light);
        assert_eq!(stages[0].duration_minutes, 90.0);
        assert_eq!(stages[1].stage, SleepStage::Deep);
        assert_eq!(stages[1].duration_minutes, 45.0);
    }

    #[test]
    fn goals_fall_back_to_defaults() {
        let defaults = GoalDefaults {
            hydration_ml: 2500.0,
            calories: 2000.0,
        };
        assert_eq!(
            resolve_goals(None, &defaults),
            Goals {
                calories: 2000.0,
                hydration_ml: 2500.0
            }
        );

        let profile = UserProfile {
            calorie_goal: Some(2400.0),
            hydration_goal_ml: Some(0.0),
            ..Default::default()
        };
        let goals = resolve_goals(Some(&profile), &defaults);
        assert_eq!(goals.calories, 2400.0);
        assert_eq!(goals.hydration_ml, 2500.0);
    }

    #[test]
    fn energy_balance_is_consumed_minus_tdee() {
        let report = energy_report(
            TdeeBreakdown {
                bmr: 1700.0,
                neat: 200.0,
                tef: 180.0,
                eat: 120.0,
            },
            1800.0,
        );
        assert_eq!(report.tdee, 2200.0);
        assert_eq!(report.balance, -400.0);
    }
}
