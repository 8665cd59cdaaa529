use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::energy::Sex;
use super::insights::DailyInsightScores;
use super::labels::{score_label, ScoreLabel};
use super::services::{EnergyReport, HealthSleepSample};
use super::sleep::{DailySleepRecord, SleepVitals};

#[derive(Debug, Deserialize)]
pub struct SleepSampleDto {
    pub category: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
}

impl From<SleepSampleDto> for HealthSleepSample {
    fn from(s: SleepSampleDto) -> Self {
        Self {
            category: s.category,
            start: s.start,
            end: s.end,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SleepUploadRequest {
    /// Day the night counts toward; defaults to the UTC date of `end`.
    pub date: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
    #[serde(default)]
    pub samples: Vec<SleepSampleDto>,
    #[serde(default)]
    pub vitals: SleepVitals,
    pub external_score: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct SleepResponse {
    pub date: String,
    pub record: DailySleepRecord,
    pub total_minutes: f64,
    pub efficiency: f64,
    pub score: i32,
    pub label: ScoreLabel,
}

#[derive(Debug, Deserialize)]
pub struct WaterRequest {
    pub amount_ml: f64,
    pub date: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub logged_at: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize)]
pub struct WaterTotalResponse {
    pub date: String,
    pub total_ml: f64,
    pub goal_ml: f64,
}

#[derive(Debug, Deserialize)]
pub struct WeightRequest {
    pub weight_kg: f64,
    pub date: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub logged_at: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileBody {
    #[serde(default)]
    pub sex: Sex,
    /// YYYY-MM-DD
    pub date_of_birth: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub calorie_goal: Option<f64>,
    pub hydration_goal_ml: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct InsightLabels {
    pub recovery: ScoreLabel,
    pub stress: ScoreLabel,
    pub strain: ScoreLabel,
    pub readiness: ScoreLabel,
    pub sleep: ScoreLabel,
    pub nutrition: ScoreLabel,
    pub hydration: ScoreLabel,
}

#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    pub date: String,
    pub scores: DailyInsightScores,
    pub labels: InsightLabels,
    pub overall_wellness: i32,
    pub overall_label: ScoreLabel,
}

impl InsightsResponse {
    pub fn new(date: String, scores: DailyInsightScores) -> Self {
        Self {
            date,
            labels: InsightLabels {
                recovery: score_label(scores.recovery),
                stress: score_label(scores.stress),
                strain: score_label(scores.strain),
                readiness: score_label(scores.readiness),
                sleep: score_label(scores.sleep),
                nutrition: score_label(scores.nutrition),
                hydration: score_label(scores.hydration),
            },
            overall_wellness: scores.overall_wellness(),
            overall_label: scores.overall_label(),
            scores,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnergyResponse {
    pub date: String,
    #[serde(flatten)]
    pub report: EnergyReport,
}
