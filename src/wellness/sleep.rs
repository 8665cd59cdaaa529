use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

const TARGET_SLEEP_HOURS: f64 = 8.0;
const TARGET_DEEP_MINUTES: f64 = 90.0;
const TARGET_REM_MINUTES: f64 = 90.0;

const DURATION_WEIGHT: f64 = 40.0;
const EFFICIENCY_WEIGHT: f64 = 30.0;
const DEEP_WEIGHT: f64 = 20.0;
const REM_WEIGHT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepStage {
    Awake,
    Light,
    Rem,
    Deep,
}

impl SleepStage {
    /// Maps a platform sleep category onto the four-stage model.
    /// "In bed" samples carry no stage and are dropped.
    pub fn from_health_category(category: &str) -> Option<Self> {
        match category {
            "awake" => Some(SleepStage::Awake),
            "asleepCore" | "asleepUnspecified" | "asleep" => Some(SleepStage::Light),
            "asleepREM" => Some(SleepStage::Rem),
            "asleepDeep" => Some(SleepStage::Deep),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SleepStage::Awake => "awake",
            SleepStage::Light => "light",
            SleepStage::Rem => "rem",
            SleepStage::Deep => "deep",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "awake" => Some(SleepStage::Awake),
            "light" => Some(SleepStage::Light),
            "rem" => Some(SleepStage::Rem),
            "deep" => Some(SleepStage::Deep),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSegment {
    pub stage: SleepStage,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    pub duration_minutes: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SleepVitals {
    pub avg_heart_rate: Option<f64>,
    pub hrv_ms: Option<f64>,
    pub spo2_pct: Option<f64>,
    pub respiratory_rate: Option<f64>,
}

#[derive(Debug, Error, PartialEq)]
pub enum SleepError {
    #[error("sleep must end after it starts")]
    EndNotAfterStart,
}

/// One night of sleep. Segments are kept in start order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySleepRecord {
    #[serde(with = "time::serde::rfc3339")]
    start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    end: OffsetDateTime,
    stages: Vec<StageSegment>,
    pub vitals: SleepVitals,
    /// Score supplied by the device vendor; wins over the computed one.
    pub external_score: Option<i32>,
}

impl DailySleepRecord {
    pub fn new(
        start: OffsetDateTime,
        end: OffsetDateTime,
        mut stages: Vec<StageSegment>,
    ) -> Result<Self, SleepError> {
        if end <= start {
            return Err(SleepError::EndNotAfterStart);
        }
        for s in &mut stages {
            if !(s.duration_minutes.is_finite() && s.duration_minutes > 0.0) {
                s.duration_minutes = 0.0;
            }
        }
        stages.sort_by_key(|s| s.start);
        Ok(Self {
            start,
            end,
            stages,
            vitals: SleepVitals::default(),
            external_score: None,
        })
    }

    pub fn with_vitals(mut self, vitals: SleepVitals) -> Self {
        self.vitals = vitals;
        self
    }

    pub fn with_external_score(mut self, score: Option<i32>) -> Self {
        self.external_score = score;
        self
    }

    pub fn start(&self) -> OffsetDateTime {
        self.start
    }

    pub fn end(&self) -> OffsetDateTime {
        self.end
    }

    pub fn stages(&self) -> &[StageSegment] {
        &self.stages
    }

    pub fn total_minutes(&self) -> f64 {
        (self.end - self.start).as_seconds_f64() / 60.0
    }

    pub fn stage_minutes(&self, stage: SleepStage) -> f64 {
        self.stages
            .iter()
            .filter(|s| s.stage == stage)
            .map(|s| s.duration_minutes)
            .sum()
    }

    /// 1 - awake/total, clamped to [0, 1]; 0 for an empty window.
    pub fn efficiency(&self) -> f64 {
        let total = self.total_minutes();
        if total <= 0.0 {
            return 0.0;
        }
        (1.0 - self.stage_minutes(SleepStage::Awake) / total).clamp(0.0, 1.0)
    }

    pub fn score(&self) -> i32 {
        sleep_score(self)
    }
}

/// Vendor score when present, otherwise the weighted sum of duration,
/// efficiency, deep and REM terms, each truncated before adding.
pub fn sleep_score(record: &DailySleepRecord) -> i32 {
    if let Some(score) = record.external_score {
        return score;
    }

    let hours = record.total_minutes() / 60.0;
    let duration = ((hours / TARGET_SLEEP_HOURS).min(1.0) * DURATION_WEIGHT) as i32;
    let efficiency = (record.efficiency() * EFFICIENCY_WEIGHT) as i32;
    let deep = ((record.stage_minutes(SleepStage::Deep) / TARGET_DEEP_MINUTES).min(1.0)
        * DEEP_WEIGHT) as i32;
    let rem = ((record.stage_minutes(SleepStage::Rem) / TARGET_REM_MINUTES).min(1.0)
        * REM_WEIGHT) as i32;

    duration + efficiency + deep + rem
}
