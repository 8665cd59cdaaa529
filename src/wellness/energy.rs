use serde::{Deserialize, Serialize};
use time::Date;

use super::insights::ActivitySummary;

const NEAT_KCAL_PER_STEP: f64 = 0.04;
const TEF_FRACTION: f64 = 0.10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    #[default]
    Unspecified,
}

impl Sex {
    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::Unspecified => "unspecified",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "male" => Sex::Male,
            "female" => Sex::Female,
            _ => Sex::Unspecified,
        }
    }
}

/// Body measurements needed for energy estimates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyProfile {
    pub sex: Sex,
    pub date_of_birth: Option<Date>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
}

impl BodyProfile {
    /// Whole years completed on `on`, or `None` without a birth date.
    pub fn age_on(&self, on: Date) -> Option<i32> {
        let dob = self.date_of_birth?;
        let mut age = on.year() - dob.year();
        if (u8::from(on.month()), on.day()) < (u8::from(dob.month()), dob.day()) {
            age -= 1;
        }
        Some(age.max(0))
    }
}

/// Mifflin-St Jeor resting energy. Only male uses the +5 constant; 0 when
/// birth date, height or weight is unknown.
pub fn bmr(profile: &BodyProfile, on: Date) -> f64 {
    let (Some(age), Some(height), Some(weight)) =
        (profile.age_on(on), profile.height_cm, profile.weight_kg)
    else {
        return 0.0;
    };
    let base = 10.0 * weight + 6.25 * height - 5.0 * f64::from(age);
    match profile.sex {
        Sex::Male => base + 5.0,
        Sex::Female | Sex::Unspecified => base - 161.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TdeeBreakdown {
    pub bmr: f64,
    pub neat: f64,
    pub tef: f64,
    pub eat: f64,
}

impl TdeeBreakdown {
    pub fn total(&self) -> f64 {
        self.bmr + self.neat + self.tef + self.eat
    }
}

pub fn tdee_breakdown(
    profile: &BodyProfile,
    on: Date,
    activity: Option<&ActivitySummary>,
    calories_consumed: f64,
) -> TdeeBreakdown {
    let steps = activity.map_or(0, |a| a.steps.max(0));
    TdeeBreakdown {
        bmr: bmr(profile, on),
        neat: steps as f64 * NEAT_KCAL_PER_STEP,
        tef: calories_consumed.max(0.0) * TEF_FRACTION,
        eat: activity.map_or(0.0, |a| a.active_calories.max(0.0)),
    }
}
