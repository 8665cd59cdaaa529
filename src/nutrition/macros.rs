use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Nutrient quantities for one serving.
///
/// Mass fields are grams unless the name says otherwise; the optional
/// vitamin and mineral fields are percent of daily value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroProfile {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
    pub cholesterol_mg: f64,
    pub saturated_fat_g: f64,
    pub trans_fat_g: f64,
    pub potassium_mg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vitamin_a_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vitamin_c_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calcium_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iron_pct: Option<f64>,
}

fn add_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
    }
}

impl MacroProfile {
    /// Multiplies every field by `multiplier`. Anything that is not a
    /// positive finite number yields the empty profile.
    pub fn scaled(&self, multiplier: f64) -> Self {
        if !(multiplier.is_finite() && multiplier > 0.0) {
            return Self::default();
        }
        let m = |v: f64| v * multiplier;
        Self {
            calories: m(self.calories),
            protein_g: m(self.protein_g),
            carbs_g: m(self.carbs_g),
            fat_g: m(self.fat_g),
            fiber_g: m(self.fiber_g),
            sugar_g: m(self.sugar_g),
            sodium_mg: m(self.sodium_mg),
            cholesterol_mg: m(self.cholesterol_mg),
            saturated_fat_g: m(self.saturated_fat_g),
            trans_fat_g: m(self.trans_fat_g),
            potassium_mg: m(self.potassium_mg),
            vitamin_a_pct: self.vitamin_a_pct.map(m),
            vitamin_c_pct: self.vitamin_c_pct.map(m),
            calcium_pct: self.calcium_pct.map(m),
            iron_pct: self.iron_pct.map(m),
        }
    }

    /// Replaces negative or non-finite values with zero.
    pub fn sanitized(self) -> Self {
        let s = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        Self {
            calories: s(self.calories),
            protein_g: s(self.protein_g),
            carbs_g: s(self.carbs_g),
            fat_g: s(self.fat_g),
            fiber_g: s(self.fiber_g),
            sugar_g: s(self.sugar_g),
            sodium_mg: s(self.sodium_mg),
            cholesterol_mg: s(self.cholesterol_mg),
            saturated_fat_g: s(self.saturated_fat_g),
            trans_fat_g: s(self.trans_fat_g),
            potassium_mg: s(self.potassium_mg),
            vitamin_a_pct: self.vitamin_a_pct.map(s),
            vitamin_c_pct: self.vitamin_c_pct.map(s),
            calcium_pct: self.calcium_pct.map(s),
            iron_pct: self.iron_pct.map(s),
        }
    }
}

impl Add for MacroProfile {
    type Output = MacroProfile;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            calories: self.calories + rhs.calories,
            protein_g: self.protein_g + rhs.protein_g,
            carbs_g: self.carbs_g + rhs.carbs_g,
            fat_g: self.fat_g + rhs.fat_g,
            fiber_g: self.fiber_g + rhs.fiber_g,
            sugar_g: self.sugar_g + rhs.sugar_g,
            sodium_mg: self.sodium_mg + rhs.sodium_mg,
            cholesterol_mg: self.cholesterol_mg + rhs.cholesterol_mg,
            saturated_fat_g: self.saturated_fat_g + rhs.saturated_fat_g,
            trans_fat_g: self.trans_fat_g + rhs.trans_fat_g,
            potassium_mg: self.potassium_mg + rhs.potassium_mg,
            vitamin_a_pct: add_opt(self.vitamin_a_pct, rhs.vitamin_a_pct),
            vitamin_c_pct: add_opt(self.vitamin_c_pct, rhs.vitamin_c_pct),
            calcium_pct: add_opt(self.calcium_pct, rhs.calcium_pct),
            iron_pct: add_opt(self.iron_pct, rhs.iron_pct),
        }
    }
}

impl AddAssign for MacroProfile {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for MacroProfile {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MacroProfile {
        MacroProfile {
            calories: 200.0,
            protein_g: 10.0,
            carbs_g: 30.0,
            fat_g: 5.0,
            fiber_g: 3.0,
            sugar_g: 12.0,
            sodium_mg: 150.0,
            cholesterol_mg: 20.0,
            saturated_fat_g: 1.5,
            trans_fat_g: 0.0,
            potassium_mg: 300.0,
            vitamin_c_pct: Some(10.0),
            ..Default::default()
        }
    }

    #[test]
    fn scaling_by_one_is_identity() {
        assert_eq!(sample().scaled(1.0), sample());
    }

    #[test]
    fn scaling_multiplies_optional_fields_only_when_present() {
        let m = sample().scaled(2.5);
        assert_eq!(m.calories, 500.0);
        assert_eq!(m.sodium_mg, 375.0);
        assert_eq!(m.vitamin_c_pct, Some(25.0));
        assert_eq!(m.iron_pct, None);
    }

    #[test]
    fn non_positive_multiplier_yields_empty_profile() {
        assert_eq!(sample().scaled(0.0), MacroProfile::default());
        assert_eq!(sample().scaled(-1.0), MacroProfile::default());
        assert_eq!(sample().scaled(f64::NAN), MacroProfile::default());
    }

    #[test]
    fn addition_is_order_independent() {
        let a = sample();
        let b = MacroProfile {
            calories: 50.0,
            iron_pct: Some(4.0),
            ..Default::default()
        };
        assert_eq!(a + b, b + a);
        let total: MacroProfile = vec![a, b, a].into_iter().sum();
        assert_eq!(total.calories, 450.0);
        assert_eq!(total.iron_pct, Some(4.0));
        assert_eq!(total.vitamin_c_pct, Some(20.0));
    }

    #[test]
    fn sanitize_clears_negative_values() {
        let m = MacroProfile {
            calories: -5.0,
            fat_g: f64::INFINITY,
            calcium_pct: Some(-1.0),
            protein_g: 3.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(m.calories, 0.0);
        assert_eq!(m.fat_g, 0.0);
        assert_eq!(m.calcium_pct, Some(0.0));
        assert_eq!(m.protein_g, 3.0);
    }
}
