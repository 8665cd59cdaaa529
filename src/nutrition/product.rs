use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::macros::MacroProfile;
use super::serving::{parse_serving_descriptor, serving_with_fallback, ServingUnit};

/// A food as stored in the shared catalog or authored by a user.
/// `macros` are per one serving of `serving_amount` `serving_unit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodProduct {
    pub id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub barcode: Option<String>,
    pub serving_amount: f64,
    pub serving_unit: ServingUnit,
    pub serving_description: String,
    pub macros: MacroProfile,
    pub is_custom: bool,
    pub owner_id: Option<Uuid>,
    pub image_url: Option<String>,
}

impl FoodProduct {
    /// Barcode used for identity. Blank barcodes identify nothing.
    pub fn barcode_key(&self) -> Option<&str> {
        self.barcode
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    })
}

/// Nutrient block of an Open Food Facts product. Values are per 100 g/ml;
/// sodium, cholesterol and potassium are in grams.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteNutriments {
    #[serde(rename = "energy-kcal_100g", default, deserialize_with = "lenient_f64")]
    pub energy_kcal_100g: Option<f64>,
    #[serde(rename = "energy-kcal_serving", default, deserialize_with = "lenient_f64")]
    pub energy_kcal_serving: Option<f64>,
    #[serde(rename = "proteins_100g", default, deserialize_with = "lenient_f64")]
    pub proteins_100g: Option<f64>,
    #[serde(rename = "carbohydrates_100g", default, deserialize_with = "lenient_f64")]
    pub carbohydrates_100g: Option<f64>,
    #[serde(rename = "fat_100g", default, deserialize_with = "lenient_f64")]
    pub fat_100g: Option<f64>,
    #[serde(rename = "fiber_100g", default, deserialize_with = "lenient_f64")]
    pub fiber_100g: Option<f64>,
    #[serde(rename = "sugars_100g", default, deserialize_with = "lenient_f64")]
    pub sugars_100g: Option<f64>,
    #[serde(rename = "sodium_100g", default, deserialize_with = "lenient_f64")]
    pub sodium_100g: Option<f64>,
    #[serde(rename = "cholesterol_100g", default, deserialize_with = "lenient_f64")]
    pub cholesterol_100g: Option<f64>,
    #[serde(rename = "saturated-fat_100g", default, deserialize_with = "lenient_f64")]
    pub saturated_fat_100g: Option<f64>,
    #[serde(rename = "trans-fat_100g", default, deserialize_with = "lenient_f64")]
    pub trans_fat_100g: Option<f64>,
    #[serde(rename = "potassium_100g", default, deserialize_with = "lenient_f64")]
    pub potassium_100g: Option<f64>,
}

/// Raw product record returned by the remote catalog.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteProduct {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub brands: Option<String>,
    #[serde(default)]
    pub serving_size: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub nutriments: RemoteNutriments,
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Serving size, unit and description for a remote record.
fn effective_serving(raw: &RemoteProduct) -> (f64, ServingUnit, String) {
    let serving = non_blank(&raw.serving_size);
    let quantity = non_blank(&raw.quantity);

    let parsed = serving
        .and_then(|s| parse_serving_descriptor(s).map(|p| (p, s)))
        .or_else(|| quantity.and_then(|q| parse_serving_descriptor(q).map(|p| (p, q))));

    match parsed {
        Some(((amount, unit), text)) => (amount, unit, text.to_string()),
        None => {
            let text = serving.or(quantity).unwrap_or("");
            let (amount, unit) = serving_with_fallback(text);
            let description = if text.is_empty() {
                format!("{amount} {unit}")
            } else {
                text.to_string()
            };
            (amount, unit, description)
        }
    }
}

/// Converts a catalog record into a per-serving [`FoodProduct`].
/// Returns `None` when the record has no usable name.
pub fn normalize_remote_product(raw: &RemoteProduct) -> Option<FoodProduct> {
    let name = non_blank(&raw.product_name)?.to_string();

    let (serving_amount, serving_unit, serving_description) = effective_serving(raw);
    let scale = serving_amount / 100.0;
    let n = &raw.nutriments;
    let per_serving = |v: Option<f64>| v.unwrap_or(0.0) * scale;

    let energy_100g = n
        .energy_kcal_100g
        .or_else(|| n.energy_kcal_serving.map(|kcal| kcal / scale));

    let macros = MacroProfile {
        calories: per_serving(energy_100g),
        protein_g: per_serving(n.proteins_100g),
        carbs_g: per_serving(n.carbohydrates_100g),
        fat_g: per_serving(n.fat_100g),
        fiber_g: per_serving(n.fiber_100g),
        sugar_g: per_serving(n.sugars_100g),
        sodium_mg: per_serving(n.sodium_100g) * 1000.0,
        cholesterol_mg: per_serving(n.cholesterol_100g) * 1000.0,
        saturated_fat_g: per_serving(n.saturated_fat_100g),
        trans_fat_g: per_serving(n.trans_fat_100g),
        potassium_mg: per_serving(n.potassium_100g) * 1000.0,
        ..Default::default()
    }
    .sanitized();

    Some(FoodProduct {
        id: Uuid::new_v4(),
        name,
        brand: non_blank(&raw.brands).map(str::to_string),
        barcode: non_blank(&raw.code).map(str::to_string),
        serving_amount,
        serving_unit,
        serving_description,
        macros,
        is_custom: false,
        owner_id: None,
        image_url: non_blank(&raw.image_url).map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(serving: Option<&str>, quantity: Option<&str>) -> RemoteProduct {
        serde_json::from_value(serde_json::json!({
            "code": "3017620422003",
            "product_name": "Hazelnut spread",
            "brands": "Nutella",
            "serving_size": serving,
            "quantity": quantity,
            "nutriments": {
                "energy-kcal_100g": 539,
                "proteins_100g": 6.3,
                "carbohydrates_100g": 57.5,
                "fat_100g": 30.9,
                "sugars_100g": 56.3,
                "sodium_100g": 0.0428,
                "potassium_100g": "0.4",
                "saturated-fat_100g": 10.6
            }
        }))
        .unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn scales_per_100g_values_to_the_serving() {
        let p = normalize_remote_product(&raw(Some("15 g"), None)).unwrap();
        assert_eq!(p.serving_amount, 15.0);
        assert_eq!(p.serving_unit, ServingUnit::Grams);
        assert_eq!(p.serving_description, "15 g");
        assert!(approx(p.macros.calories, 539.0 * 0.15));
        assert!(approx(p.macros.protein_g, 6.3 * 0.15));
        assert!(!p.is_custom);
        assert_eq!(p.brand.as_deref(), Some("Nutella"));
    }

    #[test]
    fn sodium_cholesterol_and_potassium_become_milligrams() {
        let p = normalize_remote_product(&raw(Some("100 g"), None)).unwrap();
        assert!(approx(p.macros.sodium_mg, 42.8));
        assert!(approx(p.macros.potassium_mg, 400.0));
        assert_eq!(p.macros.cholesterol_mg, 0.0);
    }

    #[test]
    fn doubling_the_serving_doubles_every_macro() {
        let one = normalize_remote_product(&raw(Some("50 g"), None)).unwrap();
        let two = normalize_remote_product(&raw(Some("100 g"), None)).unwrap();
        assert!(approx(two.macros.calories, one.macros.calories * 2.0));
        assert!(approx(two.macros.fat_g, one.macros.fat_g * 2.0));
        assert!(approx(two.macros.sodium_mg, one.macros.sodium_mg * 2.0));
        assert!(approx(two.macros.saturated_fat_g, one.macros.saturated_fat_g * 2.0));
    }

    #[test]
    fn falls_back_to_quantity_then_default() {
        let p = normalize_remote_product(&raw(None, Some("400 g"))).unwrap();
        assert_eq!(p.serving_amount, 400.0);

        let p = normalize_remote_product(&raw(None, None)).unwrap();
        assert_eq!(p.serving_amount, 100.0);
        assert_eq!(p.serving_unit, ServingUnit::Grams);
        assert_eq!(p.serving_description, "100 g");
        assert!(approx(p.macros.calories, 539.0));
    }

    #[test]
    fn unparseable_serving_text_uses_default_amount() {
        let p = normalize_remote_product(&raw(Some("1 slice"), None)).unwrap();
        assert_eq!(p.serving_amount, 100.0);
        assert_eq!(p.serving_unit, ServingUnit::Millilitres);
        assert_eq!(p.serving_description, "1 slice");
    }

    #[test]
    fn energy_derived_from_per_serving_value_when_100g_missing() {
        let record: RemoteProduct = serde_json::from_value(serde_json::json!({
            "product_name": "Cola",
            "serving_size": "330 ml",
            "nutriments": { "energy-kcal_serving": 139 }
        }))
        .unwrap();
        let p = normalize_remote_product(&record).unwrap();
        assert!(approx(p.macros.calories, 139.0));
        assert_eq!(p.barcode, None);
        assert_eq!(p.macros.protein_g, 0.0);
    }

    #[test]
    fn rejects_records_without_a_name() {
        let mut record = raw(Some("15 g"), None);
        record.product_name = Some("   ".into());
        assert!(normalize_remote_product(&record).is_none());
        record.product_name = None;
        assert!(normalize_remote_product(&record).is_none());
    }

    #[test]
    fn rescaling_by_one_keeps_normalized_macros() {
        let p = normalize_remote_product(&raw(Some("30 g"), None)).unwrap();
        assert_eq!(p.macros.scaled(1.0), p.macros);
    }

    #[test]
    fn blank_barcode_has_no_identity() {
        let mut p = normalize_remote_product(&raw(Some("30 g"), None)).unwrap();
        assert_eq!(p.barcode_key(), Some("3017620422003"));
        p.barcode = Some("  ".into());
        assert_eq!(p.barcode_key(), None);
    }
}
