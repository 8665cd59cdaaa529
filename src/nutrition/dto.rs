use serde::{Deserialize, Serialize};

use super::macros::MacroProfile;
use super::product::FoodProduct;
use super::serving::ServingUnit;

#[derive(Debug, Deserialize)]
pub struct FoodSearchQuery {
    pub q: String,
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_page() -> u32 {
    1
}

#[derive(Debug, Serialize)]
pub struct FoodSearchResponse {
    pub query: String,
    pub page: u32,
    pub items: Vec<FoodProduct>,
    /// Set when a newer search from the same user replaced this one.
    pub superseded: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupSource {
    Remote,
    Local,
}

#[derive(Debug, Serialize)]
pub struct BarcodeLookupResponse {
    pub source: LookupSource,
    pub product: FoodProduct,
}

#[derive(Debug, Deserialize)]
pub struct CreateFoodRequest {
    pub name: String,
    pub brand: Option<String>,
    pub barcode: Option<String>,
    pub serving_description: String,
    /// Overrides the amount parsed from `serving_description`.
    pub serving_amount: Option<f64>,
    pub serving_unit: Option<ServingUnit>,
    #[serde(default)]
    pub macros: MacroProfile,
    pub image_url: Option<String>,
}
