use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::macros::MacroProfile;
use super::product::FoodProduct;
use super::serving::ServingUnit;

pub enum InsertOutcome {
    Inserted(FoodProduct),
    /// Another row already owns the barcode.
    BarcodeTaken,
}

/// Persistence for the shared food catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_by_barcode(&self, barcode: &str) -> anyhow::Result<Option<FoodProduct>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<FoodProduct>>;
    async fn insert(&self, product: &FoodProduct) -> anyhow::Result<InsertOutcome>;
    /// Public entries plus the user's own custom foods, matching `query` by name or brand.
    async fn search(
        &self,
        query: &str,
        user_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<FoodProduct>>;
}

#[derive(Debug, Clone, FromRow)]
pub struct FoodCatalogRow {
    pub id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub barcode: Option<String>,
    pub serving_amount: f64,
    pub serving_unit: String,
    pub serving_description: String,
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
    pub vitamin_a_pct: Option<f64>,
    pub vitamin_c_pct: Option<f64>,
    pub calcium_pct: Option<f64>,
    pub iron_pct: Option<f64>,
    pub is_custom: bool,
    pub owner_id: Option<Uuid>,
    pub image_url: Option<String>,
}

impl From<FoodCatalogRow> for FoodProduct {
    fn from(r: FoodCatalogRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            brand: r.brand,
            barcode: r.barcode,
            serving_amount: r.serving_amount,
            serving_unit: ServingUnit::from_code(&r.serving_unit).unwrap_or(ServingUnit::Grams),
            serving_description: r.serving_description,
            macros: MacroProfile {
                calories: r.calories,
                protein_g: r.protein_g,
                carbs_g: r.carbs_g,
                fat_g: r.fat_g,
                fiber_g: r.fiber_g,
                sugar_g: r.sugar_g,
                sodium_mg: r.sodium_mg,
                cholesterol_mg: r.cholesterol_mg,
                saturated_fat_g: r.saturated_fat_g,
                trans_fat_g: r.trans_fat_g,
                potassium_mg: r.potassium_mg,
                vitamin_a_pct: r.vitamin_a_pct,
                vitamin_c_pct: r.vitamin_c_pct,
                calcium_pct: r.calcium_pct,
                iron_pct: r.iron_pct,
            },
            is_custom: r.is_custom,
            owner_id: r.owner_id,
            image_url: r.image_url,
        }
    }
}

/// Escapes `ILIKE` wildcards so user text only matches literally.
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

const CATALOG_COLUMNS: &str = r#"
    id, name, brand, barcode, serving_amount, serving_unit, serving_description,
    calories, protein_g, carbs_g, fat_g, fiber_g, sugar_g, sodium_mg, cholesterol_mg,
    saturated_fat_g, trans_fat_g, potassium_mg, vitamin_a_pct, vitamin_c_pct,
    calcium_pct, iron_pct, is_custom, owner_id, image_url
"#;

#[derive(Clone)]
pub struct PgCatalogStore {
    db: PgPool,
}

impl PgCatalogStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn find_by_barcode(&self, barcode: &str) -> anyhow::Result<Option<FoodProduct>> {
        let row = sqlx::query_as::<_, FoodCatalogRow>(&format!(
            "SELECT {CATALOG_COLUMNS} FROM food_catalog WHERE barcode = $1"
        ))
        .bind(barcode)
        .fetch_optional(&self.db)
        .await
        .context("select food_catalog by barcode")?;
        Ok(row.map(Into::into))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<FoodProduct>> {
        let row = sqlx::query_as::<_, FoodCatalogRow>(&format!(
            "SELECT {CATALOG_COLUMNS} FROM food_catalog WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("select food_catalog by id")?;
        Ok(row.map(Into::into))
    }

    async fn insert(&self, p: &FoodProduct) -> anyhow::Result<InsertOutcome> {
        let m = &p.macros;
        let row = sqlx::query_as::<_, FoodCatalogRow>(&format!(
            r#"
            INSERT INTO food_catalog (
                id, name, brand, barcode, serving_amount, serving_unit, serving_description,
                calories, protein_g, carbs_g, fat_g, fiber_g, sugar_g, sodium_mg, cholesterol_mg,
                saturated_fat_g, trans_fat_g, potassium_mg, vitamin_a_pct, vitamin_c_pct,
                calcium_pct, iron_pct, is_custom, owner_id, image_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23, $24, $25)
            ON CONFLICT DO NOTHING
            RETURNING {CATALOG_COLUMNS}
            "#
        ))
        .bind(p.id)
        .bind(&p.name)
        .bind(&p.brand)
        .bind(p.barcode_key())
        .bind(p.serving_amount)
        .bind(p.serving_unit.as_str())
        .bind(&p.serving_description)
        .bind(m.calories)
        .bind(m.protein_g)
        .bind(m.carbs_g)
        .bind(m.fat_g)
        .bind(m.fiber_g)
        .bind(m.sugar_g)
        .bind(m.sodium_mg)
        .bind(m.cholesterol_mg)
        .bind(m.saturated_fat_g)
        .bind(m.trans_fat_g)
        .bind(m.potassium_mg)
        .bind(m.vitamin_a_pct)
        .bind(m.vitamin_c_pct)
        .bind(m.calcium_pct)
        .bind(m.iron_pct)
        .bind(p.is_custom)
        .bind(p.owner_id)
        .bind(&p.image_url)
        .fetch_optional(&self.db)
        .await
        .context("insert food_catalog")?;

        Ok(match row {
            Some(row) => InsertOutcome::Inserted(row.into()),
            None => InsertOutcome::BarcodeTaken,
        })
    }

    async fn search(
        &self,
        query: &str,
        user_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<FoodProduct>> {
        let pattern = format!("%{}%", escape_like(query.trim()));
        let rows = sqlx::query_as::<_, FoodCatalogRow>(&format!(
            r#"
            SELECT {CATALOG_COLUMNS}
            FROM food_catalog
            WHERE (name ILIKE $1 ESCAPE '\' OR brand ILIKE $1 ESCAPE '\')
              AND (owner_id IS NULL OR owner_id = $2)
            ORDER BY is_custom DESC, name ASC, created_at ASC
            LIMIT $3
            "#
        ))
        .bind(pattern)
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .context("search food_catalog")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
