use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::catalog_client::NutritionCatalog;
use super::merge::merge_search_results;
use super::product::{normalize_remote_product, FoodProduct};
use super::repo::{CatalogStore, InsertOutcome};

/// Returns the catalog row for `product`'s barcode if one exists, otherwise
/// inserts `product`. The first row stored for a barcode always wins.
///
/// A barcode names a physical product, so a custom food that carries one is
/// stored as shared catalog (`owner_id = None`, still `is_custom`). Only
/// custom foods without a barcode stay private to their owner.
#[instrument(skip(store, product), fields(name = %product.name, barcode = ?product.barcode_key()))]
pub async fn resolve_or_create_catalog_entry(
    store: &dyn CatalogStore,
    mut product: FoodProduct,
    owner_id: Option<Uuid>,
) -> anyhow::Result<FoodProduct> {
    let barcode = product.barcode_key().map(str::to_string);

    if let Some(code) = barcode.as_deref() {
        if let Some(existing) = store.find_by_barcode(code).await? {
            return Ok(existing);
        }
    }

    product.is_custom = owner_id.is_some();
    product.owner_id = if barcode.is_some() { None } else { owner_id };
    product.barcode = barcode.clone();

    match store.insert(&product).await? {
        InsertOutcome::Inserted(stored) => {
            info!(id = %stored.id, "catalog entry created");
            Ok(stored)
        }
        InsertOutcome::BarcodeTaken => {
            let code = barcode.as_deref().unwrap_or_default();
            warn!(barcode = code, "concurrent insert won the barcode; using stored entry");
            match store.find_by_barcode(code).await? {
                Some(existing) => Ok(existing),
                None => anyhow::bail!("catalog insert conflicted but no entry holds barcode {code:?}"),
            }
        }
    }
}

/// Searches the local catalog and the remote one concurrently, then merges
/// local-first once both have answered. A failing remote degrades to local only.
#[instrument(skip(catalog, store))]
pub async fn search_foods(
    catalog: &dyn NutritionCatalog,
    store: &dyn CatalogStore,
    user_id: Uuid,
    query: &str,
    page: u32,
    page_size: u32,
) -> anyhow::Result<Vec<FoodProduct>> {
    let (local, remote) = tokio::join!(
        store.search(query, user_id, i64::from(page_size)),
        catalog.search(query, page, page_size),
    );

    let local = local?;
    let remote = match remote {
        Ok(records) => records
            .iter()
            .filter_map(normalize_remote_product)
            .collect(),
        Err(e) => {
            warn!(error = %e, "remote catalog search failed; returning local results");
            Vec::new()
        }
    };

    Ok(merge_search_results(local, remote))
}

#[derive(Debug)]
pub enum BarcodeLookup {
    /// Resolved from the remote catalog and stored (or already stored).
    Remote(FoodProduct),
    /// Remote had nothing usable; found in the local catalog.
    Local(FoodProduct),
    NotFound,
}

/// Looks a barcode up remotely, stores the result in the catalog, and falls
/// back to the local catalog when the remote has no match or is unreachable.
#[instrument(skip(catalog, store))]
pub async fn lookup_barcode(
    catalog: &dyn NutritionCatalog,
    store: &dyn CatalogStore,
    barcode: &str,
) -> anyhow::Result<BarcodeLookup> {
    let barcode = barcode.trim();
    if barcode.is_empty() {
        return Ok(BarcodeLookup::NotFound);
    }

    let remote = match catalog.lookup_barcode(barcode).await {
        Ok(found) => found.as_ref().and_then(normalize_remote_product),
        Err(e) => {
            warn!(error = %e, barcode, "remote barcode lookup failed");
            None
        }
    };

    if let Some(product) = remote {
        let stored = resolve_or_create_catalog_entry(store, product, None).await?;
        return Ok(BarcodeLookup::Remote(stored));
    }

    Ok(match store.find_by_barcode(barcode).await? {
        Some(product) => BarcodeLookup::Local(product),
        None => BarcodeLookup::NotFound,
    })
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::nutrition::catalog_client::CatalogError;
    use crate::nutrition::product::RemoteProduct;

    /// In-memory catalog that enforces barcode uniqueness like the real table.
    #[derive(Default)]
    pub struct MemoryStore {
        pub rows: Mutex<Vec<FoodProduct>>,
        /// Row slipped in right before the next insert, simulating a race.
        pub racer: Mutex<Option<FoodProduct>>,
    }

    #[async_trait]
    impl CatalogStore for MemoryStore {
        async fn find_by_barcode(&self, barcode: &str) -> anyhow::Result<Option<FoodProduct>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().find(|p| p.barcode_key() == Some(barcode)).cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<FoodProduct>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().find(|p| p.id == id).cloned())
        }

        async fn insert(&self, product: &FoodProduct) -> anyhow::Result<InsertOutcome> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(racer) = self.racer.lock().unwrap().take() {
                rows.push(racer);
            }
            if let Some(code) = product.barcode_key() {
                if rows.iter().any(|p| p.barcode_key() == Some(code)) {
                    return Ok(InsertOutcome::BarcodeTaken);
                }
            }
            rows.push(product.clone());
            Ok(InsertOutcome::Inserted(product.clone()))
        }

        async fn search(
            &self,
            query: &str,
            user_id: Uuid,
            limit: i64,
        ) -> anyhow::Result<Vec<FoodProduct>> {
            let q = query.to_lowercase();
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .filter(|p| p.owner_id.map_or(true, |o| o == user_id))
                .filter(|p| p.name.to_lowercase().contains(&q))
                .take(limit as usize)
                .cloned()
                .collect())
        }
    }

    pub enum FakeCatalog {
        Products(Vec<RemoteProduct>),
        Down,
    }

    #[async_trait]
    impl NutritionCatalog for FakeCatalog {
        async fn search(
            &self,
            _query: &str,
            _page: u32,
            _page_size: u32,
        ) -> Result<Vec<RemoteProduct>, CatalogError> {
            match self {
                FakeCatalog::Products(p) => Ok(p.clone()),
                FakeCatalog::Down => Err(CatalogError::Status(503)),
            }
        }

        async fn lookup_barcode(
            &self,
            barcode: &str,
        ) -> Result<Option<RemoteProduct>, CatalogError> {
            match self {
                FakeCatalog::Products(p) => Ok(p
                    .iter()
                    .find(|r| r.code.as_deref() == Some(barcode))
                    .cloned()),
                FakeCatalog::Down => Err(CatalogError::Status(503)),
            }
        }
    }

    pub fn remote(code: Option<&str>, name: &str) -> RemoteProduct {
        serde_json::from_value(serde_json::json!({
            "code": code,
            "product_name": name,
            "serving_size": "30 g",
            "nutriments": { "energy-kcal_100g": 400, "proteins_100g": 10 }
        }))
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::{remote, FakeCatalog, MemoryStore};
    use super::*;
    use crate::nutrition::macros::MacroProfile;
    use crate::nutrition::serving::ServingUnit;

    fn custom(name: &str, barcode: Option<&str>, calories: f64) -> FoodProduct {
        FoodProduct {
            id: Uuid::new_v4(),
            name: name.into(),
            brand: None,
            barcode: barcode.map(Into::into),
            serving_amount: 1.0,
            serving_unit: ServingUnit::Grams,
            serving_description: "1 bar".into(),
            macros: MacroProfile {
                calories,
                ..Default::default()
            },
            is_custom: false,
            owner_id: None,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn resolve_is_idempotent_for_shared_barcode() {
        let store = MemoryStore::default();
        let first = resolve_or_create_catalog_entry(&store, custom("Bar", Some("123"), 200.0), None)
            .await
            .unwrap();
        let second =
            resolve_or_create_catalog_entry(&store, custom("Bar v2", Some("123"), 999.0), None)
                .await
                .unwrap();
        assert_eq!(first, second);
        assert_eq!(second.macros.calories, 200.0);
        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn owner_marks_entry_custom() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();
        let stored = resolve_or_create_catalog_entry(&store, custom("Shake", None, 150.0), Some(owner))
            .await
            .unwrap();
        assert!(stored.is_custom);
        assert_eq!(stored.owner_id, Some(owner));
    }

    #[tokio::test]
    async fn barcoded_custom_food_is_shared_catalog() {
        let store = MemoryStore::default();
        let alice = Uuid::new_v4();
        let stored =
            resolve_or_create_catalog_entry(&store, custom("Shake", Some("123"), 150.0), Some(alice))
                .await
                .unwrap();
        assert!(stored.is_custom);
        assert_eq!(stored.owner_id, None);
    }

    #[tokio::test]
    async fn scanned_custom_food_can_be_logged_by_another_user() {
        use crate::meals::dto::MealItemRequest;
        use crate::meals::services::capture_items;

        let store = MemoryStore::default();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        resolve_or_create_catalog_entry(&store, custom("Alice shake", Some("123"), 150.0), Some(alice))
            .await
            .unwrap();

        let BarcodeLookup::Local(seen) = lookup_barcode(&FakeCatalog::Down, &store, "123")
            .await
            .unwrap()
        else {
            panic!("expected a local hit");
        };
        let items = capture_items(
            &store,
            bob,
            &[MealItemRequest {
                food_id: seen.id,
                serving_multiplier: 1.0,
                serving_size_override: None,
            }],
        )
        .await
        .unwrap();
        assert_eq!(items[0].name, "Alice shake");
    }

    #[tokio::test]
    async fn products_without_barcode_always_insert() {
        let store = MemoryStore::default();
        resolve_or_create_catalog_entry(&store, custom("A", None, 1.0), None).await.unwrap();
        resolve_or_create_catalog_entry(&store, custom("A", Some(" "), 1.0), None).await.unwrap();
        assert_eq!(store.rows.lock().unwrap().len(), 2);
        assert!(store.rows.lock().unwrap().iter().all(|p| p.barcode.is_none()));
    }

    #[tokio::test]
    async fn losing_an_insert_race_returns_the_winner() {
        let store = MemoryStore::default();
        let winner = custom("Winner", Some("777"), 10.0);
        *store.racer.lock().unwrap() = Some(winner.clone());
        let got = resolve_or_create_catalog_entry(&store, custom("Loser", Some("777"), 20.0), None)
            .await
            .unwrap();
        assert_eq!(got, winner);
        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn search_merges_local_before_remote() {
        let store = MemoryStore::default();
        let user = Uuid::new_v4();
        store.rows.lock().unwrap().push(custom("granola local", Some("1"), 1.0));
        let catalog = FakeCatalog::Products(vec![
            remote(Some("1"), "granola remote dup"),
            remote(Some("2"), "granola remote"),
            remote(None, ""),
        ]);
        let results = search_foods(&catalog, &store, user, "granola", 1, 20).await.unwrap();
        let names: Vec<_> = results.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["granola local", "granola remote"]);
    }

    #[tokio::test]
    async fn search_survives_remote_outage() {
        let store = MemoryStore::default();
        store.rows.lock().unwrap().push(custom("rice", None, 1.0));
        let results = search_foods(&FakeCatalog::Down, &store, Uuid::new_v4(), "rice", 1, 20)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn barcode_lookup_stores_remote_product_once() {
        let store = MemoryStore::default();
        let catalog = FakeCatalog::Products(vec![remote(Some("555"), "Crackers")]);
        let first = lookup_barcode(&catalog, &store, "555").await.unwrap();
        let second = lookup_barcode(&catalog, &store, "555").await.unwrap();
        let (BarcodeLookup::Remote(a), BarcodeLookup::Remote(b)) = (first, second) else {
            panic!("expected remote hits");
        };
        assert_eq!(a.id, b.id);
        assert!((a.macros.calories - 120.0).abs() < 1e-9);
        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn barcode_lookup_falls_back_to_local_when_remote_is_down() {
        let store = MemoryStore::default();
        store.rows.lock().unwrap().push(custom("Cached", Some("888"), 5.0));
        let found = lookup_barcode(&FakeCatalog::Down, &store, "888").await.unwrap();
        assert!(matches!(found, BarcodeLookup::Local(p) if p.name == "Cached"));

        let missing = lookup_barcode(&FakeCatalog::Down, &store, "999").await.unwrap();
        assert!(matches!(missing, BarcodeLookup::NotFound));
    }
}
