use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use super::product::RemoteProduct;
use crate::config::CatalogConfig;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("nutrition catalog unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),
    #[error("nutrition catalog returned HTTP {0}")]
    Status(u16),
    #[error("invalid request: {0}")]
    InvalidInput(&'static str),
}

/// EAN/UPC style codes: ASCII digits only.
pub fn is_valid_barcode(code: &str) -> bool {
    !code.is_empty() && code.len() <= 32 && code.bytes().all(|b| b.is_ascii_digit())
}

/// Read-only access to the public nutrition database.
#[async_trait]
pub trait NutritionCatalog: Send + Sync {
    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<RemoteProduct>, CatalogError>;

    /// `Ok(None)` when the barcode is unknown.
    async fn lookup_barcode(&self, barcode: &str) -> Result<Option<RemoteProduct>, CatalogError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    products: Vec<RemoteProduct>,
}

#[derive(Debug, Deserialize)]
struct BarcodeResponse {
    #[serde(default)]
    status: i64,
    product: Option<RemoteProduct>,
}

/// Open Food Facts HTTP client.
#[derive(Clone)]
pub struct OpenFoodFactsClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenFoodFactsClient {
    pub fn new(config: &CatalogConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl NutritionCatalog for OpenFoodFactsClient {
    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<RemoteProduct>, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CatalogError::InvalidInput("search query cannot be empty"));
        }

        let url = format!("{}/cgi/search.pl", self.base_url);
        let page = page.max(1).to_string();
        let page_size = page_size.clamp(1, 100).to_string();
        let response = self
            .http
            .get(&url)
            .query(&[
                ("search_terms", query),
                ("search_simple", "1"),
                ("action", "process"),
                ("json", "1"),
                ("page", page.as_str()),
                ("page_size", page_size.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status().as_u16()));
        }

        let body: SearchResponse = response.json().await?;
        debug!(count = body.products.len(), "catalog search returned");
        Ok(body.products)
    }

    #[instrument(skip(self))]
    async fn lookup_barcode(&self, barcode: &str) -> Result<Option<RemoteProduct>, CatalogError> {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            return Ok(None);
        }
        if !is_valid_barcode(barcode) {
            return Err(CatalogError::InvalidInput("barcode must be digits"));
        }

        let url = format!("{}/api/v0/product/{}.json", self.base_url, barcode);
        let response = self.http.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status().as_u16()));
        }

        let body: BarcodeResponse = response.json().await?;
        if body.status != 1 {
            return Ok(None);
        }
        Ok(body.product.map(|mut p| {
            if p.code.as_deref().map_or(true, |c| c.trim().is_empty()) {
                p.code = Some(barcode.to_string());
            }
            p
        }))
    }
}
