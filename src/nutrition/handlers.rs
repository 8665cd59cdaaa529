use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::catalog_client::is_valid_barcode;
use super::dto::{
    BarcodeLookupResponse, CreateFoodRequest, FoodSearchQuery, FoodSearchResponse, LookupSource,
};
use super::product::FoodProduct;
use super::serving::serving_with_fallback;
use super::services::{lookup_barcode, resolve_or_create_catalog_entry, search_foods, BarcodeLookup};
use crate::{auth::AuthUser, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/foods", post(create_food))
        .route("/foods/search", get(search))
        .route("/foods/barcode/:code", get(barcode))
        .route("/foods/:id", get(get_food))
}

#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<FoodSearchQuery>,
) -> Result<Json<FoodSearchResponse>, (StatusCode, String)> {
    let query = q.q.trim().to_string();
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "q is required".into()));
    }
    let page = q.page.max(1);
    let page_size = state.config.catalog.page_size;

    let catalog = state.catalog.clone();
    let foods = state.foods.clone();
    let search_query = query.clone();
    let debouncer = state.debouncers.for_user(user_id);
    let outcome = debouncer
        .run(async move {
            search_foods(
                catalog.as_ref(),
                foods.as_ref(),
                user_id,
                &search_query,
                page,
                page_size,
            )
            .await
        })
        .await;

    let (items, superseded) = match outcome {
        Some(Ok(items)) => (items, false),
        Some(Err(e)) => {
            error!(error = %e, %user_id, "food search failed");
            return Err(internal(e));
        }
        None => (Vec::new(), true),
    };

    Ok(Json(FoodSearchResponse {
        query,
        page,
        items,
        superseded,
    }))
}

#[instrument(skip(state))]
pub async fn barcode(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(code): Path<String>,
) -> Result<Json<BarcodeLookupResponse>, (StatusCode, String)> {
    if !is_valid_barcode(code.trim()) {
        return Err((StatusCode::BAD_REQUEST, "barcode must be digits".into()));
    }
    let found = lookup_barcode(state.catalog.as_ref(), state.foods.as_ref(), &code)
        .await
        .map_err(internal)?;

    match found {
        BarcodeLookup::Remote(product) => Ok(Json(BarcodeLookupResponse {
            source: LookupSource::Remote,
            product,
        })),
        BarcodeLookup::Local(product) => Ok(Json(BarcodeLookupResponse {
            source: LookupSource::Local,
            product,
        })),
        BarcodeLookup::NotFound => {
            info!(%code, "barcode not found");
            Err((
                StatusCode::NOT_FOUND,
                "Product not found, try searching by name".into(),
            ))
        }
    }
}

#[instrument(skip(state, body))]
pub async fn create_food(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateFoodRequest>,
) -> Result<(StatusCode, HeaderMap, Json<FoodProduct>), (StatusCode, String)> {
    let name = body.name.trim().to_string();
    if name.is_empty() {
        warn!(%user_id, "custom food without name");
        return Err((StatusCode::BAD_REQUEST, "name is required".into()));
    }

    let (parsed_amount, parsed_unit) = serving_with_fallback(&body.serving_description);
    let serving_amount = body.serving_amount.unwrap_or(parsed_amount);
    if !(serving_amount.is_finite() && serving_amount > 0.0) {
        return Err((StatusCode::BAD_REQUEST, "serving_amount must be positive".into()));
    }

    let product = FoodProduct {
        id: Uuid::new_v4(),
        name,
        brand: body.brand.filter(|b| !b.trim().is_empty()),
        barcode: body.barcode,
        serving_amount,
        serving_unit: body.serving_unit.unwrap_or(parsed_unit),
        serving_description: body.serving_description,
        macros: body.macros.sanitized(),
        is_custom: true,
        owner_id: Some(user_id),
        image_url: body.image_url,
    };

    let stored = resolve_or_create_catalog_entry(state.foods.as_ref(), product, Some(user_id))
        .await
        .map_err(internal)?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/foods/{}", stored.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(stored)))
}

#[instrument(skip(state))]
pub async fn get_food(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<FoodProduct>, (StatusCode, String)> {
    match state.foods.find_by_id(id).await.map_err(internal)? {
        Some(p) if p.owner_id.map_or(true, |o| o == user_id) => Ok(Json(p)),
        _ => Err((StatusCode::NOT_FOUND, "Food not found".into())),
    }
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
