use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use time::{OffsetDateTime, UtcOffset};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{CreateMealRequest, DateQuery, DayMeals, MealDetails, ReplaceItemsRequest};
use super::model::Meal;
use super::repo;
use super::services::{capture_items, MealServiceError};
use crate::dates::{format_iso_date, parse_iso_date};
use crate::{auth::AuthUser, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/meals", post(create_meal).get(list_meals))
        .route("/meals/:id", get(get_meal).delete(delete_meal))
        .route("/meals/:id/items", put(replace_items))
}

#[instrument(skip(state, body))]
pub async fn create_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateMealRequest>,
) -> Result<(StatusCode, HeaderMap, Json<MealDetails>), (StatusCode, String)> {
    if body.items.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "items are required".into()));
    }
    let logged_at = body.logged_at.unwrap_or_else(OffsetDateTime::now_utc);
    let meal_date = match body.date.as_deref() {
        Some(raw) => parse_iso_date(raw).ok_or_else(bad_date)?,
        None => logged_at.to_offset(UtcOffset::UTC).date(),
    };

    let items = capture_items(state.foods.as_ref(), user_id, &body.items)
        .await
        .map_err(service_error)?;

    let meal = repo::create_meal(
        &state.db,
        user_id,
        body.meal_type,
        logged_at,
        meal_date,
        body.notes.filter(|n| !n.trim().is_empty()),
        items,
    )
    .await
    .map_err(internal)?;
    info!(%user_id, meal_id = %meal.id, items = meal.items.len(), "meal logged");

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/meals/{}", meal.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(meal.into())))
}

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<DateQuery>,
) -> Result<Json<DayMeals>, (StatusCode, String)> {
    let date = parse_iso_date(&q.date).ok_or_else(bad_date)?;
    let meals = repo::list_by_date(&state.db, user_id, date)
        .await
        .map_err(internal)?;
    let totals = meals.iter().map(Meal::totals).sum();
    Ok(Json(DayMeals {
        date: format_iso_date(date),
        meals: meals.into_iter().map(MealDetails::from).collect(),
        totals,
    }))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MealDetails>, (StatusCode, String)> {
    match repo::get_meal(&state.db, user_id, id).await.map_err(internal)? {
        Some(meal) => Ok(Json(meal.into())),
        None => Err(meal_not_found()),
    }
}

#[instrument(skip(state, body))]
pub async fn replace_items(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ReplaceItemsRequest>,
) -> Result<Json<MealDetails>, (StatusCode, String)> {
    let items = capture_items(state.foods.as_ref(), user_id, &body.items)
        .await
        .map_err(service_error)?;
    match repo::replace_items(&state.db, user_id, id, items)
        .await
        .map_err(internal)?
    {
        Some(meal) => Ok(Json(meal.into())),
        None => Err(meal_not_found()),
    }
}

#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if repo::delete_meal(&state.db, user_id, id).await.map_err(internal)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(meal_not_found())
    }
}

fn service_error(e: MealServiceError) -> (StatusCode, String) {
    match e {
        MealServiceError::UnknownFood(_) => {
            warn!(error = %e, "meal references unknown food");
            (StatusCode::NOT_FOUND, e.to_string())
        }
        MealServiceError::Invalid(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        MealServiceError::Storage(e) => internal(e),
    }
}

fn meal_not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Meal not found".into())
}

fn bad_date() -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, "date must be YYYY-MM-DD".into())
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
