use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use time::{Date, OffsetDateTime, UtcOffset};
use tracing::{info, instrument, warn};

use super::dto::{
    EnergyResponse, InsightsResponse, ProfileBody, SleepResponse, SleepUploadRequest,
    WaterRequest, WaterTotalResponse, WeightRequest,
};
use super::energy::BodyProfile;
use super::insights::ActivitySummary;
use super::labels::score_label;
use super::repo::{self, UserProfile};
use super::services::{
    energy_for_day, recompute_day, resolve_goals, stages_from_samples, HealthSleepSample,
};
use super::sleep::DailySleepRecord;
use crate::dates::{format_iso_date, parse_iso_date};
use crate::{auth::AuthUser, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profile", put(put_profile).get(get_profile))
        .route("/sleep", post(upload_sleep))
        .route("/water", post(log_water))
        .route("/weight", post(log_weight))
        .route("/activity/:date", put(put_activity))
        .route("/insights/:date", get(get_insights))
        .route("/insights/:date/recompute", post(recompute_insights))
        .route("/energy/:date", get(get_energy))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileBody>, (StatusCode, String)> {
    let profile = repo::get_profile(&state.db, user_id)
        .await
        .map_err(internal)?
        .unwrap_or_default();
    Ok(Json(profile_body(&profile)))
}

#[instrument(skip(state, body))]
pub async fn put_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<ProfileBody>,
) -> Result<Json<ProfileBody>, (StatusCode, String)> {
    let date_of_birth = match body.date_of_birth.as_deref() {
        Some(raw) => Some(parse_iso_date(raw).ok_or_else(bad_date)?),
        None => None,
    };
    for (field, value) in [
        ("height_cm", body.height_cm),
        ("weight_kg", body.weight_kg),
        ("calorie_goal", body.calorie_goal),
        ("hydration_goal_ml", body.hydration_goal_ml),
    ] {
        if value.is_some_and(|v| !(v.is_finite() && v > 0.0)) {
            return Err((StatusCode::BAD_REQUEST, format!("{field} must be positive")));
        }
    }

    let profile = UserProfile {
        body: BodyProfile {
            sex: body.sex,
            date_of_birth,
            height_cm: body.height_cm,
            weight_kg: body.weight_kg,
        },
        calorie_goal: body.calorie_goal,
        hydration_goal_ml: body.hydration_goal_ml,
    };
    let stored = repo::upsert_profile(&state.db, user_id, &profile)
        .await
        .map_err(internal)?;
    Ok(Json(profile_body(&stored)))
}

#[instrument(skip(state, body))]
pub async fn upload_sleep(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<SleepUploadRequest>,
) -> Result<(StatusCode, Json<SleepResponse>), (StatusCode, String)> {
    let date = day_or(body.date.as_deref(), body.end)?;
    let samples: Vec<HealthSleepSample> = body.samples.into_iter().map(Into::into).collect();
    let stages = stages_from_samples(&samples);
    if stages.len() < samples.len() {
        info!(dropped = samples.len() - stages.len(), "sleep samples without a stage");
    }

    let record = DailySleepRecord::new(body.start, body.end, stages)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
        .with_vitals(body.vitals)
        .with_external_score(body.external_score);

    repo::save_sleep(&state.db, user_id, date, &record)
        .await
        .map_err(internal)?;

    let score = record.score();
    Ok((
        StatusCode::CREATED,
        Json(SleepResponse {
            date: format_iso_date(date),
            total_minutes: record.total_minutes(),
            efficiency: record.efficiency(),
            score,
            label: score_label(score),
            record,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn log_water(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<WaterRequest>,
) -> Result<(StatusCode, Json<WaterTotalResponse>), (StatusCode, String)> {
    if !(body.amount_ml.is_finite() && body.amount_ml > 0.0) {
        return Err((StatusCode::BAD_REQUEST, "amount_ml must be positive".into()));
    }
    let logged_at = body.logged_at.unwrap_or_else(OffsetDateTime::now_utc);
    let date = day_or(body.date.as_deref(), logged_at)?;

    repo::add_water(&state.db, user_id, date, body.amount_ml, logged_at)
        .await
        .map_err(internal)?;
    let (total_ml, profile) = tokio::try_join!(
        repo::water_total(&state.db, user_id, date),
        repo::get_profile(&state.db, user_id),
    )
    .map_err(internal)?;
    let goals = resolve_goals(profile.as_ref(), &state.config.goals);

    Ok((
        StatusCode::CREATED,
        Json(WaterTotalResponse {
            date: format_iso_date(date),
            total_ml,
            goal_ml: goals.hydration_ml,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn log_weight(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<WeightRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    if !(body.weight_kg.is_finite() && body.weight_kg > 0.0) {
        return Err((StatusCode::BAD_REQUEST, "weight_kg must be positive".into()));
    }
    let logged_at = body.logged_at.unwrap_or_else(OffsetDateTime::now_utc);
    let date = day_or(body.date.as_deref(), logged_at)?;
    repo::add_weight(&state.db, user_id, date, body.weight_kg, logged_at)
        .await
        .map_err(internal)?;
    Ok(StatusCode::CREATED)
}

#[instrument(skip(state))]
pub async fn put_activity(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(date): Path<String>,
    Json(body): Json<ActivitySummary>,
) -> Result<Json<ActivitySummary>, (StatusCode, String)> {
    let date = parse_iso_date(&date).ok_or_else(bad_date)?;
    let negative = body.steps < 0
        || [body.active_calories, body.distance_m, body.exercise_minutes]
            .iter()
            .any(|v| !(v.is_finite() && *v >= 0.0));
    if negative {
        warn!(%user_id, "rejected activity with negative totals");
        return Err((StatusCode::BAD_REQUEST, "activity totals must be non-negative".into()));
    }
    repo::upsert_activity(&state.db, user_id, date, &body)
        .await
        .map_err(internal)?;
    Ok(Json(body))
}

#[instrument(skip(state))]
pub async fn recompute_insights(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(date): Path<String>,
) -> Result<Json<InsightsResponse>, (StatusCode, String)> {
    let date = parse_iso_date(&date).ok_or_else(bad_date)?;
    let scores = recompute_day(&state.db, &state.config.goals, user_id, date)
        .await
        .map_err(internal)?;
    info!(%user_id, %date, overall = scores.overall_wellness(), "insights recomputed");
    Ok(Json(InsightsResponse::new(format_iso_date(date), scores)))
}

#[instrument(skip(state))]
pub async fn get_insights(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(date): Path<String>,
) -> Result<Json<InsightsResponse>, (StatusCode, String)> {
    let date = parse_iso_date(&date).ok_or_else(bad_date)?;
    match repo::get_scores(&state.db, user_id, date)
        .await
        .map_err(internal)?
    {
        Some(scores) => Ok(Json(InsightsResponse::new(format_iso_date(date), scores))),
        None => Err((StatusCode::NOT_FOUND, "No insights for this day yet".into())),
    }
}

#[instrument(skip(state))]
pub async fn get_energy(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(date): Path<String>,
) -> Result<Json<EnergyResponse>, (StatusCode, String)> {
    let date = parse_iso_date(&date).ok_or_else(bad_date)?;
    let report = energy_for_day(&state.db, &state.config.goals, user_id, date)
        .await
        .map_err(internal)?;
    Ok(Json(EnergyResponse {
        date: format_iso_date(date),
        report,
    }))
}

fn profile_body(p: &UserProfile) -> ProfileBody {
    ProfileBody {
        sex: p.body.sex,
        date_of_birth: p.body.date_of_birth.map(format_iso_date),
        height_cm: p.body.height_cm,
        weight_kg: p.body.weight_kg,
        calorie_goal: p.calorie_goal,
        hydration_goal_ml: p.hydration_goal_ml,
    }
}

/// Explicit `YYYY-MM-DD` if given, else the UTC day of `at`.
fn day_or(raw: Option<&str>, at: OffsetDateTime) -> Result<Date, (StatusCode, String)> {
    match raw {
        Some(raw) => parse_iso_date(raw).ok_or_else(bad_date),
        None => Ok(at.to_offset(UtcOffset::UTC).date()),
    }
}

fn bad_date() -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, "date must be YYYY-MM-DD".into())
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use time::macros::{date, datetime};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::jwt::sign_for_tests;
    use crate::nutrition::services::fakes::{FakeCatalog, MemoryStore};

    fn app() -> Router {
        let state = AppState::fake(
            Arc::new(FakeCatalog::Products(vec![])),
            Arc::new(MemoryStore::default()),
        );
        routes().with_state(state)
    }

    fn send(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(
                "authorization",
                format!(
                    "Bearer {}",
                    sign_for_tests("test", "authenticated", None, Uuid::new_v4())
                ),
            )
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn day_defaults_to_utc_date_of_timestamp() {
        let at = datetime!(2024-03-01 23:30 -05:00);
        assert_eq!(day_or(None, at).unwrap(), date!(2024 - 03 - 02));
        assert_eq!(day_or(Some("2024-02-28"), at).unwrap(), date!(2024 - 02 - 28));
        assert!(day_or(Some("bogus"), at).is_err());
    }

    #[tokio::test]
    async fn sleep_ending_before_start_is_rejected() {
        let res = app()
            .oneshot(send(
                "POST",
                "/sleep",
                serde_json::json!({
                    "start": "2024-03-02T07:00:00Z",
                    "end": "2024-03-01T23:00:00Z",
                    "samples": []
                }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn water_must_be_positive() {
        let res = app()
            .oneshot(send("POST", "/water", serde_json::json!({ "amount_ml": -250 })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn activity_rejects_negative_steps() {
        let res = app()
            .oneshot(send(
                "PUT",
                "/activity/2024-03-01",
                serde_json::json!({
                    "steps": -5,
                    "active_calories": 0,
                    "distance_m": 0,
                    "exercise_minutes": 0
                }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn insights_reject_bad_date() {
        let res = app()
            .oneshot(send("POST", "/insights/March-1/recompute", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
