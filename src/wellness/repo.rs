use anyhow::Context;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::energy::{BodyProfile, Sex};
use super::insights::{ActivitySummary, DailyInsightScores};
use super::sleep::{DailySleepRecord, SleepStage, SleepVitals, StageSegment};

/// Body measurements plus the user's own goals, if set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    pub body: BodyProfile,
    pub calorie_goal: Option<f64>,
    pub hydration_goal_ml: Option<f64>,
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    sex: String,
    date_of_birth: Option<Date>,
    height_cm: Option<f64>,
    weight_kg: Option<f64>,
    calorie_goal: Option<f64>,
    hydration_goal_ml: Option<f64>,
}

impl From<ProfileRow> for UserProfile {
    fn from(r: ProfileRow) -> Self {
        Self {
            body: BodyProfile {
                sex: Sex::from_code(&r.sex),
                date_of_birth: r.date_of_birth,
                height_cm: r.height_cm,
                weight_kg: r.weight_kg,
            },
            calorie_goal: r.calorie_goal,
            hydration_goal_ml: r.hydration_goal_ml,
        }
    }
}

pub async fn get_profile(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<UserProfile>> {
    let row = sqlx::query_as::<_, ProfileRow>(
        r#"
        SELECT sex, date_of_birth, height_cm, weight_kg, calorie_goal, hydration_goal_ml
        FROM user_profiles
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("select user_profiles")?;
    Ok(row.map(Into::into))
}

pub async fn upsert_profile(
    db: &PgPool,
    user_id: Uuid,
    profile: &UserProfile,
) -> anyhow::Result<UserProfile> {
    let row = sqlx::query_as::<_, ProfileRow>(
        r#"
        INSERT INTO user_profiles (user_id, sex, date_of_birth, height_cm, weight_kg,
                                   calorie_goal, hydration_goal_ml, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, now())
        ON CONFLICT (user_id) DO UPDATE SET
            sex = EXCLUDED.sex,
            date_of_birth = EXCLUDED.date_of_birth,
            height_cm = EXCLUDED.height_cm,
            weight_kg = EXCLUDED.weight_kg,
            calorie_goal = EXCLUDED.calorie_goal,
            hydration_goal_ml = EXCLUDED.hydration_goal_ml,
            updated_at = now()
        RETURNING sex, date_of_birth, height_cm, weight_kg, calorie_goal, hydration_goal_ml
        "#,
    )
    .bind(user_id)
    .bind(profile.body.sex.as_str())
    .bind(profile.body.date_of_birth)
    .bind(profile.body.height_cm)
    .bind(profile.body.weight_kg)
    .bind(profile.calorie_goal)
    .bind(profile.hydration_goal_ml)
    .fetch_one(db)
    .await
    .context("upsert user_profiles")?;
    Ok(row.into())
}

#[derive(Debug, FromRow)]
struct SleepRow {
    id: Uuid,
    start_at: OffsetDateTime,
    end_at: OffsetDateTime,
    avg_heart_rate: Option<f64>,
    hrv_ms: Option<f64>,
    spo2_pct: Option<f64>,
    respiratory_rate: Option<f64>,
    external_score: Option<i32>,
}

#[derive(Debug, FromRow)]
struct StageRow {
    stage: String,
    start_at: OffsetDateTime,
    duration_minutes: f64,
}

/// Stores the night under `sleep_date`, replacing any earlier upload for that day.
pub async fn save_sleep(
    db: &PgPool,
    user_id: Uuid,
    sleep_date: Date,
    record: &DailySleepRecord,
) -> anyhow::Result<()> {
    let mut tx = db.begin().await?;
    let sleep_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO sleep_entries (id, user_id, sleep_date, start_at, end_at, avg_heart_rate,
                                   hrv_ms, spo2_pct, respiratory_rate, external_score)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (user_id, sleep_date) DO UPDATE SET
            start_at = EXCLUDED.start_at,
            end_at = EXCLUDED.end_at,
            avg_heart_rate = EXCLUDED.avg_heart_rate,
            hrv_ms = EXCLUDED.hrv_ms,
            spo2_pct = EXCLUDED.spo2_pct,
            respiratory_rate = EXCLUDED.respiratory_rate,
            external_score = EXCLUDED.external_score
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(sleep_date)
    .bind(record.start())
    .bind(record.end())
    .bind(record.vitals.avg_heart_rate)
    .bind(record.vitals.hrv_ms)
    .bind(record.vitals.spo2_pct)
    .bind(record.vitals.respiratory_rate)
    .bind(record.external_score)
    .fetch_one(&mut *tx)
    .await
    .context("upsert sleep_entries")?;

    sqlx::query("DELETE FROM sleep_stages WHERE sleep_id = $1")
        .bind(sleep_id)
        .execute(&mut *tx)
        .await
        .context("delete sleep_stages")?;

    for seg in record.stages() {
        sqlx::query(
            r#"
            INSERT INTO sleep_stages (id, sleep_id, stage, start_at, duration_minutes)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(sleep_id)
        .bind(seg.stage.as_str())
        .bind(seg.start)
        .bind(seg.duration_minutes)
        .execute(&mut *tx)
        .await
        .context("insert sleep_stages")?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn get_sleep(
    db: &PgPool,
    user_id: Uuid,
    sleep_date: Date,
) -> anyhow::Result<Option<DailySleepRecord>> {
    let row = sqlx::query_as::<_, SleepRow>(
        r#"
        SELECT id, start_at, end_at, avg_heart_rate, hrv_ms, spo2_pct, respiratory_rate,
               external_score
        FROM sleep_entries
        WHERE user_id = $1 AND sleep_date = $2
        "#,
    )
    .bind(user_id)
    .bind(sleep_date)
    .fetch_optional(db)
    .await
    .context("select sleep_entries")?;

    let Some(row) = row else {
        return Ok(None);
    };

    let stages = sqlx::query_as::<_, StageRow>(
        r#"
        SELECT stage, start_at, duration_minutes
        FROM sleep_stages
        WHERE sleep_id = $1
        ORDER BY start_at
        "#,
    )
    .bind(row.id)
    .fetch_all(db)
    .await
    .context("select sleep_stages")?
    .into_iter()
    .filter_map(|s| {
        Some(StageSegment {
            stage: SleepStage::from_code(&s.stage)?,
            start: s.start_at,
            duration_minutes: s.duration_minutes,
        })
    })
    .collect();

    let record = DailySleepRecord::new(row.start_at, row.end_at, stages)
        .context("stored sleep window is invalid")?
        .with_vitals(SleepVitals {
            avg_heart_rate: row.avg_heart_rate,
            hrv_ms: row.hrv_ms,
            spo2_pct: row.spo2_pct,
            respiratory_rate: row.respiratory_rate,
        })
        .with_external_score(row.external_score);
    Ok(Some(record))
}

pub async fn add_water(
    db: &PgPool,
    user_id: Uuid,
    entry_date: Date,
    amount_ml: f64,
    logged_at: OffsetDateTime,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO water_entries (id, user_id, entry_date, amount_ml, logged_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(entry_date)
    .bind(amount_ml)
    .bind(logged_at)
    .execute(db)
    .await
    .context("insert water_entries")?;
    Ok(())
}

pub async fn water_total(db: &PgPool, user_id: Uuid, entry_date: Date) -> anyhow::Result<f64> {
    let total: f64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(amount_ml), 0)::float8
        FROM water_entries
        WHERE user_id = $1 AND entry_date = $2
        "#,
    )
    .bind(user_id)
    .bind(entry_date)
    .fetch_one(db)
    .await
    .context("sum water_entries")?;
    Ok(total)
}

#[derive(Debug, FromRow)]
struct ActivityRow {
    steps: i64,
    active_calories: f64,
    distance_m: f64,
    exercise_minutes: f64,
}

impl From<ActivityRow> for ActivitySummary {
    fn from(r: ActivityRow) -> Self {
        Self {
            steps: r.steps,
            active_calories: r.active_calories,
            distance_m: r.distance_m,
            exercise_minutes: r.exercise_minutes,
        }
    }
}

pub async fn upsert_activity(
    db: &PgPool,
    user_id: Uuid,
    activity_date: Date,
    activity: &ActivitySummary,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO daily_activity (user_id, activity_date, steps, active_calories,
                                    distance_m, exercise_minutes, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, now())
        ON CONFLICT (user_id, activity_date) DO UPDATE SET
            steps = EXCLUDED.steps,
            active_calories = EXCLUDED.active_calories,
            distance_m = EXCLUDED.distance_m,
            exercise_minutes = EXCLUDED.exercise_minutes,
            updated_at = now()
        "#,
    )
    .bind(user_id)
    .bind(activity_date)
    .bind(activity.steps)
    .bind(activity.active_calories)
    .bind(activity.distance_m)
    .bind(activity.exercise_minutes)
    .execute(db)
    .await
    .context("upsert daily_activity")?;
    Ok(())
}

pub async fn get_activity(
    db: &PgPool,
    user_id: Uuid,
    activity_date: Date,
) -> anyhow::Result<Option<ActivitySummary>> {
    let row = sqlx::query_as::<_, ActivityRow>(
        r#"
        SELECT steps, active_calories, distance_m, exercise_minutes
        FROM daily_activity
        WHERE user_id = $1 AND activity_date = $2
        "#,
    )
    .bind(user_id)
    .bind(activity_date)
    .fetch_optional(db)
    .await
    .context("select daily_activity")?;
    Ok(row.map(Into::into))
}

/// Logs a weigh-in and carries it onto the profile as the current weight.
pub async fn add_weight(
    db: &PgPool,
    user_id: Uuid,
    entry_date: Date,
    weight_kg: f64,
    logged_at: OffsetDateTime,
) -> anyhow::Result<()> {
    let mut tx = db.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO weight_entries (id, user_id, entry_date, weight_kg, logged_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(entry_date)
    .bind(weight_kg)
    .bind(logged_at)
    .execute(&mut *tx)
    .await
    .context("insert weight_entries")?;

    sqlx::query(
        r#"
        INSERT INTO user_profiles (user_id, sex, weight_kg, updated_at)
        VALUES ($1, 'unspecified', $2, now())
        ON CONFLICT (user_id) DO UPDATE SET weight_kg = EXCLUDED.weight_kg, updated_at = now()
        "#,
    )
    .bind(user_id)
    .bind(weight_kg)
    .execute(&mut *tx)
    .await
    .context("update profile weight")?;

    tx.commit().await?;
    Ok(())
}

#[derive(Debug, FromRow)]
struct ScoresRow {
    recovery: i32,
    stress: i32,
    strain: i32,
    readiness: i32,
    sleep: i32,
    nutrition: i32,
    hydration: i32,
}

impl From<ScoresRow> for DailyInsightScores {
    fn from(r: ScoresRow) -> Self {
        Self {
            recovery: r.recovery,
            stress: r.stress,
            strain: r.strain,
            readiness: r.readiness,
            sleep: r.sleep,
            nutrition: r.nutrition,
            hydration: r.hydration,
        }
    }
}

/// One row per user and day; recomputing overwrites it.
pub async fn upsert_scores(
    db: &PgPool,
    user_id: Uuid,
    score_date: Date,
    scores: &DailyInsightScores,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO daily_insight_scores (user_id, score_date, recovery, stress, strain,
                                          readiness, sleep, nutrition, hydration, computed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
        ON CONFLICT (user_id, score_date) DO UPDATE SET
            recovery = EXCLUDED.recovery,
            stress = EXCLUDED.stress,
            strain = EXCLUDED.strain,
            readiness = EXCLUDED.readiness,
            sleep = EXCLUDED.sleep,
            nutrition = EXCLUDED.nutrition,
            hydration = EXCLUDED.hydration,
            computed_at = now()
        "#,
    )
    .bind(user_id)
    .bind(score_date)
    .bind(scores.recovery)
    .bind(scores.stress)
    .bind(scores.strain)
    .bind(scores.readiness)
    .bind(scores.sleep)
    .bind(scores.nutrition)
    .bind(scores.hydration)
    .execute(db)
    .await
    .context("upsert daily_insight_scores")?;
    Ok(())
}

pub async fn get_scores(
    db: &PgPool,
    user_id: Uuid,
    score_date: Date,
) -> anyhow::Result<Option<DailyInsightScores>> {
    let row = sqlx::query_as::<_, ScoresRow>(
        r#"
        SELECT recovery, stress, strain, readiness, sleep, nutrition, hydration
        FROM daily_insight_scores
        WHERE user_id = $1 AND score_date = $2
        "#,
    )
    .bind(user_id)
    .bind(score_date)
    .fetch_optional(db)
    .await
    .context("select daily_insight_scores")?;
    Ok(row.map(Into::into))
}
