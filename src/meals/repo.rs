use std::collections::HashMap;

use anyhow::Context;
use sqlx::{types::Json, FromRow, PgPool, Postgres, Transaction};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::model::{LoggedMealItem, Meal, MealType};
use crate::nutrition::macros::MacroProfile;

#[derive(Debug, Clone, FromRow)]
struct MealRow {
    id: Uuid,
    user_id: Uuid,
    meal_type: String,
    logged_at: OffsetDateTime,
    notes: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
struct MealItemRow {
    meal_id: Uuid,
    food_id: Uuid,
    name: String,
    brand: Option<String>,
    serving_description: String,
    macros: Json<MacroProfile>,
    serving_multiplier: f64,
    serving_size_override: Option<String>,
}

impl From<MealItemRow> for LoggedMealItem {
    fn from(r: MealItemRow) -> Self {
        Self {
            food_id: r.food_id,
            name: r.name,
            brand: r.brand,
            serving_description: r.serving_description,
            macros: r.macros.0,
            serving_multiplier: r.serving_multiplier,
            serving_size_override: r.serving_size_override,
        }
    }
}

fn assemble(row: MealRow, items: Vec<LoggedMealItem>) -> Meal {
    Meal {
        id: row.id,
        user_id: row.user_id,
        meal_type: MealType::from_code(&row.meal_type),
        logged_at: row.logged_at,
        notes: row.notes,
        items,
    }
}

async fn insert_items(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
    items: &[LoggedMealItem],
) -> anyhow::Result<()> {
    for (position, item) in items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO meal_items (id, meal_id, position, food_id, name, brand,
                                    serving_description, macros, serving_multiplier,
                                    serving_size_override)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(meal_id)
        .bind(position as i32)
        .bind(item.food_id)
        .bind(&item.name)
        .bind(&item.brand)
        .bind(&item.serving_description)
        .bind(Json(item.macros))
        .bind(item.serving_multiplier)
        .bind(&item.serving_size_override)
        .execute(&mut **tx)
        .await
        .context("insert meal_items")?;
    }
    Ok(())
}

async fn load_items(db: &PgPool, meal_ids: &[Uuid]) -> anyhow::Result<HashMap<Uuid, Vec<LoggedMealItem>>> {
    let rows = sqlx::query_as::<_, MealItemRow>(
        r#"
        SELECT meal_id, food_id, name, brand, serving_description, macros,
               serving_multiplier, serving_size_override
        FROM meal_items
        WHERE meal_id = ANY($1)
        ORDER BY meal_id, position
        "#,
    )
    .bind(meal_ids)
    .fetch_all(db)
    .await
    .context("select meal_items")?;

    let mut by_meal: HashMap<Uuid, Vec<LoggedMealItem>> = HashMap::new();
    for row in rows {
        by_meal.entry(row.meal_id).or_default().push(row.into());
    }
    Ok(by_meal)
}

pub async fn create_meal(
    db: &PgPool,
    user_id: Uuid,
    meal_type: MealType,
    logged_at: OffsetDateTime,
    meal_date: Date,
    notes: Option<String>,
    items: Vec<LoggedMealItem>,
) -> anyhow::Result<Meal> {
    let mut tx = db.begin().await?;
    let row = sqlx::query_as::<_, MealRow>(
        r#"
        INSERT INTO meal_entries (id, user_id, meal_type, meal_date, logged_at, notes)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, user_id, meal_type, logged_at, notes
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(meal_type.as_str())
    .bind(meal_date)
    .bind(logged_at)
    .bind(&notes)
    .fetch_one(&mut *tx)
    .await
    .context("insert meal_entries")?;

    insert_items(&mut tx, row.id, &items).await?;
    tx.commit().await?;
    Ok(assemble(row, items))
}

/// Full replace of a meal's items: delete then reinsert in one transaction.
/// `Ok(None)` if the meal doesn't belong to the user.
pub async fn replace_items(
    db: &PgPool,
    user_id: Uuid,
    meal_id: Uuid,
    items: Vec<LoggedMealItem>,
) -> anyhow::Result<Option<Meal>> {
    let mut tx = db.begin().await?;
    let row = sqlx::query_as::<_, MealRow>(
        r#"
        SELECT id, user_id, meal_type, logged_at, notes
        FROM meal_entries
        WHERE id = $1 AND user_id = $2
        FOR UPDATE
        "#,
    )
    .bind(meal_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await
    .context("lock meal_entries")?;

    let Some(row) = row else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM meal_items WHERE meal_id = $1")
        .bind(meal_id)
        .execute(&mut *tx)
        .await
        .context("delete meal_items")?;
    insert_items(&mut tx, meal_id, &items).await?;
    tx.commit().await?;
    Ok(Some(assemble(row, items)))
}

pub async fn get_meal(db: &PgPool, user_id: Uuid, meal_id: Uuid) -> anyhow::Result<Option<Meal>> {
    let row = sqlx::query_as::<_, MealRow>(
        r#"
        SELECT id, user_id, meal_type, logged_at, notes
        FROM meal_entries
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(meal_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut items = load_items(db, &[row.id]).await?;
    let items = items.remove(&row.id).unwrap_or_default();
    Ok(Some(assemble(row, items)))
}

pub async fn list_by_date(db: &PgPool, user_id: Uuid, date: Date) -> anyhow::Result<Vec<Meal>> {
    let rows = sqlx::query_as::<_, MealRow>(
        r#"
        SELECT id, user_id, meal_type, logged_at, notes
        FROM meal_entries
        WHERE user_id = $1 AND meal_date = $2
        ORDER BY logged_at ASC
        "#,
    )
    .bind(user_id)
    .bind(date)
    .fetch_all(db)
    .await
    .context("select meal_entries by date")?;

    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut items = load_items(db, &ids).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let meal_items = items.remove(&row.id).unwrap_or_default();
            assemble(row, meal_items)
        })
        .collect())
}

pub async fn delete_meal(db: &PgPool, user_id: Uuid, meal_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM meal_entries WHERE id = $1 AND user_id = $2")
        .bind(meal_id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete meal_entries")?;
    Ok(res.rows_affected() > 0)
}
