use chrono::Utc;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::foods::{CategoryList, CreateFoodRequest, FoodList, UpdateFoodRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Food,
    response::{ApiResponse, Meta},
    routes::params::FoodQuery,
};

/// Menu listing. Unavailable items never appear here, whatever the filter.
pub async fn list_foods(pool: &DbPool, query: FoodQuery) -> AppResult<ApiResponse<FoodList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let items = sqlx::query_as::<_, Food>(
        r#"
        SELECT * FROM foods
        WHERE is_available = TRUE
          AND ($1::text IS NULL OR category = $1)
          AND ($2::boolean IS NULL OR is_vegetarian = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(query.category.as_deref())
    .bind(query.vegetarian)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM foods
        WHERE is_available = TRUE
          AND ($1::text IS NULL OR category = $1)
          AND ($2::boolean IS NULL OR is_vegetarian = $2)
        "#,
    )
    .bind(query.category.as_deref())
    .bind(query.vegetarian)
    .fetch_one(pool)
    .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("Foods", FoodList { items }, Some(meta)))
}

/// No availability filter here; purchase checks belong to the caller.
pub async fn get_food(pool: &DbPool, id: Uuid) -> AppResult<ApiResponse<Food>> {
    let food = sqlx::query_as::<_, Food>("SELECT * FROM foods WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let food = match food {
        Some(f) => f,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Food", food, None))
}

/// Distinct categories across the whole catalog, unavailable items included.
pub async fn list_categories(pool: &DbPool) -> AppResult<ApiResponse<CategoryList>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT DISTINCT category FROM foods ORDER BY category")
            .fetch_all(pool)
            .await?;

    let categories = rows.into_iter().map(|(c,)| c).collect();
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { categories },
        Some(Meta::empty()),
    ))
}

pub async fn create_food(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreateFoodRequest,
) -> AppResult<ApiResponse<Food>> {
    ensure_admin(user)?;
    if payload.price < 0 {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }

    let food = sqlx::query_as::<_, Food>(
        r#"
        INSERT INTO foods
            (id, name, description, price, category, image_url,
             is_vegetarian, is_available, preparation_minutes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.name)
    .bind(payload.description)
    .bind(payload.price)
    .bind(payload.category)
    .bind(payload.image_url)
    .bind(payload.is_vegetarian)
    .bind(payload.is_available)
    .bind(payload.preparation_minutes)
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "food_create",
        Some("foods"),
        Some(serde_json::json!({ "food_id": food.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Food created",
        food,
        Some(Meta::empty()),
    ))
}

pub async fn update_food(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateFoodRequest,
) -> AppResult<ApiResponse<Food>> {
    ensure_admin(user)?;
    let existing = sqlx::query_as::<_, Food>("SELECT * FROM foods WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let existing = match existing {
        Some(f) => f,
        None => return Err(AppError::NotFound),
    };

    let name = payload.name.unwrap_or(existing.name);
    let description = payload.description.unwrap_or(existing.description);
    let price = payload.price.unwrap_or(existing.price);
    let category = payload.category.unwrap_or(existing.category);
    let image_url = payload.image_url.unwrap_or(existing.image_url);
    let is_vegetarian = payload.is_vegetarian.unwrap_or(existing.is_vegetarian);
    let is_available = payload.is_available.unwrap_or(existing.is_available);
    let preparation_minutes = payload
        .preparation_minutes
        .unwrap_or(existing.preparation_minutes);

    let food = sqlx::query_as::<_, Food>(
        r#"
        UPDATE foods
        SET name = $2, description = $3, price = $4, category = $5, image_url = $6,
            is_vegetarian = $7, is_available = $8, preparation_minutes = $9, updated_at = $10
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(price)
    .bind(category)
    .bind(image_url)
    .bind(is_vegetarian)
    .bind(is_available)
    .bind(preparation_minutes)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "food_update",
        Some("foods"),
        Some(serde_json::json!({ "food_id": food.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Updated", food, Some(Meta::empty())))
}
