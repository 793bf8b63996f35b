use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::cart::{AddToCartRequest, CartDto, UpdateCartItemRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Cart, CartItem, Food},
    response::{ApiResponse, Meta},
};

// Cart mutations lock the user's cart row for the duration of the
// transaction, so two rapid mutations for the same user serialize instead of
// losing one of the writes.

pub async fn get_cart(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<CartDto>> {
    let cart = sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_optional(pool)
        .await?;

    // No cart yet is a valid state: an empty cart, not an error.
    let dto = match cart {
        None => CartDto::empty(),
        Some(cart) => {
            let items = sqlx::query_as::<_, CartItem>(
                "SELECT * FROM cart_items WHERE cart_id = $1 ORDER BY created_at",
            )
            .bind(cart.id)
            .fetch_all(pool)
            .await?;
            CartDto {
                items,
                total_amount: cart.total_amount,
            }
        }
    };

    Ok(ApiResponse::success("OK", dto, Some(Meta::empty())))
}

pub async fn add_to_cart(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartDto>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let food = sqlx::query_as::<_, Food>("SELECT * FROM foods WHERE id = $1")
        .bind(payload.food_id)
        .fetch_optional(pool)
        .await?;
    let food = match food {
        Some(f) => f,
        None => return Err(AppError::NotFound),
    };
    if !food.is_available {
        return Err(AppError::BadRequest("Food is not available".to_string()));
    }

    let mut tx = pool.begin().await?;

    let cart = lock_cart(&mut tx, user.user_id).await?;
    let cart = match cart {
        Some(c) => c,
        None => {
            sqlx::query_as::<_, Cart>(
                "INSERT INTO carts (id, user_id) VALUES ($1, $2) RETURNING *",
            )
            .bind(Uuid::new_v4())
            .bind(user.user_id)
            .fetch_one(&mut *tx)
            .await?
        }
    };

    // An existing line accumulates quantity and keeps its snapshotted unit
    // price; the fresh catalog price is only used for brand-new lines.
    sqlx::query(
        r#"
        INSERT INTO cart_items (id, cart_id, food_id, name, price, image_url, quantity)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (cart_id, food_id)
        DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(cart.id)
    .bind(food.id)
    .bind(&food.name)
    .bind(food.price)
    .bind(&food.image_url)
    .bind(payload.quantity)
    .execute(&mut *tx)
    .await?;

    let total_amount = recompute_total(&mut tx, cart.id).await?;
    let items = cart_items(&mut tx, cart.id).await?;

    tx.commit().await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_add",
        Some("cart_items"),
        Some(serde_json::json!({ "food_id": payload.food_id, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "OK",
        CartDto {
            items,
            total_amount,
        },
        Some(Meta::empty()),
    ))
}

/// Overwrites a line's quantity; zero or below removes the line. Fails with
/// not-found when the user has no cart or the food is not in it.
pub async fn update_cart_item(
    pool: &DbPool,
    user: &AuthUser,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartDto>> {
    let mut tx = pool.begin().await?;

    let cart = match lock_cart(&mut tx, user.user_id).await? {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let affected = if payload.quantity <= 0 {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND food_id = $2")
            .bind(cart.id)
            .bind(payload.food_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
    } else {
        sqlx::query("UPDATE cart_items SET quantity = $3 WHERE cart_id = $1 AND food_id = $2")
            .bind(cart.id)
            .bind(payload.food_id)
            .bind(payload.quantity)
            .execute(&mut *tx)
            .await?
            .rows_affected()
    };

    if affected == 0 {
        return Err(AppError::NotFound);
    }

    let total_amount = recompute_total(&mut tx, cart.id).await?;
    let items = cart_items(&mut tx, cart.id).await?;

    tx.commit().await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_update",
        Some("cart_items"),
        Some(serde_json::json!({ "food_id": payload.food_id, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "OK",
        CartDto {
            items,
            total_amount,
        },
        Some(Meta::empty()),
    ))
}

/// Empties the user's cart. Succeeds even when there is no cart; returns
/// whether anything actually changed.
pub async fn clear_cart(pool: &DbPool, user_id: Uuid) -> AppResult<bool> {
    let mut tx = pool.begin().await?;

    let cart = match lock_cart(&mut tx, user_id).await? {
        Some(c) => c,
        None => return Ok(false),
    };

    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart.id)
        .execute(&mut *tx)
        .await?;
    let changed = sqlx::query(
        "UPDATE carts SET total_amount = 0, updated_at = now() WHERE id = $1",
    )
    .bind(cart.id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;

    if let Err(err) = log_audit(
        pool,
        Some(user_id),
        "cart_clear",
        Some("carts"),
        None,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(changed > 0)
}

async fn lock_cart(conn: &mut PgConnection, user_id: Uuid) -> Result<Option<Cart>, sqlx::Error> {
    sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(conn)
        .await
}

/// Re-derives the persisted total from the line items; never trusts a total
/// carried over from a prior read.
async fn recompute_total(conn: &mut PgConnection, cart_id: Uuid) -> Result<i64, sqlx::Error> {
    let (total,): (i64,) = sqlx::query_as(
        r#"
        UPDATE carts
        SET total_amount = COALESCE(
                (SELECT SUM(price * quantity) FROM cart_items WHERE cart_id = $1), 0),
            updated_at = now()
        WHERE id = $1
        RETURNING total_amount
        "#,
    )
    .bind(cart_id)
    .fetch_one(conn)
    .await?;
    Ok(total)
}

async fn cart_items(conn: &mut PgConnection, cart_id: Uuid) -> Result<Vec<CartItem>, sqlx::Error> {
    sqlx::query_as::<_, CartItem>(
        "SELECT * FROM cart_items WHERE cart_id = $1 ORDER BY created_at",
    )
    .bind(cart_id)
    .fetch_all(conn)
    .await
}
