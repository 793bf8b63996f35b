use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::orders::{DeliveryAddress, OrderList, OrderWithItems, UpdateOrderStatusRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{CartItem, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
};

/// Inserts an order plus its line-item snapshot inside the caller's
/// transaction. Status starts at pending; item emptiness is the checkout
/// orchestrator's check, not ours.
pub(crate) async fn insert_order(
    conn: &mut PgConnection,
    user_id: Uuid,
    cart_items: &[CartItem],
    total_amount: i64,
    address: &DeliveryAddress,
    contact_phone: &str,
    payment_method: PaymentMethod,
) -> AppResult<(Order, Vec<OrderItem>)> {
    let order = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders
            (id, user_id, total_amount, status, payment_status, payment_method,
             street, city, state, zip_code, contact_phone)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(total_amount)
    .bind(OrderStatus::Pending.as_str())
    .bind(PaymentStatus::Pending.as_str())
    .bind(payment_method.as_str())
    .bind(&address.street)
    .bind(&address.city)
    .bind(&address.state)
    .bind(&address.zip_code)
    .bind(contact_phone)
    .fetch_one(&mut *conn)
    .await?;

    let mut items = Vec::with_capacity(cart_items.len());
    for line in cart_items {
        let item = sqlx::query_as::<_, OrderItem>(
            r#"
            INSERT INTO order_items (id, order_id, food_id, name, price, image_url, quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order.id)
        .bind(line.food_id)
        .bind(&line.name)
        .bind(line.price)
        .bind(&line.image_url)
        .bind(line.quantity)
        .fetch_one(&mut *conn)
        .await?;
        items.push(item);
    }

    Ok((order, items))
}

pub async fn get_order(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    // Owners only.
    if order.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let items = order_items(pool, order.id).await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems { order, items },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    pool: &DbPool,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let items = sqlx::query_as::<_, Order>(
        r#"
        SELECT * FROM orders
        WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(user.user_id)
    .bind(query.status.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM orders WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)",
    )
    .bind(user.user_id)
    .bind(query.status.as_deref())
    .fetch_one(pool)
    .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn list_all_orders(
    pool: &DbPool,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let items = sqlx::query_as::<_, Order>(
        r#"
        SELECT * FROM orders
        WHERE ($1::text IS NULL OR status = $1)
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(query.status.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM orders WHERE ($1::text IS NULL OR status = $1)")
            .bind(query.status.as_deref())
            .fetch_one(pool)
            .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

/// Moves an order along the fulfillment lifecycle. Illegal transitions are
/// rejected with a conflict; reaching delivered stamps `delivered_at`.
pub async fn update_order_status(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let next: OrderStatus = payload.status.parse()?;

    let mut tx = pool.begin().await?;
    let order = set_status(&mut tx, id, next).await?;
    tx.commit().await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": order.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order updated",
        order,
        Some(Meta::empty()),
    ))
}

pub(crate) async fn set_status(
    conn: &mut PgConnection,
    id: Uuid,
    next: OrderStatus,
) -> AppResult<Order> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            other => AppError::DbError(other),
        })?;

    let current: OrderStatus = order.status.parse()?;
    if !current.can_transition_to(next) {
        return Err(AppError::InvalidTransition {
            from: current.as_str().to_string(),
            to: next.as_str().to_string(),
        });
    }

    let order = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders
        SET status = $2,
            updated_at = now(),
            delivered_at = CASE WHEN $2 = 'delivered' THEN now() ELSE delivered_at END
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(next.as_str())
    .fetch_one(&mut *conn)
    .await?;

    Ok(order)
}

/// Payment outcome is tracked independently of the fulfillment status.
pub(crate) async fn set_payment_status(
    conn: &mut PgConnection,
    id: Uuid,
    next: PaymentStatus,
) -> AppResult<Order> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            other => AppError::DbError(other),
        })?;

    let current: PaymentStatus = order.payment_status.parse()?;
    if !current.can_transition_to(next) {
        return Err(AppError::InvalidTransition {
            from: current.as_str().to_string(),
            to: next.as_str().to_string(),
        });
    }

    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET payment_status = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(next.as_str())
    .fetch_one(&mut *conn)
    .await?;

    Ok(order)
}

pub(crate) async fn order_items(pool: &DbPool, order_id: Uuid) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = $1 ORDER BY created_at",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
}
