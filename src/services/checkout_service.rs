use crate::{
    audit::log_audit,
    dto::orders::{
        CheckoutRequest, CheckoutSessionResponse, CreateOrderRequest, DeliveryAddress,
        OrderWithItems,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Cart, CartItem, PaymentMethod},
    payments::{HostedSessionRequest, SessionLineItem},
    response::{ApiResponse, Meta},
    services::order_service,
    state::AppState,
};

/// Card path: snapshot the cart into a pending order and hand off to the
/// payment collaborator's hosted page. The cart is deliberately left intact;
/// it is cleared only when the completion event arrives, so an abandoned
/// checkout can be retried.
pub async fn create_checkout_session(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutSessionResponse>> {
    require_delivery_info(&payload.delivery_address, &payload.contact_phone)?;

    let mut tx = state.pool.begin().await?;
    let (cart, items) = locked_cart_snapshot(&mut tx, user).await?;

    let (order, _) = order_service::insert_order(
        &mut tx,
        user.user_id,
        &items,
        cart.total_amount,
        &payload.delivery_address,
        &payload.contact_phone,
        PaymentMethod::Card,
    )
    .await?;
    tx.commit().await?;

    let session_req = HostedSessionRequest {
        line_items: items
            .iter()
            .map(|line| SessionLineItem {
                name: line.name.clone(),
                image_url: line.image_url.clone(),
                unit_amount: line.price,
                quantity: line.quantity,
            })
            .collect(),
        success_url: format!(
            "{}/orders/{}?success=true",
            state.config.public_base_url, order.id
        ),
        cancel_url: format!("{}/checkout?canceled=true", state.config.public_base_url),
        order_id: order.id,
        user_id: user.user_id,
    };

    let session = state.payments.create_hosted_session(&session_req).await?;

    // Correlation id for later reconciliation and support lookups.
    sqlx::query("UPDATE orders SET payment_session_id = $2, updated_at = now() WHERE id = $1")
        .bind(order.id)
        .bind(&session.id)
        .execute(&state.pool)
        .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "checkout_session_created",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "session_id": session.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Checkout session created",
        CheckoutSessionResponse {
            session_id: session.id,
            url: session.url,
        },
        Some(Meta::empty()),
    ))
}

/// Cash path: payment is collected at the door, so there is no asynchronous
/// confirmation to wait for. The order is created and the cart cleared in one
/// transaction.
pub async fn create_cash_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    require_delivery_info(&payload.delivery_address, &payload.contact_phone)?;

    let method: PaymentMethod = payload.payment_method.parse()?;
    if method != PaymentMethod::Cash {
        return Err(AppError::BadRequest(
            "card payments go through the checkout session endpoint".to_string(),
        ));
    }

    let mut tx = state.pool.begin().await?;
    let (cart, items) = locked_cart_snapshot(&mut tx, user).await?;

    let (order, order_items) = order_service::insert_order(
        &mut tx,
        user.user_id,
        &items,
        cart.total_amount,
        &payload.delivery_address,
        &payload.contact_phone,
        PaymentMethod::Cash,
    )
    .await?;

    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE carts SET total_amount = 0, updated_at = now() WHERE id = $1")
        .bind(cart.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_created",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "payment_method": "cash" })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order created",
        OrderWithItems {
            order,
            items: order_items,
        },
        Some(Meta::empty()),
    ))
}

fn require_delivery_info(address: &DeliveryAddress, contact_phone: &str) -> AppResult<()> {
    if !address.is_complete() || contact_phone.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Missing delivery information".to_string(),
        ));
    }
    Ok(())
}

/// Locks the user's cart and returns it with its lines; an absent or empty
/// cart rejects the checkout before anything is persisted.
async fn locked_cart_snapshot(
    tx: &mut sqlx::PgConnection,
    user: &AuthUser,
) -> AppResult<(Cart, Vec<CartItem>)> {
    let cart = sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1 FOR UPDATE")
        .bind(user.user_id)
        .fetch_optional(&mut *tx)
        .await?;
    let cart = match cart {
        Some(c) => c,
        None => return Err(AppError::BadRequest("Cart is empty".to_string())),
    };

    let items = sqlx::query_as::<_, CartItem>(
        "SELECT * FROM cart_items WHERE cart_id = $1 ORDER BY created_at",
    )
    .bind(cart.id)
    .fetch_all(&mut *tx)
    .await?;

    if items.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".to_string()));
    }

    Ok((cart, items))
}
