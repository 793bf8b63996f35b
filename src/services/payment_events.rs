use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    error::AppResult,
    models::{Order, OrderStatus, PaymentStatus},
    payments::PaymentEvent,
    services::{cart_service, order_service},
};

/// Applies a verified payment notification to the order and cart stores.
/// Delivery is at-least-once, so every arm tolerates replays.
pub async fn apply_event(pool: &DbPool, event: PaymentEvent) -> AppResult<()> {
    match event {
        PaymentEvent::Completed { order_id, user_id } => {
            apply_completed(pool, order_id, user_id).await
        }
        PaymentEvent::Failed { order_id } => apply_failed(pool, order_id).await,
        PaymentEvent::Ignored { kind } => {
            tracing::debug!(kind = %kind, "ignoring payment event");
            Ok(())
        }
    }
}

async fn apply_completed(
    pool: &DbPool,
    order_id: Uuid,
    user_id: Option<Uuid>,
) -> AppResult<()> {
    let mut tx = pool.begin().await?;

    let order = match load_order(&mut tx, order_id).await? {
        Some(o) => o,
        None => {
            tracing::warn!(order_id = %order_id, "payment completed for unknown order");
            return Ok(());
        }
    };

    if order.payment_status == PaymentStatus::Paid.as_str() {
        tracing::debug!(order_id = %order_id, "replayed completion event, nothing to do");
        return Ok(());
    }

    order_service::set_payment_status(&mut tx, order_id, PaymentStatus::Paid).await?;

    // Confirm the order when the lifecycle allows it; a payment landing on a
    // cancelled order keeps its paid mark but is not resurrected.
    let current: OrderStatus = order.status.parse()?;
    if current.can_transition_to(OrderStatus::Confirmed) {
        order_service::set_status(&mut tx, order_id, OrderStatus::Confirmed).await?;
    } else {
        tracing::warn!(
            order_id = %order_id,
            status = %order.status,
            "payment completed but order cannot be confirmed from its current status"
        );
    }

    tx.commit().await?;

    if let Some(user_id) = user_id {
        cart_service::clear_cart(pool, user_id).await?;
    }

    if let Err(err) = log_audit(
        pool,
        user_id,
        "payment_completed",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(())
}

/// A failed payment marks the payment only; the order is not auto-cancelled.
async fn apply_failed(pool: &DbPool, order_id: Uuid) -> AppResult<()> {
    let mut tx = pool.begin().await?;

    let order = match load_order(&mut tx, order_id).await? {
        Some(o) => o,
        None => {
            tracing::warn!(order_id = %order_id, "payment failed for unknown order");
            return Ok(());
        }
    };

    let current: PaymentStatus = order.payment_status.parse()?;
    if current.is_terminal() {
        tracing::debug!(order_id = %order_id, "payment already settled, ignoring failure event");
        return Ok(());
    }

    order_service::set_payment_status(&mut tx, order_id, PaymentStatus::Failed).await?;
    tx.commit().await?;

    if let Err(err) = log_audit(
        pool,
        None,
        "payment_failed",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(())
}

async fn load_order(
    conn: &mut sqlx::PgConnection,
    order_id: Uuid,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(order_id)
        .fetch_optional(conn)
        .await
}
