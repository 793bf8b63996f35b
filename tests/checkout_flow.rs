use std::sync::Arc;

use axum_food_ordering_api::{
    config::AppConfig,
    db::{DbPool, create_pool},
    dto::{
        cart::AddToCartRequest,
        orders::{CheckoutRequest, CreateOrderRequest, DeliveryAddress, UpdateOrderStatusRequest},
    },
    error::AppError,
    middleware::auth::AuthUser,
    payments::{
        HostedSession, HostedSessionRequest, PaymentError, PaymentEvent, PaymentGateway,
    },
    services::{cart_service, checkout_service, order_service, payment_events},
    state::AppState,
};
use uuid::Uuid;

// Checkout orchestration and payment-event reconciliation against a canned
// gateway. Requires a database; skipped when none is configured.

struct MockGateway;

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
    async fn create_hosted_session(
        &self,
        req: &HostedSessionRequest,
    ) -> Result<HostedSession, PaymentError> {
        Ok(HostedSession {
            id: format!("cs_test_{}", req.order_id.simple()),
            url: "https://pay.example/session".to_string(),
        })
    }

    fn parse_event(
        &self,
        _payload: &[u8],
        _signature_header: &str,
    ) -> Result<PaymentEvent, PaymentError> {
        Err(PaymentError::Malformed("not used in this test".into()))
    }
}

async fn test_state() -> Option<AppState> {
    let database_url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()?;
    let pool = create_pool(&database_url).await.ok()?;
    sqlx::migrate!("./migrations").run(&pool).await.ok()?;
    Some(AppState {
        pool,
        payments: Arc::new(MockGateway),
        config: AppConfig {
            database_url: String::new(),
            host: "127.0.0.1".into(),
            port: 0,
            public_base_url: "http://localhost:3000".into(),
            stripe_secret_key: String::new(),
            stripe_webhook_secret: String::new(),
        },
    })
}

fn skip_notice() {
    eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
}

async fn create_user(pool: &DbPool) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, 'dummy')")
        .bind(id)
        .bind("Test User")
        .bind(format!("{id}@example.com"))
        .execute(pool)
        .await?;
    Ok(AuthUser {
        user_id: id,
        role: "user".into(),
    })
}

async fn create_food(pool: &DbPool, price: i64) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO foods
            (id, name, description, price, category, image_url,
             is_vegetarian, is_available, preparation_minutes)
        VALUES ($1, $2, 'test item', $3, 'Test', '', FALSE, TRUE, 10)
        "#,
    )
    .bind(id)
    .bind(format!("food-{id}"))
    .bind(price)
    .execute(pool)
    .await?;
    Ok(id)
}

fn delivery() -> DeliveryAddress {
    DeliveryAddress {
        street: "1 Main St".into(),
        city: "Springfield".into(),
        state: "IL".into(),
        zip_code: "62701".into(),
    }
}

#[tokio::test]
async fn empty_cart_rejects_both_paths() -> anyhow::Result<()> {
    let Some(state) = test_state().await else {
        skip_notice();
        return Ok(());
    };
    let user = create_user(&state.pool).await?;

    let err = checkout_service::create_checkout_session(
        &state,
        &user,
        CheckoutRequest {
            delivery_address: delivery(),
            contact_phone: "555-0101".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Cart is empty"));

    let err = checkout_service::create_cash_order(
        &state,
        &user,
        CreateOrderRequest {
            delivery_address: delivery(),
            contact_phone: "555-0101".into(),
            payment_method: "cash".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Cart is empty"));

    // No order was created.
    let orders = order_service::list_orders(
        &state.pool,
        &user,
        axum_food_ordering_api::routes::params::OrderListQuery {
            pagination: Default::default(),
            status: None,
        },
    )
    .await?;
    assert!(orders.data.unwrap().items.is_empty());

    Ok(())
}

#[tokio::test]
async fn missing_delivery_info_is_rejected() -> anyhow::Result<()> {
    let Some(state) = test_state().await else {
        skip_notice();
        return Ok(());
    };
    let user = create_user(&state.pool).await?;
    let food_id = create_food(&state.pool, 500).await?;
    cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            food_id,
            quantity: 1,
        },
    )
    .await?;

    let mut address = delivery();
    address.city = "".into();
    let err = checkout_service::create_checkout_session(
        &state,
        &user,
        CheckoutRequest {
            delivery_address: address,
            contact_phone: "555-0101".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Missing delivery information"));

    let err = checkout_service::create_cash_order(
        &state,
        &user,
        CreateOrderRequest {
            delivery_address: delivery(),
            contact_phone: "  ".into(),
            payment_method: "cash".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Missing delivery information"));

    Ok(())
}

#[tokio::test]
async fn cash_checkout_creates_pending_order_and_clears_cart() -> anyhow::Result<()> {
    let Some(state) = test_state().await else {
        skip_notice();
        return Ok(());
    };
    let user = create_user(&state.pool).await?;
    let food_id = create_food(&state.pool, 1099).await?;
    cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            food_id,
            quantity: 2,
        },
    )
    .await?;

    let resp = checkout_service::create_cash_order(
        &state,
        &user,
        CreateOrderRequest {
            delivery_address: delivery(),
            contact_phone: "555-0101".into(),
            payment_method: "cash".into(),
        },
    )
    .await?;
    let data = resp.data.unwrap();

    assert_eq!(data.order.status, "pending");
    assert_eq!(data.order.payment_status, "pending");
    assert_eq!(data.order.payment_method, "cash");
    assert_eq!(data.order.total_amount, 2198);
    assert_eq!(data.items.len(), 1);
    assert_eq!(data.items[0].quantity, 2);

    // Cash payment is collected at delivery, so the cart empties right away.
    let cart = cart_service::get_cart(&state.pool, &user).await?.data.unwrap();
    assert!(cart.items.is_empty());
    assert_eq!(cart.total_amount, 0);

    Ok(())
}

#[tokio::test]
async fn card_checkout_returns_redirect_and_keeps_cart() -> anyhow::Result<()> {
    let Some(state) = test_state().await else {
        skip_notice();
        return Ok(());
    };
    let user = create_user(&state.pool).await?;
    let food_id = create_food(&state.pool, 1299).await?;
    cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            food_id,
            quantity: 1,
        },
    )
    .await?;

    let resp = checkout_service::create_checkout_session(
        &state,
        &user,
        CheckoutRequest {
            delivery_address: delivery(),
            contact_phone: "555-0101".into(),
        },
    )
    .await?;
    let session = resp.data.unwrap();
    assert_eq!(session.url, "https://pay.example/session");

    // Order exists, pending on both axes, with the session recorded.
    let orders = order_service::list_orders(
        &state.pool,
        &user,
        axum_food_ordering_api::routes::params::OrderListQuery {
            pagination: Default::default(),
            status: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(orders.items.len(), 1);
    let order = &orders.items[0];
    assert_eq!(order.status, "pending");
    assert_eq!(order.payment_status, "pending");
    assert_eq!(order.payment_method, "card");
    assert_eq!(order.payment_session_id.as_deref(), Some(session.session_id.as_str()));

    // Cart survives until the completion event arrives.
    let cart = cart_service::get_cart(&state.pool, &user).await?.data.unwrap();
    assert_eq!(cart.items.len(), 1);

    Ok(())
}

#[tokio::test]
async fn completion_event_confirms_order_and_clears_cart_idempotently() -> anyhow::Result<()> {
    let Some(state) = test_state().await else {
        skip_notice();
        return Ok(());
    };
    let user = create_user(&state.pool).await?;
    let food_id = create_food(&state.pool, 1299).await?;
    cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            food_id,
            quantity: 1,
        },
    )
    .await?;
    checkout_service::create_checkout_session(
        &state,
        &user,
        CheckoutRequest {
            delivery_address: delivery(),
            contact_phone: "555-0101".into(),
        },
    )
    .await?;
    let order_id = latest_order_id(&state.pool, &user).await?;

    let event = PaymentEvent::Completed {
        order_id,
        user_id: Some(user.user_id),
    };
    payment_events::apply_event(&state.pool, event.clone()).await?;

    let order = order_service::get_order(&state.pool, &user, order_id)
        .await?
        .data
        .unwrap()
        .order;
    assert_eq!(order.payment_status, "paid");
    assert_eq!(order.status, "confirmed");

    let cart = cart_service::get_cart(&state.pool, &user).await?.data.unwrap();
    assert!(cart.items.is_empty());

    // At-least-once delivery: the replay changes nothing and does not fail.
    payment_events::apply_event(&state.pool, event).await?;
    let order = order_service::get_order(&state.pool, &user, order_id)
        .await?
        .data
        .unwrap()
        .order;
    assert_eq!(order.payment_status, "paid");
    assert_eq!(order.status, "confirmed");

    Ok(())
}

#[tokio::test]
async fn failed_event_touches_payment_status_only() -> anyhow::Result<()> {
    let Some(state) = test_state().await else {
        skip_notice();
        return Ok(());
    };
    let user = create_user(&state.pool).await?;
    let food_id = create_food(&state.pool, 900).await?;
    cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            food_id,
            quantity: 1,
        },
    )
    .await?;
    checkout_service::create_checkout_session(
        &state,
        &user,
        CheckoutRequest {
            delivery_address: delivery(),
            contact_phone: "555-0101".into(),
        },
    )
    .await?;
    let order_id = latest_order_id(&state.pool, &user).await?;

    payment_events::apply_event(&state.pool, PaymentEvent::Failed { order_id }).await?;

    let order = order_service::get_order(&state.pool, &user, order_id)
        .await?
        .data
        .unwrap()
        .order;
    assert_eq!(order.payment_status, "failed");
    assert_eq!(order.status, "pending", "a failed payment does not cancel the order");

    // Cart was not cleared either.
    let cart = cart_service::get_cart(&state.pool, &user).await?.data.unwrap();
    assert_eq!(cart.items.len(), 1);

    Ok(())
}

#[tokio::test]
async fn order_snapshot_is_frozen_against_later_cart_changes() -> anyhow::Result<()> {
    let Some(state) = test_state().await else {
        skip_notice();
        return Ok(());
    };
    let user = create_user(&state.pool).await?;
    let food_id = create_food(&state.pool, 1000).await?;
    cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            food_id,
            quantity: 2,
        },
    )
    .await?;
    let resp = checkout_service::create_cash_order(
        &state,
        &user,
        CreateOrderRequest {
            delivery_address: delivery(),
            contact_phone: "555-0101".into(),
            payment_method: "cash".into(),
        },
    )
    .await?;
    let order_id = resp.data.unwrap().order.id;

    // Shop again, with more of the same food at a different catalog price.
    sqlx::query("UPDATE foods SET price = 2000 WHERE id = $1")
        .bind(food_id)
        .execute(&state.pool)
        .await?;
    cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            food_id,
            quantity: 5,
        },
    )
    .await?;

    let data = order_service::get_order(&state.pool, &user, order_id)
        .await?
        .data
        .unwrap();
    assert_eq!(data.order.total_amount, 2000);
    assert_eq!(data.items.len(), 1);
    assert_eq!(data.items[0].quantity, 2);
    assert_eq!(data.items[0].price, 1000);

    Ok(())
}

#[tokio::test]
async fn card_method_is_rejected_on_the_cash_path() -> anyhow::Result<()> {
    let Some(state) = test_state().await else {
        skip_notice();
        return Ok(());
    };
    let user = create_user(&state.pool).await?;
    let food_id = create_food(&state.pool, 500).await?;
    cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            food_id,
            quantity: 1,
        },
    )
    .await?;

    let err = checkout_service::create_cash_order(
        &state,
        &user,
        CreateOrderRequest {
            delivery_address: delivery(),
            contact_phone: "555-0101".into(),
            payment_method: "card".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn admin_status_updates_respect_the_lifecycle() -> anyhow::Result<()> {
    let Some(state) = test_state().await else {
        skip_notice();
        return Ok(());
    };
    let user = create_user(&state.pool).await?;
    let admin = AuthUser {
        user_id: create_user(&state.pool).await?.user_id,
        role: "admin".into(),
    };
    let food_id = create_food(&state.pool, 750).await?;
    cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            food_id,
            quantity: 1,
        },
    )
    .await?;
    let resp = checkout_service::create_cash_order(
        &state,
        &user,
        CreateOrderRequest {
            delivery_address: delivery(),
            contact_phone: "555-0101".into(),
            payment_method: "cash".into(),
        },
    )
    .await?;
    let order_id = resp.data.unwrap().order.id;

    // Jumping the chain is rejected.
    let err = order_service::update_order_status(
        &state.pool,
        &admin,
        order_id,
        UpdateOrderStatusRequest {
            status: "out-for-delivery".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    for status in ["confirmed", "preparing", "out-for-delivery", "delivered"] {
        order_service::update_order_status(
            &state.pool,
            &admin,
            order_id,
            UpdateOrderStatusRequest {
                status: status.into(),
            },
        )
        .await?;
    }

    let order = order_service::get_order(&state.pool, &user, order_id)
        .await?
        .data
        .unwrap()
        .order;
    assert_eq!(order.status, "delivered");
    assert!(order.delivered_at.is_some(), "delivered_at stamps on delivery");

    // Delivered is terminal.
    let err = order_service::update_order_status(
        &state.pool,
        &admin,
        order_id,
        UpdateOrderStatusRequest {
            status: "cancelled".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    Ok(())
}

async fn latest_order_id(pool: &DbPool, user: &AuthUser) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        "SELECT id FROM orders WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user.user_id)
    .fetch_one(pool)
    .await?;
    Ok(id)
}
