use axum_food_ordering_api::{
    db::{DbPool, create_pool},
    dto::cart::{AddToCartRequest, UpdateCartItemRequest},
    middleware::auth::AuthUser,
    services::cart_service,
};
use uuid::Uuid;

// Cart store behavior: totals, quantity accumulation, remove-via-zero and
// clear semantics. Requires a database; skipped when none is configured.

async fn test_pool() -> Option<DbPool> {
    let database_url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()?;
    let pool = create_pool(&database_url).await.ok()?;
    sqlx::migrate!("./migrations").run(&pool).await.ok()?;
    Some(pool)
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

async fn create_food(pool: &DbPool, price: i64, available: bool) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO foods
            (id, name, description, price, category, image_url,
             is_vegetarian, is_available, preparation_minutes)
        VALUES ($1, $2, 'test item', $3, 'Test', '', FALSE, $4, 10)
        "#,
    )
    .bind(id)
    .bind(format!("food-{id}"))
    .bind(price)
    .bind(available)
    .execute(pool)
    .await?;
    Ok(id)
}

#[tokio::test]
async fn missing_cart_reads_as_empty() -> anyhow::Result<()> {
    let Some(pool) = test_pool().await else {
        skip_notice();
        return Ok(());
    };
    let user = create_user(&pool).await?;

    let resp = cart_service::get_cart(&pool, &user).await?;
    let cart = resp.data.unwrap();
    assert!(cart.items.is_empty());
    assert_eq!(cart.total_amount, 0);

    Ok(())
}

#[tokio::test]
async fn adding_same_food_accumulates_one_line() -> anyhow::Result<()> {
    let Some(pool) = test_pool().await else {
        skip_notice();
        return Ok(());
    };
    let user = create_user(&pool).await?;
    let food_id = create_food(&pool, 500, true).await?;

    // 2 x $5.00 then 1 more.
    cart_service::add_to_cart(
        &pool,
        &user,
        AddToCartRequest {
            food_id,
            quantity: 2,
        },
    )
    .await?;
    let resp = cart_service::add_to_cart(
        &pool,
        &user,
        AddToCartRequest {
            food_id,
            quantity: 1,
        },
    )
    .await?;

    let cart = resp.data.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 3);
    assert_eq!(cart.items[0].price, 500);
    assert_eq!(cart.total_amount, 1500);

    Ok(())
}

#[tokio::test]
async fn accumulated_line_keeps_first_snapshot_price() -> anyhow::Result<()> {
    let Some(pool) = test_pool().await else {
        skip_notice();
        return Ok(());
    };
    let user = create_user(&pool).await?;
    let food_id = create_food(&pool, 500, true).await?;

    cart_service::add_to_cart(
        &pool,
        &user,
        AddToCartRequest {
            food_id,
            quantity: 1,
        },
    )
    .await?;

    // Catalog price changes after the first insertion.
    sqlx::query("UPDATE foods SET price = 900 WHERE id = $1")
        .bind(food_id)
        .execute(&pool)
        .await?;

    let resp = cart_service::add_to_cart(
        &pool,
        &user,
        AddToCartRequest {
            food_id,
            quantity: 1,
        },
    )
    .await?;

    let cart = resp.data.unwrap();
    assert_eq!(cart.items[0].price, 500, "stored unit price must be kept");
    assert_eq!(cart.total_amount, 1000);

    Ok(())
}

#[tokio::test]
async fn total_tracks_every_mutation() -> anyhow::Result<()> {
    let Some(pool) = test_pool().await else {
        skip_notice();
        return Ok(());
    };
    let user = create_user(&pool).await?;
    let burger = create_food(&pool, 1099, true).await?;
    let pizza = create_food(&pool, 1299, true).await?;

    cart_service::add_to_cart(
        &pool,
        &user,
        AddToCartRequest {
            food_id: burger,
            quantity: 2,
        },
    )
    .await?;
    let resp = cart_service::add_to_cart(
        &pool,
        &user,
        AddToCartRequest {
            food_id: pizza,
            quantity: 1,
        },
    )
    .await?;
    let cart = resp.data.unwrap();
    assert_eq!(cart.total_amount, 2 * 1099 + 1299);

    // Overwrite, not accumulate.
    let resp = cart_service::update_cart_item(
        &pool,
        &user,
        UpdateCartItemRequest {
            food_id: burger,
            quantity: 1,
        },
    )
    .await?;
    let cart = resp.data.unwrap();
    assert_eq!(cart.total_amount, 1099 + 1299);

    // Zero removes the line.
    let resp = cart_service::update_cart_item(
        &pool,
        &user,
        UpdateCartItemRequest {
            food_id: pizza,
            quantity: 0,
        },
    )
    .await?;
    let cart = resp.data.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.total_amount, 1099);

    let resp = cart_service::update_cart_item(
        &pool,
        &user,
        UpdateCartItemRequest {
            food_id: burger,
            quantity: 0,
        },
    )
    .await?;
    let cart = resp.data.unwrap();
    assert!(cart.items.is_empty());
    assert_eq!(cart.total_amount, 0);

    Ok(())
}

#[tokio::test]
async fn updating_absent_cart_or_item_is_not_found() -> anyhow::Result<()> {
    let Some(pool) = test_pool().await else {
        skip_notice();
        return Ok(());
    };
    let user = create_user(&pool).await?;
    let food_id = create_food(&pool, 500, true).await?;

    // No cart at all.
    let err = cart_service::update_cart_item(
        &pool,
        &user,
        UpdateCartItemRequest {
            food_id,
            quantity: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        axum_food_ordering_api::error::AppError::NotFound
    ));

    // Cart exists but the food is not in it.
    cart_service::add_to_cart(
        &pool,
        &user,
        AddToCartRequest {
            food_id,
            quantity: 1,
        },
    )
    .await?;
    let other_food = create_food(&pool, 700, true).await?;
    let err = cart_service::update_cart_item(
        &pool,
        &user,
        UpdateCartItemRequest {
            food_id: other_food,
            quantity: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        axum_food_ordering_api::error::AppError::NotFound
    ));

    Ok(())
}

#[tokio::test]
async fn unavailable_food_is_rejected_at_add_time() -> anyhow::Result<()> {
    let Some(pool) = test_pool().await else {
        skip_notice();
        return Ok(());
    };
    let user = create_user(&pool).await?;
    let food_id = create_food(&pool, 500, false).await?;

    let err = cart_service::add_to_cart(
        &pool,
        &user,
        AddToCartRequest {
            food_id,
            quantity: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        axum_food_ordering_api::error::AppError::BadRequest(_)
    ));

    Ok(())
}

#[tokio::test]
async fn clear_is_a_noop_success_without_a_cart() -> anyhow::Result<()> {
    let Some(pool) = test_pool().await else {
        skip_notice();
        return Ok(());
    };
    let user = create_user(&pool).await?;

    let cleared = cart_service::clear_cart(&pool, user.user_id).await?;
    assert!(!cleared, "no cart existed, nothing changed");

    let food_id = create_food(&pool, 500, true).await?;
    cart_service::add_to_cart(
        &pool,
        &user,
        AddToCartRequest {
            food_id,
            quantity: 2,
        },
    )
    .await?;

    let cleared = cart_service::clear_cart(&pool, user.user_id).await?;
    assert!(cleared);

    let resp = cart_service::get_cart(&pool, &user).await?;
    let cart = resp.data.unwrap();
    assert!(cart.items.is_empty());
    assert_eq!(cart.total_amount, 0);

    Ok(())
}
