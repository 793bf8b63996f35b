use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum_food_ordering_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "Admin", "admin@example.com", "admin123", "admin").await?;
    let user_id = ensure_user(&pool, "Demo User", "user@example.com", "user123", "user").await?;
    seed_menu(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, password_hash, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    // If user already exists, fetch id
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_menu(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    // (name, description, price in cents, category, vegetarian, prep minutes)
    let foods = vec![
        (
            "Margherita Pizza",
            "Classic pizza with fresh mozzarella, tomatoes, and basil",
            1299_i64,
            "Pizza",
            true,
            25,
        ),
        (
            "Pepperoni Pizza",
            "Loaded with pepperoni and mozzarella cheese",
            1499,
            "Pizza",
            false,
            25,
        ),
        (
            "Veggie Supreme Pizza",
            "Bell peppers, onions, mushrooms, olives, and tomatoes",
            1399,
            "Pizza",
            true,
            30,
        ),
        (
            "Classic Cheeseburger",
            "Juicy beef patty with cheese, lettuce, tomato, and special sauce",
            1099,
            "Burgers",
            false,
            15,
        ),
        (
            "Veggie Burger",
            "Plant-based patty with fresh veggies and vegan mayo",
            1199,
            "Burgers",
            true,
            15,
        ),
        (
            "Spaghetti Carbonara",
            "Creamy pasta with bacon, eggs, and parmesan",
            1399,
            "Pasta",
            false,
            20,
        ),
        (
            "Caesar Salad",
            "Crisp romaine, croutons, parmesan, and Caesar dressing",
            899,
            "Salads",
            true,
            10,
        ),
    ];

    for (name, desc, price, category, vegetarian, prep) in foods {
        sqlx::query(
            r#"
            INSERT INTO foods
                (id, name, description, price, category, image_url,
                 is_vegetarian, is_available, preparation_minutes)
            VALUES ($1, $2, $3, $4, $5, '', $6, TRUE, $7)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(category)
        .bind(vegetarian)
        .bind(prep)
        .execute(pool)
        .await?;
    }

    println!("Seeded menu");
    Ok(())
}
