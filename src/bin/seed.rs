use anyhow::Context;
use farm_market_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    models::NewProduct,
    repository::{ProductFilter, PageRequest, ProductRepository, SeaStore},
};
use rust_decimal::Decimal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

    let pool = create_pool(&database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&pool).await?;

    let farmer_id = ensure_user(&pool, "farmer_li", "Li Wei", "farmer").await?;
    let buyer_id = ensure_user(&pool, "buyer_chen", "Chen Jing", "buyer").await?;
    let category_id = ensure_category(&pool, "Vegetables").await?;

    let store = SeaStore::new(create_orm_conn(pool));
    seed_products(&store, farmer_id, category_id).await?;

    println!("Seed completed. Farmer ID: {farmer_id}, Buyer ID: {buyer_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    username: &str,
    name: &str,
    role: &str,
) -> anyhow::Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO users (username, name, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (username) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(username)
    .bind(name)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {username} (role={role})");
    Ok(id)
}

async fn ensure_category(pool: &sqlx::PgPool, name: &str) -> anyhow::Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO categories (name)
        VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn seed_products(store: &SeaStore, farmer_id: i64, category_id: i64) -> anyhow::Result<()> {
    let existing = store
        .page(
            &ProductFilter {
                farmer_id: Some(farmer_id),
                ..Default::default()
            },
            PageRequest::new(1, 1),
        )
        .await?;
    if existing.total > 0 {
        println!("Products already seeded");
        return Ok(());
    }

    // (name, description, price in cents, discount price in cents, stock)
    let products = vec![
        ("Heirloom Tomatoes", "Vine ripened, picked this morning", 1200, Some(950), 80),
        ("Baby Spinach", "Washed and bagged, 250 g", 650, None, 120),
        ("Purple Carrots", "Sweet and crunchy, 1 kg bunch", 800, None, 60),
        ("Snow Peas", "Crisp pods, 500 g", 1500, Some(1300), 40),
    ];

    for (name, description, price, discount, stock) in products {
        let product = store
            .insert(NewProduct {
                farmer_id,
                category_id,
                name: name.to_string(),
                description: Some(description.to_string()),
                price: Decimal::new(price, 2),
                discount_price: discount.map(|cents| Decimal::new(cents, 2)),
                is_discount: discount.is_some(),
                stock,
                status: 1,
                image_url: None,
            })
            .await?;
        println!("Seeded product {} ({})", product.name, product.id);
    }

    Ok(())
}
