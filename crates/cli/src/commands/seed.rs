//! Seed the catalog with demo categories and products.
//!
//! Re-running is safe: categories are matched by name and products by
//! (name, category), so existing rows are left untouched.

use sqlx::PgPool;
use thiserror::Error;

use tech_store_core::Money;
use tech_store_storefront::db;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

struct DemoProduct {
    name: &'static str,
    description: &'static str,
    price_cents: u32,
    stock_quantity: i32,
}

struct DemoCategory {
    name: &'static str,
    description: &'static str,
    products: &'static [DemoProduct],
}

const CATALOG: &[DemoCategory] = &[
    DemoCategory {
        name: "Laptops",
        description: "Portable computers for work and play",
        products: &[
            DemoProduct {
                name: "Ultrabook 14",
                description: "14-inch ultrabook, 16GB RAM, 512GB SSD",
                price_cents: 129_999,
                stock_quantity: 15,
            },
            DemoProduct {
                name: "Workstation 16",
                description: "16-inch mobile workstation with discrete GPU",
                price_cents: 249_900,
                stock_quantity: 5,
            },
        ],
    },
    DemoCategory {
        name: "Phones",
        description: "Smartphones and accessories",
        products: &[
            DemoProduct {
                name: "Phone Pro",
                description: "6.1-inch OLED, 256GB",
                price_cents: 99_900,
                stock_quantity: 25,
            },
            DemoProduct {
                name: "USB-C Charger 30W",
                description: "Compact wall charger",
                price_cents: 2_999,
                stock_quantity: 100,
            },
        ],
    },
    DemoCategory {
        name: "Audio",
        description: "Headphones and speakers",
        products: &[DemoProduct {
            name: "Noise Cancelling Headphones",
            description: "Over-ear, 30 hour battery",
            price_cents: 34_999,
            stock_quantity: 40,
        }],
    },
];

/// Counts from one seeding run.
#[derive(Debug, Default)]
pub struct SeedSummary {
    pub categories_inserted: usize,
    pub products_inserted: usize,
    pub skipped: usize,
}

/// Insert the demo catalog.
///
/// # Errors
///
/// Returns an error if the URL is missing or a query fails.
pub async fn catalog() -> Result<(), SeedError> {
    let database_url =
        super::database_url().ok_or(SeedError::MissingEnvVar("STORE_DATABASE_URL"))?;
    let pool = db::create_pool(&database_url).await?;
    tracing::info!("Connected to database");

    let summary = seed_catalog(&pool).await?;

    tracing::info!("Seeding complete!");
    tracing::info!("  Categories inserted: {}", summary.categories_inserted);
    tracing::info!("  Products inserted: {}", summary.products_inserted);
    tracing::info!("  Skipped (already exist): {}", summary.skipped);
    Ok(())
}

/// Insert every missing demo row in one transaction.
///
/// # Errors
///
/// Returns `sqlx::Error` if a query fails; nothing is written in that case.
pub async fn seed_catalog(pool: &PgPool) -> Result<SeedSummary, sqlx::Error> {
    let mut summary = SeedSummary::default();
    let mut tx = pool.begin().await?;

    for category in CATALOG {
        let inserted: Option<i32> = sqlx::query_scalar(
            r"
            INSERT INTO store.category (name, description)
            VALUES ($1, $2)
            ON CONFLICT (name) DO NOTHING
            RETURNING id
            ",
        )
        .bind(category.name)
        .bind(category.description)
        .fetch_optional(&mut *tx)
        .await?;

        let category_id = match inserted {
            Some(id) => {
                summary.categories_inserted += 1;
                id
            }
            None => {
                summary.skipped += 1;
                sqlx::query_scalar("SELECT id FROM store.category WHERE name = $1")
                    .bind(category.name)
                    .fetch_one(&mut *tx)
                    .await?
            }
        };

        for product in category.products {
            let result = sqlx::query(
                r"
                INSERT INTO store.product (name, description, price, stock_quantity, category_id)
                SELECT $1, $2, $3, $4, $5
                WHERE NOT EXISTS (
                    SELECT 1 FROM store.product WHERE name = $1 AND category_id = $5
                )
                ",
            )
            .bind(product.name)
            .bind(product.description)
            .bind(Money::from_cents(product.price_cents))
            .bind(product.stock_quantity)
            .bind(category_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                summary.skipped += 1;
            } else {
                summary.products_inserted += 1;
            }
        }
    }

    tx.commit().await?;
    Ok(summary)
}
