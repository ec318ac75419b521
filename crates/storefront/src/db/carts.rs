//! Persisted carts, one row per (customer, product).

use sqlx::{PgConnection, PgPool};

use tech_store_core::{Cart, CartLine, CartProduct, Money, ProductId, UserId};

use super::RepositoryError;
use super::orders::{PlaceOrderError, place_in};
use crate::models::PlacedOrder;

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    product_id: i32,
    name: String,
    price: Money,
    image_url: Option<String>,
    quantity: i32,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            product_id: ProductId::new(row.product_id),
            name: row.name,
            price: row.price,
            image_url: row.image_url,
            quantity: row.quantity,
        }
    }
}

async fn load(conn: &mut PgConnection, user_id: UserId, lock: bool) -> Result<Cart, sqlx::Error> {
    let sql = if lock {
        r"
        SELECT product_id, name, price, image_url, quantity
        FROM store.cart_line
        WHERE user_id = $1
        ORDER BY added_at, product_id
        FOR UPDATE
        "
    } else {
        r"
        SELECT product_id, name, price, image_url, quantity
        FROM store.cart_line
        WHERE user_id = $1
        ORDER BY added_at, product_id
        "
    };

    let rows = sqlx::query_as::<_, CartLineRow>(sql)
        .bind(user_id)
        .fetch_all(conn)
        .await?;

    Ok(Cart::from_lines(rows.into_iter().map(Into::into).collect()))
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load a customer's cart in the order lines were added.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(load(&mut *conn, user_id, false).await?)
    }

    /// Add `quantity` of `product`, merging into an existing line. A merged
    /// line is capped at the stock passed in `product`.
    ///
    /// The snapshot columns are written on first insert and left alone on merge.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add(
        &self,
        user_id: UserId,
        product: &CartProduct,
        quantity: i32,
    ) -> Result<Cart, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO store.cart_line (user_id, product_id, quantity, name, price, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = LEAST(
                store.cart_line.quantity::BIGINT + EXCLUDED.quantity,
                GREATEST($7, EXCLUDED.quantity)
            )::INTEGER
            ",
        )
        .bind(user_id)
        .bind(product.id)
        .bind(quantity)
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.image_url)
        .bind(product.stock_quantity)
        .execute(&mut *tx)
        .await?;

        let cart = load(&mut *tx, user_id, false).await?;
        tx.commit().await?;
        Ok(cart)
    }

    /// Change a line's quantity by `delta`, removing it at zero or below.
    ///
    /// Adjusting a product that is not in the cart changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn adjust(
        &self,
        user_id: UserId,
        product_id: ProductId,
        delta: i32,
    ) -> Result<Cart, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut cart = load(&mut *tx, user_id, true).await?;

        if cart.get(product_id).is_some() {
            match cart.adjust(product_id, delta) {
                Some(quantity) => {
                    sqlx::query(
                        r"
                        UPDATE store.cart_line
                        SET quantity = $3
                        WHERE user_id = $1 AND product_id = $2
                        ",
                    )
                    .bind(user_id)
                    .bind(product_id)
                    .bind(quantity)
                    .execute(&mut *tx)
                    .await?;
                }
                None => {
                    delete_line(&mut *tx, user_id, product_id).await?;
                }
            }
        }

        tx.commit().await?;
        Ok(cart)
    }

    /// Remove a product's line. Removing an absent line is not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Cart, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        delete_line(&mut *tx, user_id, product_id).await?;
        let cart = load(&mut *tx, user_id, false).await?;
        tx.commit().await?;
        Ok(cart)
    }

    /// Turn the cart into an order and empty it, atomically.
    ///
    /// Orders are priced from the live catalog, not the cart snapshot.
    ///
    /// # Errors
    ///
    /// Any [`PlaceOrderError`]; on error the cart is left as it was.
    pub async fn checkout(&self, user_id: UserId) -> Result<PlacedOrder, PlaceOrderError> {
        let mut tx = self.pool.begin().await?;

        let cart = load(&mut *tx, user_id, true).await?;
        let placed = place_in(&mut *tx, user_id, &cart.order_lines()).await?;

        sqlx::query("DELETE FROM store.cart_line WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(placed)
    }
}

async fn delete_line(
    conn: &mut PgConnection,
    user_id: UserId,
    product_id: ProductId,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM store.cart_line WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(())
}
