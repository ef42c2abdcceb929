//! Product repository: the keyed product collection and the atomic
//! reservation path.
//!
//! Stock consistency rests on one statement: the guarded decrement in
//! [`ProductRepository::reserve_unit`]. Every precondition (owning
//! profile, product key, depletable stock) lives in that statement's
//! predicate, so concurrent reservations serialize through the row lock
//! and at most `units_left` of them can ever succeed.

use sqlx::PgPool;
use sqlx::types::Json;

use droplink_core::Product;

use super::{RepositoryError, UpdateOutcome};

const PRODUCT_COLUMNS: &str = "product_id, title, price_url, image_url, images, drop_starts_at, \
     drop_ends_at, units_total, units_left, published";

/// Raw product row.
#[derive(sqlx::FromRow)]
struct ProductRow {
    product_id: String,
    title: String,
    price_url: String,
    image_url: String,
    images: Json<serde_json::Value>,
    drop_starts_at: Option<String>,
    drop_ends_at: Option<String>,
    units_total: Option<i32>,
    units_left: Option<i32>,
    published: Option<bool>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let images: Vec<String> = serde_json::from_value(row.images.0).unwrap_or_default();
        Self {
            id: row.product_id,
            title: row.title,
            price_url: row.price_url,
            image_url: row.image_url,
            images,
            drop_starts_at: row.drop_starts_at,
            drop_ends_at: row.drop_ends_at,
            units_total: row.units_total,
            units_left: row.units_left,
            published: row.published,
        }
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a profile's products in stored order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_token(&self, edit_token: &str) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE profile_id = (SELECT id FROM profiles WHERE edit_token = $1) \
             ORDER BY position"
        ))
        .bind(edit_token)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// List a profile's products by public slug, in stored order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_slug(&self, slug: &str) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE profile_id = (SELECT id FROM profiles WHERE slug = $1) \
             ORDER BY position"
        ))
        .bind(slug)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Replace a profile's product list wholesale.
    ///
    /// The product list is substituted as a unit (delete + insert in one
    /// transaction); positions come from payload order. Callers are
    /// expected to have clamped stock counters already
    /// (`Product::clamp_units`).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the token resolves to no
    /// profile, `RepositoryError::Database` for other failures.
    pub async fn replace_all(
        &self,
        edit_token: &str,
        products: &[Product],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let profile_id: Option<(uuid::Uuid,)> =
            sqlx::query_as("SELECT id FROM profiles WHERE edit_token = $1")
                .bind(edit_token)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((profile_id,)) = profile_id else {
            return Err(RepositoryError::Conflict("unknown profile".to_owned()));
        };

        sqlx::query("DELETE FROM products WHERE profile_id = $1")
            .bind(profile_id)
            .execute(&mut *tx)
            .await?;

        for (position, product) in products.iter().enumerate() {
            sqlx::query(
                "INSERT INTO products (profile_id, product_id, position, title, price_url, \
                 image_url, images, drop_starts_at, drop_ends_at, units_total, units_left, \
                 published) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(profile_id)
            .bind(&product.id)
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .bind(&product.title)
            .bind(&product.price_url)
            .bind(&product.image_url)
            .bind(Json(&product.images))
            .bind(&product.drop_starts_at)
            .bind(&product.drop_ends_at)
            .bind(product.units_total)
            .bind(product.units_left)
            .bind(product.published)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Atomically reserve one unit of stock.
    ///
    /// All preconditions sit in the update predicate: the profile with
    /// this token must own a product with this id whose `units_left` is
    /// present and at least 1. Zero matches (wrong token, wrong product,
    /// stock absent or exhausted) is a safe no-op reported through the
    /// outcome, not an error; losing the race for the last unit is an
    /// expected result. `units_left` can never go negative here.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn reserve_unit(
        &self,
        edit_token: &str,
        product_id: &str,
    ) -> Result<UpdateOutcome, RepositoryError> {
        let result = sqlx::query(
            "UPDATE products AS p \
             SET units_left = p.units_left - 1, updated_at = now() \
             FROM profiles AS pr \
             WHERE p.profile_id = pr.id \
               AND pr.edit_token = $1 \
               AND p.product_id = $2 \
               AND p.units_left >= 1",
        )
        .bind(edit_token)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        Ok(UpdateOutcome::rows(result.rows_affected()))
    }

    /// Set a product's remaining stock to an explicit value.
    ///
    /// Compensating operation for failed fulfillment or manual stock
    /// entry. The value is clamped to `units_total` when a ceiling is
    /// set; callers must have validated it as a non-negative integer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn restore_unit(
        &self,
        edit_token: &str,
        product_id: &str,
        units_left: i32,
    ) -> Result<UpdateOutcome, RepositoryError> {
        let result = sqlx::query(
            "UPDATE products AS p \
             SET units_left = LEAST($3, COALESCE(p.units_total, $3)), updated_at = now() \
             FROM profiles AS pr \
             WHERE p.profile_id = pr.id \
               AND pr.edit_token = $1 \
               AND p.product_id = $2",
        )
        .bind(edit_token)
        .bind(product_id)
        .bind(units_left)
        .execute(self.pool)
        .await?;

        Ok(UpdateOutcome::rows(result.rows_affected()))
    }
}
