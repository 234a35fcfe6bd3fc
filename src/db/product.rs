use super::DBClient;
use crate::dtos::ProductFieldsDto;
use crate::models::{Product, Review};
use crate::pricing;
use uuid::Uuid;

pub trait ProductExt {
    /// Keyword page for the storefront home: case-insensitive substring
    /// match on the name, newest first.
    async fn get_products(
        &self,
        keyword: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<Vec<Product>, sqlx::Error>;

    async fn get_product_count(&self, keyword: Option<&str>) -> Result<i64, sqlx::Error>;

    /// Admin catalog view: newest first, capped.
    async fn get_all_products(&self, limit: i64) -> Result<Vec<Product>, sqlx::Error>;

    /// Conjunctive category/brand selection. An empty category set means
    /// no category restriction. Price filtering happens above this layer.
    async fn get_filtered_products(
        &self,
        category_ids: &[Uuid],
        brand: Option<&str>,
    ) -> Result<Vec<Product>, sqlx::Error>;

    async fn get_top_products(&self, limit: i64) -> Result<Vec<Product>, sqlx::Error>;

    async fn get_new_products(&self, limit: i64) -> Result<Vec<Product>, sqlx::Error>;

    async fn get_product(&self, product_id: Uuid) -> Result<Option<Product>, sqlx::Error>;

    async fn create_product(&self, fields: &ProductFieldsDto) -> Result<Product, sqlx::Error>;

    async fn update_product(
        &self,
        product_id: Uuid,
        fields: &ProductFieldsDto,
    ) -> Result<Product, sqlx::Error>;

    async fn delete_product(&self, product_id: Uuid) -> Result<(), sqlx::Error>;

    async fn get_reviews(&self, product_id: Uuid) -> Result<Vec<Review>, sqlx::Error>;

    /// Insert a review and recompute the product's rating and review count
    /// in the same transaction. The unique (product_id, user_id) constraint
    /// rejects a second review from the same user.
    async fn add_review(
        &self,
        product_id: Uuid,
        user_id: Uuid,
        name: &str,
        rating: i32,
        comment: &str,
    ) -> Result<Review, sqlx::Error>;
}

impl ProductExt for DBClient {
    async fn get_products(
        &self,
        keyword: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<Vec<Product>, sqlx::Error> {
        let offset = super::page_offset(page, limit);

        sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%')
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(keyword)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_product_count(&self, keyword: Option<&str>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM products
            WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%')
            "#,
        )
        .bind(keyword)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_all_products(&self, limit: i64) -> Result<Vec<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            "SELECT * FROM products ORDER BY created_at DESC, id LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_filtered_products(
        &self,
        category_ids: &[Uuid],
        brand: Option<&str>,
    ) -> Result<Vec<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE (cardinality($1::uuid[]) = 0 OR category_id = ANY($1))
              AND ($2::text IS NULL OR brand = $2)
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(category_ids.to_vec())
        .bind(brand)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_top_products(&self, limit: i64) -> Result<Vec<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            "SELECT * FROM products ORDER BY rating DESC, id LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_new_products(&self, limit: i64) -> Result<Vec<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            "SELECT * FROM products ORDER BY created_at DESC, id LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_product(&self, product_id: Uuid) -> Result<Option<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_product(&self, fields: &ProductFieldsDto) -> Result<Product, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, description, price, category_id, brand, stock, image)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.price)
        .bind(fields.category_id)
        .bind(&fields.brand)
        .bind(fields.stock)
        .bind(&fields.image)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_product(
        &self,
        product_id: Uuid,
        fields: &ProductFieldsDto,
    ) -> Result<Product, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = $2, description = $3, price = $4, category_id = $5,
                brand = $6, stock = $7, image = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.price)
        .bind(fields.category_id)
        .bind(&fields.brand)
        .bind(fields.stock)
        .bind(&fields.image)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_product(&self, product_id: Uuid) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    async fn get_reviews(&self, product_id: Uuid) -> Result<Vec<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE product_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn add_review(
        &self,
        product_id: Uuid,
        user_id: Uuid,
        name: &str,
        rating: i32,
        comment: &str,
    ) -> Result<Review, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (product_id, user_id, name, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(user_id)
        .bind(name)
        .bind(rating)
        .bind(comment)
        .fetch_one(&mut *tx)
        .await?;

        let ratings = sqlx::query_scalar::<_, i32>(
            "SELECT rating FROM reviews WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_all(&mut *tx)
        .await?;

        // Keep the derived columns in step with the reviews table.
        sqlx::query(
            r#"
            UPDATE products
            SET num_reviews = $2, rating = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .bind(ratings.len() as i32)
        .bind(pricing::aggregate_rating(&ratings))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(review)
    }
}
