use super::DBClient;
use crate::models::Category;
use uuid::Uuid;

pub trait CategoryExt {
    async fn get_categories(&self) -> Result<Vec<Category>, sqlx::Error>;

    async fn get_category(&self, category_id: Uuid) -> Result<Option<Category>, sqlx::Error>;

    async fn create_category(&self, name: &str) -> Result<Category, sqlx::Error>;

    async fn update_category(&self, category_id: Uuid, name: &str)
    -> Result<Category, sqlx::Error>;

    /// Fails with a foreign-key violation while products still reference
    /// the category (ON DELETE RESTRICT).
    async fn delete_category(&self, category_id: Uuid) -> Result<(), sqlx::Error>;
}

impl CategoryExt for DBClient {
    async fn get_categories(&self) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await
    }

    async fn get_category(&self, category_id: Uuid) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_category(&self, name: &str) -> Result<Category, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name) VALUES ($1) RETURNING *",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_category(
        &self,
        category_id: Uuid,
        name: &str,
    ) -> Result<Category, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(category_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_category(&self, category_id: Uuid) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }
}
