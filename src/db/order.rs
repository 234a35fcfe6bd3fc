use super::DBClient;
use crate::dtos::{OrderItemInputDto, PaymentResultDto, SalesByDateDto, ShippingAddressDto};
use crate::models::{Order, OrderItem};
use crate::pricing;
use uuid::Uuid;

/// Order creation can fail on domain rules, not just the database.
#[derive(Debug)]
pub enum CreateOrderError {
    ProductNotFound(Uuid),
    InsufficientStock(Uuid),
    Db(sqlx::Error),
}

impl From<sqlx::Error> for CreateOrderError {
    fn from(err: sqlx::Error) -> Self {
        CreateOrderError::Db(err)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductSnapshot {
    name: String,
    image: String,
    price: f64,
}

pub trait OrderExt {
    /// Create an order from a cart payload. Stock is claimed with a
    /// conditional decrement inside the transaction, so a failing line item
    /// rolls back the whole order and oversell cannot commit.
    async fn create_order(
        &self,
        user_id: Uuid,
        items: &[OrderItemInputDto],
        address: &ShippingAddressDto,
        payment_method: &str,
    ) -> Result<(Order, Vec<OrderItem>), CreateOrderError>;

    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, sqlx::Error>;

    async fn get_order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, sqlx::Error>;

    async fn get_user_orders(&self, user_id: Uuid) -> Result<Vec<Order>, sqlx::Error>;

    async fn get_all_orders(&self) -> Result<Vec<Order>, sqlx::Error>;

    /// Record a payment capture. Deliberately not idempotent: a repeat call
    /// overwrites paid_at and the payment snapshot (provider retries resend
    /// the capture result).
    async fn mark_paid(
        &self,
        order_id: Uuid,
        payment: &PaymentResultDto,
    ) -> Result<Order, sqlx::Error>;

    async fn mark_delivered(&self, order_id: Uuid) -> Result<Order, sqlx::Error>;

    async fn count_orders(&self) -> Result<i64, sqlx::Error>;

    /// Sum of total_price over all orders, paid or not.
    async fn total_sales(&self) -> Result<f64, sqlx::Error>;

    /// Paid orders grouped by the calendar date of paid_at, chronological.
    async fn total_sales_by_date(&self) -> Result<Vec<SalesByDateDto>, sqlx::Error>;
}

impl OrderExt for DBClient {
    async fn create_order(
        &self,
        user_id: Uuid,
        items: &[OrderItemInputDto],
        address: &ShippingAddressDto,
        payment_method: &str,
    ) -> Result<(Order, Vec<OrderItem>), CreateOrderError> {
        let mut tx = self.pool.begin().await?;

        let mut snapshots: Vec<(Uuid, ProductSnapshot, i32)> = Vec::with_capacity(items.len());

        for item in items {
            let claimed = sqlx::query_as::<_, ProductSnapshot>(
                r#"
                UPDATE products
                SET stock = stock - $2, updated_at = NOW()
                WHERE id = $1 AND stock >= $2
                RETURNING name, image, price
                "#,
            )
            .bind(item.product_id)
            .bind(item.qty)
            .fetch_optional(&mut *tx)
            .await?;

            match claimed {
                Some(snapshot) => snapshots.push((item.product_id, snapshot, item.qty)),
                None => {
                    // Zero rows: the product is missing, or its stock is
                    // too low. Tell them apart for the error message.
                    let exists = sqlx::query_scalar::<_, bool>(
                        "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)",
                    )
                    .bind(item.product_id)
                    .fetch_one(&mut *tx)
                    .await?;

                    return Err(if exists {
                        CreateOrderError::InsufficientStock(item.product_id)
                    } else {
                        CreateOrderError::ProductNotFound(item.product_id)
                    });
                }
            }
        }

        let line_prices: Vec<(f64, i32)> = snapshots
            .iter()
            .map(|(_, snapshot, qty)| (snapshot.price, *qty))
            .collect();
        let pricing = pricing::compute_order_pricing(&line_prices);

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (
                user_id, shipping_address, shipping_city, shipping_postal_code,
                shipping_country, payment_method,
                items_price, shipping_price, tax_price, total_price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&address.address)
        .bind(&address.city)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(payment_method)
        .bind(pricing.items_price)
        .bind(pricing.shipping_price)
        .bind(pricing.tax_price)
        .bind(pricing.total_price)
        .fetch_one(&mut *tx)
        .await?;

        let mut order_items = Vec::with_capacity(snapshots.len());
        for (product_id, snapshot, qty) in &snapshots {
            let order_item = sqlx::query_as::<_, OrderItem>(
                r#"
                INSERT INTO order_items (order_id, product_id, name, image, price, qty)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
                "#,
            )
            .bind(order.id)
            .bind(product_id)
            .bind(&snapshot.name)
            .bind(&snapshot.image)
            .bind(snapshot.price)
            .bind(qty)
            .fetch_one(&mut *tx)
            .await?;

            order_items.push(order_item);
        }

        tx.commit().await?;

        Ok((order, order_items))
    }

    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, sqlx::Error> {
        sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_user_orders(&self, user_id: Uuid) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_all_orders(&self) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC, id")
            .fetch_all(&self.pool)
            .await
    }

    async fn mark_paid(
        &self,
        order_id: Uuid,
        payment: &PaymentResultDto,
    ) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET is_paid = TRUE,
                paid_at = NOW(),
                payment_id = $2,
                payment_status = $3,
                payment_update_time = $4,
                payment_email = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(&payment.id)
        .bind(&payment.status)
        .bind(&payment.update_time)
        .bind(&payment.email_address)
        .fetch_one(&self.pool)
        .await
    }

    async fn mark_delivered(&self, order_id: Uuid) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET is_delivered = TRUE, delivered_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(order_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn count_orders(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await
    }

    async fn total_sales(&self) -> Result<f64, sqlx::Error> {
        sqlx::query_scalar::<_, f64>("SELECT COALESCE(SUM(total_price), 0) FROM orders")
            .fetch_one(&self.pool)
            .await
    }

    async fn total_sales_by_date(&self) -> Result<Vec<SalesByDateDto>, sqlx::Error> {
        sqlx::query_as::<_, SalesByDateDto>(
            r#"
            SELECT paid_at::date AS date, SUM(total_price)::float8 AS total_sales
            FROM orders
            WHERE is_paid = TRUE
            GROUP BY paid_at::date
            ORDER BY paid_at::date
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}
