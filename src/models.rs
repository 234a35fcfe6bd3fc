use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User role for role-based access control.
///
/// Stored in PostgreSQL as the "user_role" ENUM type.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }
}

/// User account row. `password` holds the argon2 hash, never plain text.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Catalog product.
///
/// `rating` and `num_reviews` are derived columns, recomputed in the same
/// transaction whenever a review is inserted. Invariants:
/// `num_reviews == count(reviews)` and `rating == mean(reviews.rating)`
/// rounded to one decimal.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category_id: Option<Uuid>,
    pub brand: String,
    pub stock: i32,
    pub image: String,
    pub rating: f64,
    pub num_reviews: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product review. Immutable once created; one review per user per product
/// (unique constraint on product_id + user_id).
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    // Author display name captured at review time.
    pub name: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order header. Payment result fields are an opaque snapshot of whatever
/// the payment provider returned at capture time.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_postal_code: String,
    pub shipping_country: String,
    pub payment_method: String,
    pub items_price: f64,
    pub shipping_price: f64,
    pub tax_price: f64,
    pub total_price: f64,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_id: Option<String>,
    pub payment_status: Option<String>,
    pub payment_update_time: Option<String>,
    pub payment_email: Option<String>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order line item: a snapshot of the product at order-creation time,
/// decoupled from later price or name edits.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub image: String,
    pub price: f64,
    pub qty: i32,
}
