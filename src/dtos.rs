use crate::models::{Category, Order, OrderItem, Product, Review, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// DTOs define the JSON shapes exchanged with the storefront client.
// They are separate from the database models so the API contract stays
// stable and camelCase while the models stay snake_case.

// ============================================================================
// User & auth DTOs
// ============================================================================

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterUserDto {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Profile update; absent fields are left unchanged.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateProfileDto {
    #[validate(length(min = 1, message = "Username cannot be empty"))]
    pub username: Option<String>,

    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

/// Admin-side user update, may toggle the admin flag.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateUserDto {
    #[validate(length(min = 1, message = "Username cannot be empty"))]
    pub username: Option<String>,

    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,

    pub is_admin: Option<bool>,
}

/// Client-safe user projection (no password hash).
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterUserDto {
    pub id: String,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            username: user.username.to_owned(),
            email: user.email.to_owned(),
            is_admin: user.role == crate::models::UserRole::Admin,
            created_at: user.created_at,
        }
    }

    pub fn filter_users(users: &[User]) -> Vec<FilterUserDto> {
        users.iter().map(FilterUserDto::filter_user).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub data: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponseDto {
    pub status: String,
    pub users: Vec<FilterUserDto>,
    pub results: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponseDto {
    pub status: String,
    pub access_token: String,
    pub user: FilterUserDto,
}

/// Generic success response.
#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}

/// Generic pagination query parameters.
#[derive(Serialize, Deserialize, Validate, Debug)]
pub struct RequestQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<i64>,

    #[validate(range(min = 1, max = 50))]
    pub limit: Option<i64>,
}

// ============================================================================
// Product DTOs
// ============================================================================

/// Query parameters for the keyword-searchable product list.
#[derive(Debug, Deserialize, Validate)]
pub struct ProductsQueryParams {
    #[validate(range(min = 1))]
    pub page: Option<i64>,

    pub keyword: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category_id: Option<String>,
    pub brand: String,
    pub stock: i32,
    pub image: String,
    pub rating: f64,
    pub num_reviews: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductDto {
    pub fn from_model(product: &Product) -> Self {
        ProductDto {
            id: product.id.to_string(),
            name: product.name.to_owned(),
            description: product.description.to_owned(),
            price: product.price,
            category_id: product.category_id.map(|id| id.to_string()),
            brand: product.brand.to_owned(),
            stock: product.stock,
            image: product.image.to_owned(),
            rating: product.rating,
            num_reviews: product.num_reviews,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }

    pub fn from_models(products: &[Product]) -> Vec<ProductDto> {
        products.iter().map(ProductDto::from_model).collect()
    }
}

/// Keyword-search page: fixed page size, with a has-more flag for the
/// client's infinite scroll.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPageResponseDto {
    pub status: String,
    pub products: Vec<ProductDto>,
    pub page: i64,
    pub pages: i64,
    pub has_more: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductListResponseDto {
    pub status: String,
    pub products: Vec<ProductDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductResponseDto {
    pub status: String,
    pub data: ProductDto,
}

/// Product create/update fields, parsed out of the admin multipart form.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct ProductFieldsDto {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    pub description: String,

    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: f64,

    pub category_id: Option<Uuid>,

    pub brand: String,

    #[validate(range(min = 0, message = "Stock must not be negative"))]
    pub stock: i32,

    pub image: String,
}

/// Body of POST /api/products/filtered. `checked` carries category ids;
/// all present criteria are applied conjunctively.
#[derive(Debug, Deserialize, Validate)]
pub struct FilterProductsDto {
    #[serde(default)]
    pub checked: Vec<Uuid>,

    pub brand: Option<String>,

    pub price: Option<String>,
}

// ============================================================================
// Review DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewInputDto {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,

    #[validate(length(min = 1, message = "Comment is required"))]
    pub comment: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDto {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl ReviewDto {
    pub fn from_model(review: &Review) -> Self {
        ReviewDto {
            id: review.id.to_string(),
            user_id: review.user_id.to_string(),
            name: review.name.to_owned(),
            rating: review.rating,
            comment: review.comment.to_owned(),
            created_at: review.created_at,
        }
    }
}

/// Product detail with its reviews inlined, mirroring the embedded reviews
/// the client expects.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProductDetailResponseDto {
    pub status: String,
    pub data: ProductDto,
    pub reviews: Vec<ReviewDto>,
}

// ============================================================================
// Category DTOs
// ============================================================================

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CategoryInputDto {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl CategoryDto {
    pub fn from_model(category: &Category) -> Self {
        CategoryDto {
            id: category.id.to_string(),
            name: category.name.to_owned(),
            created_at: category.created_at,
        }
    }

    pub fn from_models(categories: &[Category]) -> Vec<CategoryDto> {
        categories.iter().map(CategoryDto::from_model).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryResponseDto {
    pub status: String,
    pub data: CategoryDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryListResponseDto {
    pub status: String,
    pub data: Vec<CategoryDto>,
}

// ============================================================================
// Order DTOs
// ============================================================================

#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInputDto {
    pub product_id: Uuid,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub qty: i32,
}

#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressDto {
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,

    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,

    #[validate(length(min = 1, message = "Postal code is required"))]
    pub postal_code: String,

    #[validate(length(min = 1, message = "Country is required"))]
    pub country: String,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderDto {
    #[validate(length(min = 1, message = "No order items"), nested)]
    pub order_items: Vec<OrderItemInputDto>,

    #[validate(nested)]
    pub shipping_address: ShippingAddressDto,

    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
}

/// Opaque capture result forwarded by the client from the payment widget.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct PaymentResultDto {
    pub id: Option<String>,
    pub status: Option<String>,
    pub update_time: Option<String>,
    pub email_address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDto {
    pub product_id: String,
    pub name: String,
    pub image: String,
    pub price: f64,
    pub qty: i32,
}

impl OrderItemDto {
    pub fn from_model(item: &OrderItem) -> Self {
        OrderItemDto {
            product_id: item.product_id.to_string(),
            name: item.name.to_owned(),
            image: item.image.to_owned(),
            price: item.price,
            qty: item.qty,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    pub id: String,
    pub user_id: String,
    pub order_items: Vec<OrderItemDto>,
    pub shipping_address: ShippingAddressDto,
    pub payment_method: String,
    pub items_price: f64,
    pub shipping_price: f64,
    pub tax_price: f64,
    pub total_price: f64,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OrderDto {
    pub fn from_model(order: &Order, items: &[OrderItem]) -> Self {
        OrderDto {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            order_items: items.iter().map(OrderItemDto::from_model).collect(),
            shipping_address: ShippingAddressDto {
                address: order.shipping_address.to_owned(),
                city: order.shipping_city.to_owned(),
                postal_code: order.shipping_postal_code.to_owned(),
                country: order.shipping_country.to_owned(),
            },
            payment_method: order.payment_method.to_owned(),
            items_price: order.items_price,
            shipping_price: order.shipping_price,
            tax_price: order.tax_price,
            total_price: order.total_price,
            is_paid: order.is_paid,
            paid_at: order.paid_at,
            is_delivered: order.is_delivered,
            delivered_at: order.delivered_at,
            created_at: order.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponseDto {
    pub status: String,
    pub data: OrderDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListResponseDto {
    pub status: String,
    pub data: Vec<OrderDto>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalOrdersResponseDto {
    pub status: String,
    pub total_orders: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalSalesResponseDto {
    pub status: String,
    pub total_sales: f64,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SalesByDateDto {
    pub date: chrono::NaiveDate,
    pub total_sales: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SalesByDateResponseDto {
    pub status: String,
    pub data: Vec<SalesByDateDto>,
}

// ============================================================================
// Config & upload DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaypalConfigDto {
    pub client_id: String,
}

/// Image upload response: the public path the product form stores.
#[derive(Serialize)]
pub struct UploadResponseDto {
    pub status: String,
    pub image: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_rejects_short_password() {
        let dto = RegisterUserDto {
            username: "john".to_string(),
            email: "john@example.com".to_string(),
            password: "12345".to_string(),
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn register_rejects_bad_email() {
        let dto = RegisterUserDto {
            username: "john".to_string(),
            email: "not-an-email".to_string(),
            password: "123456".to_string(),
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn review_rating_must_be_in_range() {
        let ok = ReviewInputDto {
            rating: 5,
            comment: "great".to_string(),
        };
        assert!(ok.validate().is_ok());

        let too_high = ReviewInputDto {
            rating: 6,
            comment: "great".to_string(),
        };
        assert!(too_high.validate().is_err());

        let too_low = ReviewInputDto {
            rating: 0,
            comment: "great".to_string(),
        };
        assert!(too_low.validate().is_err());
    }

    #[test]
    fn create_order_rejects_empty_items_and_zero_qty() {
        let address = ShippingAddressDto {
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
            country: "US".to_string(),
        };

        let empty = CreateOrderDto {
            order_items: vec![],
            shipping_address: address.clone(),
            payment_method: "PayPal".to_string(),
        };
        assert!(empty.validate().is_err());

        let zero_qty = CreateOrderDto {
            order_items: vec![OrderItemInputDto {
                product_id: Uuid::new_v4(),
                qty: 0,
            }],
            shipping_address: address,
            payment_method: "PayPal".to_string(),
        };
        assert!(zero_qty.validate().is_err());
    }

    #[test]
    fn order_dto_uses_camel_case_on_the_wire() {
        let dto = OrderItemInputDto {
            product_id: Uuid::nil(),
            qty: 2,
        };
        let json = serde_json::to_string(&dto).unwrap();
        assert!(json.contains("productId"));
    }
}
