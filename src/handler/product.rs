use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post, put};
use axum::{Extension, Router, middleware};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::db::ProductExt;
use crate::dtos::{
    FilterProductsDto, ProductDetailResponseDto, ProductDto, ProductFieldsDto,
    ProductListResponseDto, ProductPageResponseDto, ProductResponseDto, ProductsQueryParams,
    Response, ReviewDto, ReviewInputDto,
};
use crate::error::{ErrorMessage, HttpError};
use crate::middleware::{JWTAuthMiddleware, auth, role_check};
use crate::models::UserRole;
use crate::pricing;

// Storefront home shows six products per page.
const PAGE_SIZE: i64 = 6;
const TOP_PRODUCTS_LIMIT: i64 = 4;
const NEW_PRODUCTS_LIMIT: i64 = 5;
const ALL_PRODUCTS_LIMIT: i64 = 12;

pub fn product_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_products))
        .route(
            "/",
            post(create_product)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route("/all", get(get_all_products))
        .route("/top", get(get_top_products))
        .route("/new", get(get_new_products))
        .route("/filtered", post(filter_products))
        .route("/{product_id}", get(get_product))
        .route(
            "/{product_id}",
            put(update_product)
                .delete(delete_product)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{product_id}/reviews",
            post(create_review)
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// Read the admin product form out of a multipart body. The image arrives
/// as a path string previously returned by the upload endpoint.
async fn parse_product_form(mut multipart: Multipart) -> Result<ProductFieldsDto, HttpError> {
    let mut fields = ProductFieldsDto::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::bad_request(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let value = field
            .text()
            .await
            .map_err(|e| HttpError::bad_request(e.to_string()))?;

        match name.as_str() {
            "name" => fields.name = value,
            "description" => fields.description = value,
            "price" => {
                fields.price = value
                    .parse::<f64>()
                    .map_err(|_| HttpError::bad_request("Price must be a number"))?;
            }
            "category" => {
                if !value.is_empty() {
                    let id = Uuid::parse_str(&value)
                        .map_err(|_| HttpError::bad_request("Category id is invalid"))?;
                    fields.category_id = Some(id);
                }
            }
            "brand" => fields.brand = value,
            "stock" => {
                fields.stock = value
                    .parse::<i32>()
                    .map_err(|_| HttpError::bad_request("Stock must be an integer"))?;
            }
            "image" => fields.image = value,
            _ => {}
        }
    }

    fields
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    Ok(fields)
}

fn map_db_error(e: sqlx::Error) -> HttpError {
    tracing::error!("DB error: {}", e);
    HttpError::server_error(ErrorMessage::ServerError.to_string())
}

/// Keyword-searchable product page for the storefront home.
#[tracing::instrument(skip(app_state))]
pub async fn get_products(
    Query(params): Query<ProductsQueryParams>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = params.page.unwrap_or(1);
    let keyword = params.keyword.as_deref().filter(|k| !k.is_empty());

    let products = app_state
        .db_client
        .get_products(keyword, page, PAGE_SIZE)
        .await
        .map_err(map_db_error)?;

    let total = app_state
        .db_client
        .get_product_count(keyword)
        .await
        .map_err(map_db_error)?;

    let pages = (total as f64 / PAGE_SIZE as f64).ceil() as i64;

    Ok(Json(ProductPageResponseDto {
        status: "success".to_string(),
        products: ProductDto::from_models(&products),
        page,
        pages,
        has_more: page < pages,
    }))
}

#[tracing::instrument(skip(app_state))]
pub async fn get_all_products(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let products = app_state
        .db_client
        .get_all_products(ALL_PRODUCTS_LIMIT)
        .await
        .map_err(map_db_error)?;

    Ok(Json(ProductListResponseDto {
        status: "success".to_string(),
        products: ProductDto::from_models(&products),
    }))
}

#[tracing::instrument(skip(app_state))]
pub async fn get_top_products(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let products = app_state
        .db_client
        .get_top_products(TOP_PRODUCTS_LIMIT)
        .await
        .map_err(map_db_error)?;

    Ok(Json(ProductListResponseDto {
        status: "success".to_string(),
        products: ProductDto::from_models(&products),
    }))
}

#[tracing::instrument(skip(app_state))]
pub async fn get_new_products(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let products = app_state
        .db_client
        .get_new_products(NEW_PRODUCTS_LIMIT)
        .await
        .map_err(map_db_error)?;

    Ok(Json(ProductListResponseDto {
        status: "success".to_string(),
        products: ProductDto::from_models(&products),
    }))
}

/// Conjunctive category/brand/price filter backing the shop page.
///
/// Category and brand narrow the query; the price check keeps the shop
/// page's exact predicate: the price's decimal string contains the typed
/// filter, or the price equals it parsed as an integer.
#[tracing::instrument(skip(app_state, body))]
pub async fn filter_products(
    State(app_state): State<AppState>,
    Json(body): Json<FilterProductsDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let products = app_state
        .db_client
        .get_filtered_products(&body.checked, body.brand.as_deref())
        .await
        .map_err(map_db_error)?;

    let products: Vec<_> = match body.price.as_deref().filter(|p| !p.is_empty()) {
        Some(price_filter) => products
            .into_iter()
            .filter(|p| pricing::price_matches(p.price, price_filter))
            .collect(),
        None => products,
    };

    Ok(Json(ProductListResponseDto {
        status: "success".to_string(),
        products: ProductDto::from_models(&products),
    }))
}

/// Product detail with reviews inlined.
#[tracing::instrument(skip(app_state))]
pub async fn get_product(
    Path(product_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let product = app_state
        .db_client
        .get_product(product_id)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ProductNotFound.to_string()))?;

    let reviews = app_state
        .db_client
        .get_reviews(product_id)
        .await
        .map_err(map_db_error)?;

    Ok(Json(ProductDetailResponseDto {
        status: "success".to_string(),
        data: ProductDto::from_model(&product),
        reviews: reviews.iter().map(ReviewDto::from_model).collect(),
    }))
}

#[tracing::instrument(skip(app_state, multipart))]
pub async fn create_product(
    State(app_state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let fields = parse_product_form(multipart).await?;

    let result = app_state.db_client.create_product(&fields).await;

    match result {
        Ok(product) => {
            tracing::info!(product_id = %product.id, "Product created");
            Ok((
                StatusCode::CREATED,
                Json(ProductResponseDto {
                    status: "success".to_string(),
                    data: ProductDto::from_model(&product),
                }),
            ))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => Err(
            HttpError::bad_request(ErrorMessage::CategoryNotFound.to_string()),
        ),
        Err(e) => Err(map_db_error(e)),
    }
}

#[tracing::instrument(skip(app_state, multipart))]
pub async fn update_product(
    Path(product_id): Path<Uuid>,
    State(app_state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let fields = parse_product_form(multipart).await?;

    let result = app_state
        .db_client
        .update_product(product_id, &fields)
        .await;

    match result {
        Ok(product) => Ok(Json(ProductResponseDto {
            status: "success".to_string(),
            data: ProductDto::from_model(&product),
        })),
        Err(sqlx::Error::RowNotFound) => Err(HttpError::not_found(
            ErrorMessage::ProductNotFound.to_string(),
        )),
        Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => Err(
            HttpError::bad_request(ErrorMessage::CategoryNotFound.to_string()),
        ),
        Err(e) => Err(map_db_error(e)),
    }
}

#[tracing::instrument(skip(app_state))]
pub async fn delete_product(
    Path(product_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_product(product_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                HttpError::not_found(ErrorMessage::ProductNotFound.to_string())
            }
            e => map_db_error(e),
        })?;

    tracing::info!(%product_id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// One review per user per product; the author's display name is
/// snapshotted into the review.
#[tracing::instrument(skip(app_state, jwt, body), fields(username = %jwt.user.username))]
pub async fn create_review(
    Path(product_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<ReviewInputDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    app_state
        .db_client
        .get_product(product_id)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ProductNotFound.to_string()))?;

    let result = app_state
        .db_client
        .add_review(
            product_id,
            jwt.user.id,
            &jwt.user.username,
            body.rating,
            &body.comment,
        )
        .await;

    match result {
        Ok(review) => {
            tracing::info!(%product_id, review_id = %review.id, "Review added");
            Ok((
                StatusCode::CREATED,
                Json(Response {
                    status: "success",
                    message: "Review added".to_string(),
                }),
            ))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            HttpError::bad_request(ErrorMessage::AlreadyReviewed.to_string()),
        ),
        Err(e) => Err(map_db_error(e)),
    }
}
