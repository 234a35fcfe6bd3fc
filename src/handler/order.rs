use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post, put};
use axum::{Extension, Router, middleware};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::db::{CreateOrderError, OrderExt};
use crate::dtos::{
    CreateOrderDto, OrderDto, OrderListResponseDto, OrderResponseDto, PaymentResultDto,
    SalesByDateResponseDto, TotalOrdersResponseDto, TotalSalesResponseDto,
};
use crate::error::{ErrorMessage, HttpError};
use crate::middleware::{JWTAuthMiddleware, auth, role_check};
use crate::models::{Order, UserRole};

pub fn order_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(create_order)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/",
            get(get_all_orders)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/mine",
            get(get_my_orders)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        // The reporting endpoints are public, as the storefront dashboard
        // reads them without credentials.
        .route("/total-orders", get(count_total_orders))
        .route("/total-sales", get(total_sales))
        .route("/total-sales-by-date", get(total_sales_by_date))
        .route(
            "/{order_id}",
            get(get_order)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{order_id}/pay",
            put(pay_order)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{order_id}/deliver",
            put(deliver_order)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

fn map_db_error(e: sqlx::Error) -> HttpError {
    tracing::error!("DB error: {}", e);
    HttpError::server_error(ErrorMessage::ServerError.to_string())
}

/// Orders belong to their owner; admins may read and pay any order.
fn check_order_access(order: &Order, jwt: &JWTAuthMiddleware) -> Result<(), HttpError> {
    if order.user_id != jwt.user.id && jwt.user.role != UserRole::Admin {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }
    Ok(())
}

async fn order_with_items(
    app_state: &AppState,
    order: &Order,
) -> Result<OrderDto, HttpError> {
    let items = app_state
        .db_client
        .get_order_items(order.id)
        .await
        .map_err(map_db_error)?;

    Ok(OrderDto::from_model(order, &items))
}

/// Checkout: snapshot the cart into an order in the unpaid state.
#[tracing::instrument(skip(app_state, jwt, body), fields(username = %jwt.user.username))]
pub async fn create_order(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateOrderDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let result = app_state
        .db_client
        .create_order(
            jwt.user.id,
            &body.order_items,
            &body.shipping_address,
            &body.payment_method,
        )
        .await;

    match result {
        Ok((order, items)) => {
            tracing::info!(order_id = %order.id, total = order.total_price, "Order created");
            Ok((
                StatusCode::CREATED,
                Json(OrderResponseDto {
                    status: "success".to_string(),
                    data: OrderDto::from_model(&order, &items),
                }),
            ))
        }
        Err(CreateOrderError::ProductNotFound(product_id)) => Err(HttpError::not_found(
            format!("Product not found: {}", product_id),
        )),
        Err(CreateOrderError::InsufficientStock(product_id)) => Err(HttpError::bad_request(
            format!(
                "{}: {}",
                ErrorMessage::InsufficientStock,
                product_id
            ),
        )),
        Err(CreateOrderError::Db(e)) => Err(map_db_error(e)),
    }
}

#[tracing::instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn get_my_orders(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let orders = app_state
        .db_client
        .get_user_orders(jwt.user.id)
        .await
        .map_err(map_db_error)?;

    let mut data = Vec::with_capacity(orders.len());
    for order in &orders {
        data.push(order_with_items(&app_state, order).await?);
    }

    Ok(Json(OrderListResponseDto {
        status: "success".to_string(),
        data,
    }))
}

#[tracing::instrument(skip(app_state))]
pub async fn get_all_orders(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let orders = app_state
        .db_client
        .get_all_orders()
        .await
        .map_err(map_db_error)?;

    let mut data = Vec::with_capacity(orders.len());
    for order in &orders {
        data.push(order_with_items(&app_state, order).await?);
    }

    Ok(Json(OrderListResponseDto {
        status: "success".to_string(),
        data,
    }))
}

#[tracing::instrument(skip(app_state, jwt))]
pub async fn get_order(
    Path(order_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let order = app_state
        .db_client
        .get_order(order_id)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::OrderNotFound.to_string()))?;

    check_order_access(&order, &jwt)?;

    Ok(Json(OrderResponseDto {
        status: "success".to_string(),
        data: order_with_items(&app_state, &order).await?,
    }))
}

/// Record the payment capture result. Calling this again overwrites the
/// previous capture snapshot; provider webhook retries rely on that.
#[tracing::instrument(skip(app_state, jwt, body))]
pub async fn pay_order(
    Path(order_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<PaymentResultDto>,
) -> Result<impl IntoResponse, HttpError> {
    let order = app_state
        .db_client
        .get_order(order_id)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::OrderNotFound.to_string()))?;

    check_order_access(&order, &jwt)?;

    let updated = app_state
        .db_client
        .mark_paid(order_id, &body)
        .await
        .map_err(map_db_error)?;

    tracing::info!(%order_id, "Order marked paid");

    Ok(Json(OrderResponseDto {
        status: "success".to_string(),
        data: order_with_items(&app_state, &updated).await?,
    }))
}

/// Admin-only. Delivery has no payment precondition.
#[tracing::instrument(skip(app_state))]
pub async fn deliver_order(
    Path(order_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let updated = app_state
        .db_client
        .mark_delivered(order_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                HttpError::not_found(ErrorMessage::OrderNotFound.to_string())
            }
            e => map_db_error(e),
        })?;

    tracing::info!(%order_id, "Order marked delivered");

    Ok(Json(OrderResponseDto {
        status: "success".to_string(),
        data: order_with_items(&app_state, &updated).await?,
    }))
}

#[tracing::instrument(skip(app_state))]
pub async fn count_total_orders(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let total_orders = app_state
        .db_client
        .count_orders()
        .await
        .map_err(map_db_error)?;

    Ok(Json(TotalOrdersResponseDto {
        status: "success".to_string(),
        total_orders,
    }))
}

#[tracing::instrument(skip(app_state))]
pub async fn total_sales(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let total_sales = app_state
        .db_client
        .total_sales()
        .await
        .map_err(map_db_error)?;

    Ok(Json(TotalSalesResponseDto {
        status: "success".to_string(),
        total_sales,
    }))
}

#[tracing::instrument(skip(app_state))]
pub async fn total_sales_by_date(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let data = app_state
        .db_client
        .total_sales_by_date()
        .await
        .map_err(map_db_error)?;

    Ok(Json(SalesByDateResponseDto {
        status: "success".to_string(),
        data,
    }))
}
