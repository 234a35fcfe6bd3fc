use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post, put};
use axum::{Router, middleware};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::db::CategoryExt;
use crate::dtos::{CategoryDto, CategoryInputDto, CategoryListResponseDto, CategoryResponseDto};
use crate::error::{ErrorMessage, HttpError};
use crate::middleware::{auth, role_check};
use crate::models::UserRole;

pub fn category_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_categories))
        .route(
            "/",
            post(create_category)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route("/{category_id}", get(get_category))
        .route(
            "/{category_id}",
            put(update_category)
                .delete(delete_category)
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

#[tracing::instrument(skip(app_state))]
pub async fn get_categories(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let categories = app_state
        .db_client
        .get_categories()
        .await
        .map_err(map_db_error)?;

    Ok(Json(CategoryListResponseDto {
        status: "success".to_string(),
        data: CategoryDto::from_models(&categories),
    }))
}

#[tracing::instrument(skip(app_state))]
pub async fn get_category(
    Path(category_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let category = app_state
        .db_client
        .get_category(category_id)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::CategoryNotFound.to_string()))?;

    Ok(Json(CategoryResponseDto {
        status: "success".to_string(),
        data: CategoryDto::from_model(&category),
    }))
}

#[tracing::instrument(skip(app_state, body))]
pub async fn create_category(
    State(app_state): State<AppState>,
    Json(body): Json<CategoryInputDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let result = app_state.db_client.create_category(&body.name).await;

    match result {
        Ok(category) => {
            tracing::info!(name = %category.name, "Category created");
            Ok((
                StatusCode::CREATED,
                Json(CategoryResponseDto {
                    status: "success".to_string(),
                    data: CategoryDto::from_model(&category),
                }),
            ))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            HttpError::unique_constraint_violation("Category already exists"),
        ),
        Err(e) => Err(map_db_error(e)),
    }
}

#[tracing::instrument(skip(app_state, body))]
pub async fn update_category(
    Path(category_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Json(body): Json<CategoryInputDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let result = app_state
        .db_client
        .update_category(category_id, &body.name)
        .await;

    match result {
        Ok(category) => Ok(Json(CategoryResponseDto {
            status: "success".to_string(),
            data: CategoryDto::from_model(&category),
        })),
        Err(sqlx::Error::RowNotFound) => Err(HttpError::not_found(
            ErrorMessage::CategoryNotFound.to_string(),
        )),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            HttpError::unique_constraint_violation("Category already exists"),
        ),
        Err(e) => Err(map_db_error(e)),
    }
}

/// Deletion is refused while any product still references the category.
#[tracing::instrument(skip(app_state))]
pub async fn delete_category(
    Path(category_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let result = app_state.db_client.delete_category(category_id).await;

    match result {
        Ok(()) => {
            tracing::info!(%category_id, "Category deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(sqlx::Error::RowNotFound) => Err(HttpError::not_found(
            ErrorMessage::CategoryNotFound.to_string(),
        )),
        Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => Err(
            HttpError::unique_constraint_violation(ErrorMessage::CategoryInUse.to_string()),
        ),
        Err(e) => Err(map_db_error(e)),
    }
}
