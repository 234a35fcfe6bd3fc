use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::post;
use axum::{Router, middleware};
use uuid::Uuid;

use crate::AppState;
use crate::dtos::UploadResponseDto;
use crate::error::{ErrorMessage, HttpError};
use crate::middleware::{auth, role_check};
use crate::models::UserRole;

pub fn upload_handler(app_state: AppState) -> Router<AppState> {
    Router::new().route(
        "/",
        post(upload_image)
            .route_layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Admin])
            }))
            .route_layer(middleware::from_fn_with_state(app_state, auth)),
    )
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Store a product image under the upload directory and answer with the
/// public path the product form persists.
#[tracing::instrument(skip(app_state, multipart))]
pub async fn upload_image(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::bad_request(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let extension = extension_for(&content_type)
            .ok_or_else(|| HttpError::bad_request("Images only (jpeg, png, webp)"))?;

        let data = field
            .bytes()
            .await
            .map_err(|e| HttpError::bad_request(e.to_string()))?;

        let filename = format!("image-{}.{}", Uuid::new_v4(), extension);
        let path = std::path::Path::new(&app_state.env.upload_dir).join(&filename);

        tokio::fs::create_dir_all(&app_state.env.upload_dir)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create upload dir: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?;

        tokio::fs::write(&path, &data).await.map_err(|e| {
            tracing::error!("Failed to write upload: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

        tracing::info!(%filename, size = data.len(), "Image uploaded");

        return Ok((
            StatusCode::CREATED,
            Json(UploadResponseDto {
                status: "success".to_string(),
                image: format!("/uploads/{}", filename),
            }),
        ));
    }

    Err(HttpError::bad_request("No image file provided"))
}
