use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;

use crate::AppState;
use crate::dtos::PaypalConfigDto;
use crate::error::HttpError;

pub fn config_handler() -> Router<AppState> {
    Router::new().route("/paypal", get(get_paypal_config))
}

/// Hands the client the payment-provider client id it needs to render the
/// payment widget.
pub async fn get_paypal_config(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(PaypalConfigDto {
        client_id: app_state.env.paypal_client_id.clone(),
    }))
}
