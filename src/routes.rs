use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    handler::{
        category::category_handler, config::config_handler, order::order_handler,
        product::product_handler, upload::upload_handler, users::users_handler,
    },
};

pub fn create_router(app_state: AppState) -> Router {
    let api_route = Router::new()
        .nest("/products", product_handler(app_state.clone()))
        .nest("/categories", category_handler(app_state.clone()))
        .nest("/orders", order_handler(app_state.clone()))
        .nest("/users", users_handler(app_state.clone()))
        .nest("/config", config_handler())
        .nest("/upload", upload_handler(app_state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state.clone());

    Router::new()
        .nest("/api", api_route)
        // Uploaded product images are served straight off disk.
        .nest_service("/uploads", ServeDir::new(&app_state.env.upload_dir))
}
