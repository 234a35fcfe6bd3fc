use crate::{
    AppState,
    db::UserExt,
    dtos::{
        AdminUpdateUserDto, FilterUserDto, LoginUserDto, RegisterUserDto, RequestQueryDto,
        Response, UpdateProfileDto, UserListResponseDto, UserLoginResponseDto, UserResponseDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, auth, role_check},
    models::{User, UserRole},
    utils::{password, token},
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::Cookie;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

/// Router for account endpoints: registration and login are public, the
/// profile routes need authentication, and the user CRUD is admin-only.
pub fn users_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(register))
        .route(
            "/",
            get(get_users)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route("/auth", post(login))
        .route("/logout", post(logout))
        .route(
            "/profile",
            get(get_profile)
                .put(update_profile)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{user_id}",
            get(get_user_by_id)
                .put(update_user_by_id)
                .delete(delete_user_by_id)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Admin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

fn login_response(
    app_state: &AppState,
    user: &User,
    status: StatusCode,
) -> Result<axum::response::Response, HttpError> {
    let access_token = token::create_token(
        &user.id.to_string(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| {
        tracing::error!("Access token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let cookie = Cookie::build(("access_token", access_token.clone()))
        .path("/")
        .max_age(time::Duration::seconds(app_state.env.jwt_maxage))
        .http_only(true)
        .build();

    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, cookie.to_string().parse().unwrap());

    let body = Json(UserLoginResponseDto {
        status: "success".to_string(),
        access_token,
        user: FilterUserDto::filter_user(user),
    });

    let mut response = (status, body).into_response();
    response.headers_mut().extend(headers);
    Ok(response)
}

/// Register a new account and log it in right away.
#[instrument(skip(app_state, body), fields(username = %body.username, email = %body.email))]
pub async fn register(
    State(app_state): State<AppState>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid register input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let hash_password = password::hash(&body.password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(e.to_string())
    })?;

    let result = app_state
        .db_client
        .save_user(&body.username, &body.email, &hash_password)
        .await;

    match result {
        Ok(user) => {
            tracing::info!(username = %body.username, "Register successful");
            login_response(&app_state, &user, StatusCode::CREATED)
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            tracing::error!("DB error, saving user, unique violation: {}", db_err);
            Err(HttpError::unique_constraint_violation(
                "User with this email or username already exists",
            ))
        }
        Err(e) => {
            tracing::error!("DB error, saving user: {}", e);
            Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ))
        }
    }
}

#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn login(
    State(app_state): State<AppState>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid login input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = app_state
        .db_client
        .get_user(None, None, Some(&body.email))
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string()))?;

    let password_matched = password::compare(&body.password, &user.password).map_err(|e| {
        tracing::error!("Password error: {}", e);
        HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string())
    })?;

    if !password_matched {
        return Err(HttpError::unauthorized(
            ErrorMessage::WrongCredentials.to_string(),
        ));
    }

    tracing::info!(email = %body.email, "Login successful");
    login_response(&app_state, &user, StatusCode::OK)
}

pub async fn logout() -> Result<impl IntoResponse, HttpError> {
    // Expire the cookie immediately.
    let cookie = Cookie::build(("access_token", ""))
        .path("/")
        .max_age(time::Duration::seconds(0))
        .http_only(true)
        .build();

    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, cookie.to_string().parse().unwrap());

    let body = Json(Response {
        status: "success",
        message: "Logged out successfully".to_string(),
    });

    let mut response = body.into_response();
    response.headers_mut().extend(headers);
    Ok(response)
}

#[instrument(skip(user), fields(username = %user.user.username))]
pub async fn get_profile(
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: FilterUserDto::filter_user(&user.user),
    }))
}

#[instrument(skip(user, app_state, body), fields(username = %user.user.username))]
pub async fn update_profile(
    Extension(user): Extension<JWTAuthMiddleware>,
    State(app_state): State<AppState>,
    Json(body): Json<UpdateProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid profile update input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let hash_password = match &body.password {
        Some(new_password) => Some(password::hash(new_password).map_err(|e| {
            tracing::error!("Password hashing error: {}", e);
            HttpError::server_error(e.to_string())
        })?),
        None => None,
    };

    let result = app_state
        .db_client
        .update_user(
            user.user.id,
            body.username.as_deref(),
            body.email.as_deref(),
            hash_password.as_deref(),
        )
        .await;

    match result {
        Ok(updated) => Ok(Json(UserResponseDto {
            status: "success".to_string(),
            data: FilterUserDto::filter_user(&updated),
        })),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(HttpError::unique_constraint_violation(
                "User with this email or username already exists",
            ))
        }
        Err(e) => {
            tracing::error!("DB error, updating profile: {}", e);
            Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ))
        }
    }
}

/// Paginated user list (admin only).
#[instrument(skip(app_state))]
pub async fn get_users(
    Query(query_params): Query<RequestQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate().map_err(|e| {
        tracing::error!("Invalid get_users input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let users = app_state
        .db_client
        .get_users(page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting users: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let user_count = app_state.db_client.get_user_count().await.map_err(|e| {
        tracing::error!("DB error, getting user count: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    Ok(Json(UserListResponseDto {
        status: "success".to_string(),
        users: FilterUserDto::filter_users(&users),
        results: user_count,
    }))
}

#[instrument(skip(app_state))]
pub async fn get_user_by_id(
    Path(user_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state
        .db_client
        .get_user(Some(user_id), None, None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::UserNotFound.to_string()))?;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: FilterUserDto::filter_user(&user),
    }))
}

#[instrument(skip(app_state, body))]
pub async fn update_user_by_id(
    Path(user_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Json(body): Json<AdminUpdateUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid admin user update input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let role = body.is_admin.map(|is_admin| {
        if is_admin {
            UserRole::Admin
        } else {
            UserRole::User
        }
    });

    let result = app_state
        .db_client
        .admin_update_user(user_id, body.username.as_deref(), body.email.as_deref(), role)
        .await;

    match result {
        Ok(updated) => Ok(Json(UserResponseDto {
            status: "success".to_string(),
            data: FilterUserDto::filter_user(&updated),
        })),
        Err(sqlx::Error::RowNotFound) => {
            Err(HttpError::not_found(ErrorMessage::UserNotFound.to_string()))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(HttpError::unique_constraint_violation(
                "User with this email or username already exists",
            ))
        }
        Err(e) => {
            tracing::error!("DB error, updating user: {}", e);
            Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ))
        }
    }
}

#[instrument(skip(app_state))]
pub async fn delete_user_by_id(
    Path(user_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state
        .db_client
        .get_user(Some(user_id), None, None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::UserNotFound.to_string()))?;

    // Admin accounts cannot be removed through the API.
    if user.role == UserRole::Admin {
        return Err(HttpError::bad_request("Cannot delete admin user"));
    }

    app_state
        .db_client
        .delete_user(user_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                HttpError::not_found(ErrorMessage::UserNotFound.to_string())
            }
            e => {
                tracing::error!("DB error, deleting user: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(%user_id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
