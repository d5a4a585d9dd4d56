use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::{normalize_email, validation_error, JsonBody};
use crate::core::redis::RateLimit;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::repositories;
use crate::schemas::auth::{LoginRequest, SignupRequest, TokenResponse};
use crate::schemas::user::UserResponse;
use crate::services::text::non_blank;

const SIGNUP_LIMIT: RateLimit = RateLimit { scope: "signup", limit: 10, window_seconds: 60 };
const LOGIN_LIMIT: RateLimit = RateLimit { scope: "login", limit: 10, window_seconds: 60 };

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

async fn signup(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SignupRequest>,
) -> Result<Response, ApiError> {
    payload.validate().map_err(validation_error)?;
    let email = normalize_email(&payload.email);

    if !state.redis().allow(SIGNUP_LIMIT, &email).await {
        return Err(ApiError::TooManyRequests("Too many signup attempts, try again later"));
    }

    let existing = repositories::users::exists_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if existing {
        return Err(ApiError::Conflict("An account with this email already exists".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;
    let name = non_blank(payload.name.as_deref());

    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            email: &email,
            name: name.as_deref(),
            hashed_password,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create user"))?
    .ok_or_else(|| ApiError::Conflict("An account with this email already exists".to_string()))?;

    tracing::info!(user_id = %user.id, "User signed up");
    session_response(&state, user, StatusCode::CREATED)
}

async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Response, ApiError> {
    payload.validate().map_err(validation_error)?;
    let email = normalize_email(&payload.email);

    if !state.redis().allow(LOGIN_LIMIT, &email).await {
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let user = repositories::users::find_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
        .ok_or(ApiError::Unauthorized("Incorrect email or password"))?;

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Incorrect email or password"))?;
    if !verified || !user.is_active {
        return Err(ApiError::Unauthorized("Incorrect email or password"));
    }

    session_response(&state, user, StatusCode::OK)
}

async fn logout(State(state): State<AppState>) -> Result<Response, ApiError> {
    let mut headers = HeaderMap::new();
    insert_cookie(&mut headers, &security::cleared_session_cookie(state.settings()))?;
    Ok((StatusCode::NO_CONTENT, headers).into_response())
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

fn session_response(state: &AppState, user: User, status: StatusCode) -> Result<Response, ApiError> {
    let token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    let mut headers = HeaderMap::new();
    insert_cookie(&mut headers, &security::session_cookie(&token, state.settings()))?;

    let body = TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: UserResponse::from_db(user),
    };
    Ok((status, headers, Json(body)).into_response())
}

fn insert_cookie(headers: &mut HeaderMap, cookie: &str) -> Result<(), ApiError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| ApiError::internal(e, "Failed to build session cookie"))?;
    headers.insert(header::SET_COOKIE, value);
    Ok(())
}
