use axum::{extract::State, http::StatusCode, Json};
use paceline_core::AppState;
use paceline_db::users::UserRow;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUserRecord;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub coach: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub fn user_json(user: &UserRow) -> Value {
    json!({
        "id": user.id.to_string(),
        "username": user.username,
        "email": user.email,
        "flags": user.flags,
        "created_at": user.created_at,
    })
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if !state.config.registration_enabled {
        return Err(ApiError::Validation("registration is disabled".into()));
    }

    let username = body.username.trim();
    let email = body.email.trim();
    paceline_util::validation::validate_username(username)
        .map_err(|e| ApiError::Validation(format!("username: {e}")))?;
    paceline_util::validation::validate_email(email)
        .map_err(|e| ApiError::Validation(format!("email: {e}")))?;
    paceline_util::validation::validate_password(&body.password)
        .map_err(|e| ApiError::Validation(format!("password: {e}")))?;

    let password_hash = paceline_core::auth::hash_password(&body.password)?;
    let flags = if body.coach {
        paceline_core::USER_FLAG_COACH
    } else {
        0
    };

    let user = match paceline_db::users::create_user(
        &state.db,
        state.config.next_id(),
        username,
        email,
        &password_hash,
        flags,
    )
    .await
    {
        Ok(user) => user,
        Err(err) if err.is_unique_violation() => {
            return Err(ApiError::Validation("email is already registered".into()));
        }
        Err(err) => return Err(err.into()),
    };

    let token = paceline_core::auth::create_token(
        user.id,
        &state.config.jwt_secret,
        state.config.jwt_expiry_seconds,
    )?;
    tracing::info!(user_id = user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "token": token, "user": user_json(&user) })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = paceline_db::users::get_user_by_email(&state.db, body.email.trim())
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !paceline_core::auth::verify_password(&body.password, &user.password_hash)? {
        return Err(ApiError::Unauthorized);
    }

    let token = paceline_core::auth::create_token(
        user.id,
        &state.config.jwt_secret,
        state.config.jwt_expiry_seconds,
    )?;

    Ok(Json(json!({ "token": token, "user": user_json(&user) })))
}

pub async fn get_me(auth: AuthUserRecord) -> Json<Value> {
    Json(user_json(&auth.user))
}
