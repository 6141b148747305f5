use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use tracing::info;
use validator::{Validate, ValidationErrors};

use crate::errors::AppError;
use crate::session::cookies::{append_set_cookies, cleared_cookies, session_cookies};
use crate::session::store::UserRecord;
use crate::session::SessionUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Joins field messages in field-name order.
fn validation_message(errors: ValidationErrors) -> AppError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(name, _)| *name);
    let message = fields
        .into_iter()
        .flat_map(|(name, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => msg.to_string(),
                None => format!("{name} is invalid"),
            })
        })
        .collect::<Vec<_>>()
        .join("; ");
    AppError::Validation(message)
}

/// POST /api/v1/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(mut req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionUser>), AppError> {
    req.name = req.name.trim().to_string();
    req.email = req.email.trim().to_string();
    req.validate().map_err(validation_message)?;

    let record = UserRecord::new(&req.name, &req.email, &req.password);
    state.users.add(record.clone()).await?;
    info!(user_id = %record.id, "User registered");

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(mut req): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<SessionUser>), AppError> {
    req.email = req.email.trim().to_string();
    req.validate().map_err(validation_message)?;

    let record = state
        .users
        .find_by_email(&req.email)
        .await?
        .filter(|u| u.password_matches(&req.password))
        .ok_or_else(|| AppError::Validation("Invalid email or password".to_string()))?;

    let mut headers = HeaderMap::new();
    append_set_cookies(&mut headers, &session_cookies(&record.id, &record.name));
    info!(user_id = %record.id, "User signed in");

    Ok((headers, Json(record.into())))
}

/// POST /api/v1/auth/logout
pub async fn handle_logout() -> (StatusCode, HeaderMap) {
    let mut headers = HeaderMap::new();
    append_set_cookies(&mut headers, &cleared_cookies());
    (StatusCode::NO_CONTENT, headers)
}

/// GET /api/v1/auth/session
pub async fn handle_session(user: SessionUser) -> Json<SessionUser> {
    Json(user)
}
