//! Session Store — email/password accounts and cookie sessions.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::state::AppState;

pub mod cookies;
pub mod handlers;
pub mod store;

pub use store::{UserRecord, UserStore};

/// The signed-in user, resolved from the `session_user_id` cookie.
///
/// Use as a handler argument to require a session; rejects with 401 when the
/// cookie is missing or names a user that no longer exists.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<UserRecord> for SessionUser {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id =
            cookies::read_cookie(&parts.headers, cookies::USER_ID_COOKIE).ok_or(AppError::Unauthorized)?;
        let record = state
            .users
            .find_by_id(&user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        Ok(record.into())
    }
}
