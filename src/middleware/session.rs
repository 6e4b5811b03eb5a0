//! Session identity from the `user` cookie.
//!
//! The cookie is issued by the login flow (not part of this service) and
//! holds the serialized user record. Only its `user_id` is trusted: the role
//! and manager link are re-read from the `users` table on every request and
//! handed to handlers as an explicit [`SessionUser`] extension.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use percent_encoding::percent_decode_str;
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::user::{self, Role};
use crate::error::AppError;
use crate::services::surveys::Viewer;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "user";

#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub manager_id: Option<Uuid>,
}

impl SessionUser {
    pub fn viewer(&self) -> Viewer {
        Viewer {
            role: self.role,
            user_id: self.user_id,
        }
    }
}

impl From<user::Model> for SessionUser {
    fn from(user: user::Model) -> Self {
        Self {
            role: user.role(),
            user_id: user.user_id,
            username: user.username,
            email: user.email,
            manager_id: user.manager_id,
        }
    }
}

#[derive(Deserialize)]
struct CookieRecord {
    user_id: Uuid,
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// The user id carried by the session cookie, if the cookie is present and
/// decodes to a user record.
pub fn session_user_id(headers: &HeaderMap) -> Option<Uuid> {
    let raw = cookie_value(headers, SESSION_COOKIE)?;
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    serde_json::from_str::<CookieRecord>(&decoded)
        .map(|record| record.user_id)
        .ok()
}

pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(user_id) = session_user_id(req.headers()) else {
        tracing::debug!("Session | {} | no session cookie, redirecting", req.uri().path());
        return Ok(Redirect::to(&state.config.login_url).into_response());
    };

    let Some(user) = user::Entity::find_by_id(user_id).one(&state.db).await? else {
        tracing::warn!("Session | {} | unknown user {}, redirecting", req.uri().path(), user_id);
        return Ok(Redirect::to(&state.config.login_url).into_response());
    };

    req.extensions_mut().insert(SessionUser::from(user));

    Ok(next.run(req).await)
}
