//! Authentication route handlers.
//!
//! Session-cookie based registration, login, and logout.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.to_string(),
            name: user.name,
            is_admin: user.is_admin,
        }
    }
}

/// Register a new account and start a session.
///
/// POST /auth/register
///
/// # Errors
///
/// Returns 400 for a weak password or invalid email, 409 if the email is
/// already registered.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let user = state
        .auth()
        .register(&request.email, &request.name, &request.password)
        .await?;

    set_current_user(&session, &CurrentUser::from(&user)).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Log in with email and password.
///
/// POST /auth/login
///
/// # Errors
///
/// Returns 401 for unknown email or wrong password.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<UserResponse>> {
    let user = state
        .auth()
        .login(&request.email, &request.password)
        .await?;

    // Rotate the session on privilege change
    session.cycle_id().await?;
    set_current_user(&session, &CurrentUser::from(&user)).await?;

    Ok(Json(user.into()))
}

/// Destroy the current session.
///
/// POST /auth/logout
///
/// # Errors
///
/// Returns 500 if the session store fails.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Return the authenticated user's session profile.
///
/// GET /auth/me
///
/// Rejected with 401 when no session is active.
#[instrument(skip_all)]
pub async fn me(RequireAuth(user): RequireAuth) -> Json<CurrentUser> {
    Json(user)
}
