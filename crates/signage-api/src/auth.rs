use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};

use signage_crypto::{make_password_hash, verify_password};
use signage_feeds::FeedClient;
use signage_store::{Table, TableStore};
use signage_types::TableRow;
use signage_types::api::{Claims, CreateUserRequest, LoginRequest, LoginResponse, SetupStatus, UserView};
use signage_types::models::{Permissions, User};

use crate::error::{ApiError, ApiResult};
use crate::rotation::Rotation;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: TableStore,
    pub feeds: FeedClient,
    pub jwt_secret: String,
    pub session_days: i64,
    pub news_rotation_secs: u64,
    pub rotation: Rotation,
}

/// Why a login attempt was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginRejection {
    UnknownUser,
    Inactive,
    NoPasswordSet,
    BadPassword,
}

impl From<LoginRejection> for ApiError {
    fn from(r: LoginRejection) -> Self {
        match r {
            // Same answer for both so usernames cannot be probed.
            LoginRejection::UnknownUser | LoginRejection::BadPassword => {
                ApiError::new(StatusCode::UNAUTHORIZED, "invalid username or password")
            }
            LoginRejection::Inactive => ApiError::forbidden("account is inactive"),
            LoginRejection::NoPasswordSet => {
                ApiError::forbidden("account has no password set; ask an administrator")
            }
        }
    }
}

/// Check a login attempt against the users table.
pub fn authenticate<'a>(
    users: &'a [User],
    username: &str,
    password: &str,
) -> Result<&'a User, LoginRejection> {
    let user = users
        .iter()
        .find(|u| u.username == username)
        .ok_or(LoginRejection::UnknownUser)?;
    if !user.active {
        return Err(LoginRejection::Inactive);
    }
    if !user.has_password() {
        return Err(LoginRejection::NoPasswordSet);
    }
    if !verify_password(password, &user.password_salt, &user.password_hash) {
        return Err(LoginRejection::BadPassword);
    }
    Ok(user)
}

pub(crate) fn require_admin(claims: &Claims) -> ApiResult<()> {
    if claims.is_admin {
        Ok(())
    } else {
        Err(ApiError::forbidden("administrator only"))
    }
}

/// Shared validation for forms that set a new password.
pub(crate) fn check_new_password(password: &str, confirm: &str) -> ApiResult<()> {
    if password.is_empty() || password != confirm {
        return Err(ApiError::bad_request(
            "password is required and must match its confirmation",
        ));
    }
    Ok(())
}

pub async fn setup_status(State(state): State<AppState>) -> ApiResult<Json<SetupStatus>> {
    let users = state.store.read(User::TABLE).await?;
    Ok(Json(SetupStatus {
        needs_setup: users.is_empty(),
    }))
}

/// First-run wizard: create the first administrator while no user exists.
pub async fn setup_admin(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(ApiError::bad_request("username is required"));
    }
    check_new_password(&req.password, &req.confirm_password)?;

    // Uncached read: a degraded empty result must not look like a fresh sheet.
    if !state.store.read(User::TABLE).await?.is_empty() {
        return Err(ApiError::conflict("setup already completed"));
    }

    let cred = make_password_hash(&req.password);
    let admin = User {
        username: username.to_string(),
        name: req.name.trim().to_string(),
        email: req.email.trim().to_string(),
        password_hash: cred.hash,
        password_salt: cred.salt,
        is_admin: true,
        permissions: Permissions::all(),
        active: true,
    };
    state
        .store
        .replace(User::TABLE, &Table::from_typed(std::slice::from_ref(&admin)))
        .await?;

    info!("Created first administrator {}", admin.username);
    Ok((StatusCode::CREATED, Json(UserView::from(&admin))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let users: Vec<User> = state.store.read_typed().await;

    let user = authenticate(&users, req.username.trim(), &req.password).inspect_err(|r| {
        warn!("Login rejected for {}: {:?}", req.username, r);
    })?;

    let token = create_token(&state.jwt_secret, user, state.session_days)
        .map_err(|_| ApiError::internal())?;

    info!("{} logged in", user.username);
    Ok(Json(LoginResponse {
        username: user.username.clone(),
        name: user.name.clone(),
        is_admin: user.is_admin,
        permissions: user.permissions,
        token,
    }))
}

pub fn create_token(secret: &str, user: &User, days: i64) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.username.clone(),
        name: user.name.clone(),
        is_admin: user.is_admin,
        permissions: user.permissions,
        exp: (chrono::Utc::now() + chrono::Duration::days(days)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
