use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};

use signage_crypto::make_password_hash;
use signage_store::Table;
use signage_types::TableRow;
use signage_types::api::{
    Claims, CreateUserRequest, ResetPasswordRequest, SavePermissionsRequest, SetActiveRequest,
    UserView,
};
use signage_types::models::{Permissions, User};

use crate::auth::{AppState, check_new_password, require_admin};
use crate::error::{ApiError, ApiResult};

/// The users worksheet as stored, edited in place.
///
/// Columns the sheet carries beyond the user schema and rows without a
/// username are written back untouched; only the cells of [`User`] fields
/// change.
struct UserSheet {
    table: Table,
}

impl UserSheet {
    /// Fresh read of the sheet, credentials included. Missing user columns
    /// are added at the end.
    async fn load(state: &AppState) -> ApiResult<Self> {
        let stored = state.store.read(User::TABLE).await?;
        let mut columns = stored.columns().to_vec();
        for col in User::COLUMNS {
            if !columns.iter().any(|c| c == col) {
                columns.push(col.to_string());
            }
        }
        Ok(Self {
            table: Table::from_records(columns, &stored.records()),
        })
    }

    fn users(&self) -> Vec<User> {
        self.table
            .typed::<User>()
            .into_iter()
            .filter(|u| !u.username.is_empty())
            .collect()
    }

    fn contains(&self, username: &str) -> bool {
        self.table.position("username", username).is_some()
    }

    fn push(&mut self, user: &User) {
        self.table.push_record(&user.to_record());
    }

    /// Apply `edit` to the stored user, returning the updated record.
    fn update(&mut self, username: &str, edit: impl FnOnce(&mut User)) -> ApiResult<User> {
        let idx = self
            .table
            .position("username", username)
            .ok_or_else(|| ApiError::not_found(format!("no user {username}")))?;
        let mut user = self.table.record(idx).map(|r| User::from_record(&r)).unwrap_or_default();
        edit(&mut user);
        for (field, value) in user.to_record() {
            self.table.set(idx, &field, value);
        }
        Ok(user)
    }

    async fn save(&self, state: &AppState) -> ApiResult<()> {
        state.store.replace(User::TABLE, &self.table).await?;
        Ok(())
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<UserView>>> {
    require_admin(&claims)?;
    let sheet = UserSheet::load(&state).await?;
    Ok(Json(sheet.users().iter().map(UserView::from).collect()))
}

/// New accounts start active, without admin rights or capabilities.
pub async fn create_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&claims)?;
    let username = req.username.trim();
    if username.is_empty() {
        return Err(ApiError::bad_request("username is required"));
    }
    check_new_password(&req.password, &req.confirm_password)?;

    let mut sheet = UserSheet::load(&state).await?;
    if sheet.contains(username) {
        return Err(ApiError::conflict(format!("user {username} already exists")));
    }

    let cred = make_password_hash(&req.password);
    let user = User {
        username: username.to_string(),
        name: req.name.trim().to_string(),
        email: req.email.trim().to_string(),
        password_hash: cred.hash,
        password_salt: cred.salt,
        is_admin: false,
        permissions: Permissions::default(),
        active: true,
    };
    sheet.push(&user);
    sheet.save(&state).await?;

    info!("{} created user {}", claims.sub, username);
    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<StatusCode> {
    require_admin(&claims)?;
    check_new_password(&req.password, &req.confirm_password)?;

    let mut sheet = UserSheet::load(&state).await?;
    let cred = make_password_hash(&req.password);
    sheet.update(&username, |u| {
        u.password_salt = cred.salt;
        u.password_hash = cred.hash;
    })?;
    sheet.save(&state).await?;

    info!("{} reset the password of {}", claims.sub, username);
    Ok(StatusCode::NO_CONTENT)
}

/// Users are never deleted, only deactivated.
pub async fn set_active(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SetActiveRequest>,
) -> ApiResult<Json<UserView>> {
    require_admin(&claims)?;

    let mut sheet = UserSheet::load(&state).await?;
    let user = sheet.update(&username, |u| u.active = req.active)?;
    sheet.save(&state).await?;

    info!("{} set {} active={}", claims.sub, username, req.active);
    Ok(Json(UserView::from(&user)))
}

/// Bulk save of names, emails and flags from the admin list. Credentials are
/// kept as stored.
pub async fn save_permissions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SavePermissionsRequest>,
) -> ApiResult<Json<Vec<UserView>>> {
    require_admin(&claims)?;

    let mut sheet = UserSheet::load(&state).await?;
    for edit in &req.users {
        if !sheet.contains(&edit.username) {
            warn!("Ignoring permissions for unknown user {}", edit.username);
            continue;
        }
        sheet.update(&edit.username, |u| {
            u.name = edit.name.clone();
            u.email = edit.email.clone();
            u.is_admin = edit.is_admin;
            u.permissions = edit.permissions;
            u.active = edit.active;
        })?;
    }
    sheet.save(&state).await?;

    info!("{} saved permissions for {} users", claims.sub, req.users.len());
    Ok(Json(sheet.users().iter().map(UserView::from).collect()))
}
