use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch},
};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    middleware::auth_context::{AuthContext, ensure_role},
    models::{AdminPublic, AdminRole, AppState, OkData, OkResponse},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}", patch(set_user_active))
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub data: UserListData,
}

#[derive(Debug, Serialize)]
pub struct UserListData {
    pub users: Vec<AdminPublic>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// GET /api/admin/users (super_admin only)
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<UserListResponse>, ApiError> {
    ensure_role(&auth, AdminRole::SuperAdmin)?;

    let users = state.store.admins.list_all().await?;
    Ok(Json(UserListResponse {
        data: UserListData { users },
    }))
}

/// PATCH /api/admin/users/{id} (super_admin only). Deactivation is
/// reversible, nothing is deleted.
pub async fn set_user_active(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
    Json(req): Json<SetActiveRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    ensure_role(&auth, AdminRole::SuperAdmin)?;

    // Locking yourself out would leave nobody to undo it.
    if id == auth.id {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "You cannot change the status of your own account".into(),
        ));
    }

    if !state.store.admins.set_active(id, req.is_active).await? {
        return Err(ApiError::NotFound("NOT_FOUND", "user not found".into()));
    }

    let message = if req.is_active {
        "User activated"
    } else {
        "User deactivated"
    };
    Ok(Json(OkResponse {
        data: OkData {
            message: message.into(),
        },
    }))
}
