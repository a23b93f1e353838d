use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::{
    auth::{self, SESSION_COOKIE},
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, LoginData, LoginRequest, LoginResponse, MeData, MeResponse, OkData, OkResponse},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

fn session_cookie(token: String, max_age_hours: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::hours(max_age_hours))
        .build()
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "username and password are required".into(),
        ));
    }

    let user = auth::validate_credentials(&state.store, username, &req.password).await?;

    let (token, expires_at) = auth::create_token(&user, &state.jwt_secret, state.token_ttl_hours)
        .map_err(ApiError::Internal)?;

    let jar = jar.add(session_cookie(token.clone(), state.token_ttl_hours));

    Ok((
        jar,
        Json(LoginResponse {
            data: LoginData {
                message: "Login successful".into(),
                token,
                expires_at,
                user,
            },
        }),
    ))
}

/// POST /api/auth/logout. Clearing the cookie is all there is to it,
/// tokens are stateless and simply age out.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<OkResponse>) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());
    (
        jar,
        Json(OkResponse {
            data: OkData {
                message: "Logged out".into(),
            },
        }),
    )
}

/// GET /api/auth/me. Looks the account up again so a token issued
/// before deactivation stops working immediately.
pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<MeResponse>, ApiError> {
    let admin = state
        .store
        .admins
        .get_by_id(auth.id)
        .await?
        .ok_or_else(ApiError::auth_required)?;

    if !admin.is_active {
        return Err(ApiError::auth_required());
    }

    Ok(Json(MeResponse {
        data: MeData {
            user: admin.into_public(),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_locked_down() {
        let cookie = session_cookie("tok".into(), 24);
        assert_eq!(cookie.name(), "admin_token");
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(24)));
    }
}
