use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::extract::CookieJar;
use headers::{Authorization, authorization::Bearer};

use crate::auth::{SESSION_COOKIE, verify_token};
use crate::error::ApiError;
use crate::models::{AdminRole, AppState};

/// Identity attached to a request once its session token checks out.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub id: i64,
    pub username: String,
    pub role: AdminRole,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            // Prefer Authorization: Bearer <token>, fall back to the
            // session cookie set at login.
            let token = if let Ok(TypedHeader(authz)) =
                TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await
            {
                authz.token().to_string()
            } else {
                CookieJar::from_headers(&parts.headers)
                    .get(SESSION_COOKIE)
                    .map(|c| c.value().to_string())
                    .ok_or_else(ApiError::auth_required)?
            };

            let claims =
                verify_token(&token, &state.jwt_secret).ok_or_else(ApiError::auth_required)?;

            Ok(AuthContext {
                id: claims.id,
                username: claims.username,
                role: claims.role,
            })
        }
    }
}

/// Reject callers whose role sits below the required level.
pub fn ensure_role(auth: &AuthContext, required: AdminRole) -> Result<(), ApiError> {
    if auth.role.meets(required) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Insufficient permissions".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: AdminRole) -> AuthContext {
        AuthContext {
            id: 1,
            username: "someone".into(),
            role,
        }
    }

    #[test]
    fn ensure_role_accepts_equal_and_higher() {
        assert!(ensure_role(&ctx(AdminRole::Admin), AdminRole::Admin).is_ok());
        assert!(ensure_role(&ctx(AdminRole::SuperAdmin), AdminRole::Admin).is_ok());
        assert!(ensure_role(&ctx(AdminRole::Viewer), AdminRole::Viewer).is_ok());
    }

    #[test]
    fn ensure_role_rejects_lower() {
        assert!(ensure_role(&ctx(AdminRole::Viewer), AdminRole::Admin).is_err());
        assert!(ensure_role(&ctx(AdminRole::Admin), AdminRole::SuperAdmin).is_err());
    }
}
