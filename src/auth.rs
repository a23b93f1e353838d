use argon2::{
    Argon2,
    PasswordHash,
    PasswordVerifier,
    PasswordHasher,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use argon2::password_hash::{SaltString, rand_core::OsRng as PHOsRng};

use crate::error::ApiError;
use crate::models::{AdminPublic, AdminRole};
use crate::store::Store;

type HmacSha256 = Hmac<Sha256>;

/// Cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "admin_token";

/// Verify password using the Argon2 hash stored in the admin row.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(p) => p,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Hash a new password using Argon2id with a random salt.
/// Store the returned string in admins.password_hash.
pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut PHOsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| format!("argon2 hash error: {e}"))
}

/* ============================================================
   Session tokens (HS256, stateless)
   ============================================================ */

/// Payload carried inside a session token. Everything the guards need
/// is here, so no lookup happens on ordinary authenticated requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub username: String,
    pub role: AdminRole,
    pub iat: i64,
    pub exp: i64,
}

/// Sign a session token for a freshly authenticated admin. Returns the
/// compact token plus its expiry instant.
pub fn create_token(
    admin: &AdminPublic,
    secret: &str,
    ttl_hours: i64,
) -> Result<(String, DateTime<Utc>), String> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(ttl_hours);
    let claims = Claims {
        id: admin.id,
        username: admin.username.clone(),
        role: admin.role,
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = serde_json::to_vec(&claims).map_err(|e| format!("token encode error: {e}"))?;
    let signing_input = format!("{header}.{}", URL_SAFE_NO_PAD.encode(payload));

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| format!("token sign error: {e}"))?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok((format!("{signing_input}.{signature}"), expires_at))
}

/// Check signature and expiry, returning the claims only when both
/// hold. Any malformed input is treated the same as a bad signature.
pub fn verify_token(token: &str, secret: &str) -> Option<Claims> {
    let mut parts = token.split('.');
    let header = parts.next()?;
    let payload = parts.next()?;
    let signature = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(header.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    let sig_bytes = URL_SAFE_NO_PAD.decode(signature).ok()?;
    mac.verify_slice(&sig_bytes).ok()?;

    let claims: Claims = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).ok()?).ok()?;
    if claims.exp <= Utc::now().timestamp() {
        return None;
    }
    Some(claims)
}

/* ============================================================
   Credential validation
   ============================================================ */

/// Look up an active account and verify the password. Unknown
/// usernames, deactivated accounts and wrong passwords all fail with
/// the same error, so callers cannot probe which usernames exist.
pub async fn validate_credentials(
    store: &Store,
    username: &str,
    password: &str,
) -> Result<AdminPublic, ApiError> {
    let Some(admin) = store.admins.get_by_username(username).await? else {
        return Err(ApiError::invalid_credentials());
    };

    if !verify_password(password, &admin.password_hash) {
        return Err(ApiError::invalid_credentials());
    }

    store.admins.touch_last_login(admin.id).await?;
    Ok(admin.into_public())
}

/* ============================================================
   Tests
   ============================================================ */

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_admin() -> AdminPublic {
        AdminPublic {
            id: 7,
            username: "admin".into(),
            email: "admin@clinic.local".into(),
            role: AdminRole::Admin,
            full_name: "Administrator".into(),
            is_active: true,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("s3cret").unwrap();
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn verify_password_rejects_garbage_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn token_round_trip() {
        let (token, expires_at) = create_token(&sample_admin(), "test-secret", 24).unwrap();
        let claims = verify_token(&token, "test-secret").expect("token should verify");
        assert_eq!(claims.id, 7);
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.role, AdminRole::Admin);
        assert_eq!(claims.exp, expires_at.timestamp());
        assert!(claims.iat < claims.exp);
    }

    #[test]
    fn token_rejected_with_wrong_secret() {
        let (token, _) = create_token(&sample_admin(), "test-secret", 24).unwrap();
        assert!(verify_token(&token, "other-secret").is_none());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let (token, _) = create_token(&sample_admin(), "test-secret", 24).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let mut claims: Claims =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        claims.role = AdminRole::SuperAdmin;
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());

        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert!(verify_token(&forged, "test-secret").is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let (token, _) = create_token(&sample_admin(), "test-secret", -1).unwrap();
        assert!(verify_token(&token, "test-secret").is_none());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        for junk in ["", "abc", "a.b", "a.b.c", "a.b.c.d"] {
            assert!(verify_token(junk, "test-secret").is_none(), "{junk:?}");
        }
    }
}
