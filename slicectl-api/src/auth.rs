//! Authentication: password verification and JWT issuance/verification.
//!
//! The password hash is SHA-256 of the plaintext, matched against the
//! stored hex digest — an external wire contract this binary interoperates
//! with, not a recommendation for new credential stores.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use slicectl_core::error::{OrchestratorError, Result};
use slicectl_core::types::User;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
}

/// The caller identity carried through a request once the bearer token is
/// verified.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
    pub role: String,
}

pub fn hash_password(plaintext: &str) -> String {
    let digest = Sha256::digest(plaintext.as_bytes());
    hex::encode(digest)
}

pub fn verify_password(plaintext: &str, stored_hash: &str) -> bool {
    hash_password(plaintext) == stored_hash
}

pub fn issue_token(user: &User, secret: &str, ttl_minutes: i64) -> Result<String> {
    let exp = (chrono::Utc::now() + chrono::Duration::minutes(ttl_minutes)).timestamp();
    let claims = Claims {
        sub: user.username.clone(),
        role: user.role.clone(),
        exp,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| OrchestratorError::Auth(format!("token signing failed: {e}")))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| OrchestratorError::Auth(format!("invalid token: {e}")))?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_roundtrips() {
        let hash = hash_password("hunter2");
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn token_roundtrips_claims() {
        let user = User {
            id: 1,
            username: "alice".into(),
            password_hash: hash_password("x"),
            role: "user".into(),
        };
        let token = issue_token(&user, "secret", 60).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.role, "user");
    }

    #[test]
    fn token_rejected_with_wrong_secret() {
        let user = User {
            id: 1,
            username: "alice".into(),
            password_hash: hash_password("x"),
            role: "user".into(),
        };
        let token = issue_token(&user, "secret", 60).unwrap();
        assert!(verify_token(&token, "other-secret").is_err());
    }
}
