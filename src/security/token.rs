use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::models::User;

const TOKEN_VALIDITY_HOURS: i64 = 24;

/// Claims carried by a session credential. Self-contained: every protected
/// request is served from the decoded claims alone, no session table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: String,
    pub email: String,
    pub full_name: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|e| anyhow!("invalid user id in claims: {e}"))
    }
}

/// Issues and verifies signed session credentials. Expiry is the only
/// invalidation; there is no revocation list.
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validity: Duration,
}

impl TokenManager {
    pub fn new(secret: &str, validity: Duration) -> Result<Self> {
        if secret.len() < 32 {
            return Err(anyhow!("JWT secret must be at least 32 characters"));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validity,
        })
    }

    pub fn from_secret(secret: &str) -> Result<Self> {
        Self::new(secret, Duration::hours(TOKEN_VALIDITY_HOURS))
    }

    pub fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            iat: now.timestamp(),
            exp: (now + self.validity).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow!("failed to encode token: {e}"))
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow!("token validation failed: {e}"))?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "jsmith".to_string(),
            email: "jsmith@example.com".to_string(),
            password_hash: "$argon2id$unused".to_string(),
            full_name: "Jane Smith".to_string(),
            role: "it_staff".to_string(),
            created_at: Utc::now(),
        }
    }

    fn test_manager() -> TokenManager {
        TokenManager::from_secret("a-very-long-test-secret-used-only-in-unit-tests")
            .expect("Failed to create manager")
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let manager = test_manager();
        let user = test_user();

        let token = manager.issue(&user).expect("Failed to issue");
        let claims = manager.verify(&token).expect("Verification failed");

        assert_eq!(claims.user_id().expect("Invalid user id"), user.id);
        assert_eq!(claims.username, user.username);
        assert_eq!(claims.role, user.role);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.full_name, user.full_name);
        assert_eq!(claims.exp - claims.iat, TOKEN_VALIDITY_HOURS * 3600);
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(TokenManager::from_secret("too-short").is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let manager = test_manager();
        let token = manager.issue(&test_user()).expect("Failed to issue");

        let mut tampered = token.clone();
        tampered.pop();
        assert!(manager.verify(&tampered).is_err());
        assert!(manager.verify("not.a.token").is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = test_manager();
        let other = TokenManager::from_secret("a-different-long-secret-for-another-service")
            .expect("Failed to create manager");

        let token = issuer.issue(&test_user()).expect("Failed to issue");
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = TokenManager::new(
            "a-very-long-test-secret-used-only-in-unit-tests",
            Duration::hours(-1),
        )
        .expect("Failed to create manager");

        let token = manager.issue(&test_user()).expect("Failed to issue");
        assert!(manager.verify(&token).is_err());
    }
}
