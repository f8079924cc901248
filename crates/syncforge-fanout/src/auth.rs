use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{FanoutError, Result};

/// Claims carried by the bearer token sent in an `auth` message. Mirrors
/// the shape of `kimberlite-server::auth::Claims`, trimmed to what the hub
/// needs: who connected.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
    #[serde(default)]
    pub iat: u64,
}

/// Validates bearer tokens presented on the `auth` inbound message
/// (spec.md §4.4's "Awaiting auth" state).
pub struct TokenValidator {
    secret: String,
}

impl TokenValidator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    pub fn validate(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| FanoutError::AuthFailed(e.to_string()))?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, exp_secs_from_now: i64) -> String {
        let claims = Claims {
            sub: "user-1".to_string(),
            exp: (chrono::Utc::now().timestamp() + exp_secs_from_now) as u64,
            iat: chrono::Utc::now().timestamp() as u64,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn validates_well_formed_token() {
        let validator = TokenValidator::new("test-secret");
        let claims = validator.validate(&token("test-secret", 3600)).unwrap();
        assert_eq!(claims.sub, "user-1");
    }

    #[test]
    fn rejects_wrong_secret() {
        let validator = TokenValidator::new("test-secret");
        assert!(validator.validate(&token("other-secret", 3600)).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let validator = TokenValidator::new("test-secret");
        assert!(validator.validate(&token("test-secret", -3600)).is_err());
    }
}
