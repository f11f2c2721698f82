use chrono::{Duration, Utc};
use db::models::user::User;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const JWT_SECRET_ENV: &str = "JWT_SECRET";
const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),
    #[error("Invalid or expired token")]
    Token(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    pub exp: i64,
}

/// Password hashing and bearer-token issuance/verification.
#[derive(Clone)]
pub struct AuthService {
    secret: String,
}

impl AuthService {
    /// Reads the signing secret from the environment. Without one a random
    /// secret is generated, so tokens do not survive a restart.
    pub fn new() -> Self {
        let secret = match std::env::var(JWT_SECRET_ENV) {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ => {
                tracing::warn!(
                    "{JWT_SECRET_ENV} not set, using a random secret; tokens will not survive restarts"
                );
                Uuid::new_v4().to_string()
            }
        };
        Self { secret }
    }

    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        Ok(bcrypt::verify(password, hash)?)
    }

    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            exp: (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;
        Ok(token)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }
}

impl Default for AuthService {
    fn default() -> Self {
        Self::new()
    }
}
