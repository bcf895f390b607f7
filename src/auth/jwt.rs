//! JWT token validation
//! Access tokens are issued by the account service sharing `security.jwt_secret`

use crate::{config::AppConfig, error::AppError};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Token type, only "access" is accepted
    pub token_type: String,

    /// Issued at
    pub iat: i64,

    /// Expiration
    pub exp: i64,

    /// JWT ID
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Unauthorized)
    }
}

/// JWT service
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_exp_secs: u64,
}

impl JwtService {
    /// Create JWT service from config
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let secret = config.security.jwt_secret.expose_secret();

        // Ensure secret is at least 32 bytes for HS256
        if secret.len() < 32 {
            return Err(AppError::Config("JWT secret too short (min 32 chars)".to_string()));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_exp_secs: config.security.access_token_exp_secs,
        })
    }

    /// Issue an access token in the account service's format
    ///
    /// Production tokens come from the account service; this issuer exists for
    /// integration tests and local development against the same secret.
    pub fn generate_access_token(&self, user_id: &Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expiration = now + Duration::seconds(self.access_token_exp_secs as i64);

        let claims = Claims {
            sub: user_id.to_string(),
            token_type: "access".to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode access token: {:?}", e);
            AppError::Internal
        })
    }

    /// Validate and decode token
    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        Ok(decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                tracing::debug!("Token validation failed: {:?}", e);
                AppError::Unauthorized
            })?
            .claims)
    }

    /// Validate access token specifically
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AppError> {
        let claims = self.validate_token(token)?;

        if claims.token_type != "access" {
            tracing::debug!("Token type mismatch: expected 'access', got '{}'", claims.token_type);
            return Err(AppError::Unauthorized);
        }

        Ok(claims)
    }
}
