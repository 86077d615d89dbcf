//! JWT Token Handler
//! Mission: Issue and validate signed identity tokens securely

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::models::UserRecord;

/// Identity claims carried by every token.
///
/// `role` stays a plain string so tokens minted for roles this build does
/// not know about still validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u32,
    pub email: String,
    pub username: String,
    pub role: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub sub: String,
}

/// Token validation failure taxonomy.
///
/// Gates collapse all of these to a uniform client-facing rejection; the
/// variant is only for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    InvalidSignature,
    UnsupportedAlgorithm,
    Expired,
    Malformed,
    Signing,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::InvalidSignature => write!(f, "Signature verification failed"),
            TokenError::UnsupportedAlgorithm => write!(f, "Unsupported signing algorithm"),
            TokenError::Expired => write!(f, "Token outside its validity window"),
            TokenError::Malformed => write!(f, "Malformed token"),
            TokenError::Signing => write!(f, "Token signing failed"),
        }
    }
}

impl std::error::Error for TokenError {}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::UnsupportedAlgorithm
            }
            ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

/// Token manager for issue/validate/refresh operations.
///
/// Holds only the shared secret and the validity window; stateless and safe
/// for unlimited concurrent use.
pub struct TokenManager {
    secret: String,
    duration: chrono::Duration,
}

impl TokenManager {
    pub fn new(secret: String, duration: chrono::Duration) -> Self {
        Self { secret, duration }
    }

    /// Issue a token for the given identity.
    ///
    /// Returns the signed token and its lifetime in seconds. Signing with a
    /// fixed HS256 secret does not fail under normal operation.
    pub fn issue(
        &self,
        user_id: u32,
        email: &str,
        username: &str,
        role: &str,
    ) -> Result<(String, i64), TokenError> {
        let now = Utc::now().timestamp();
        let expires_in = self.duration.num_seconds();

        let claims = Claims {
            user_id,
            email: email.to_string(),
            username: username.to_string(),
            role: role.to_string(),
            iat: now,
            nbf: now,
            exp: now + expires_in,
            // Subject tracks email, inherited from the original service.
            sub: email.to_string(),
        };

        debug!(user_id, username, "issuing token, expires in {}s", expires_in);

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|_| TokenError::Signing)?;

        Ok((token, expires_in))
    }

    /// Issue a token for a stored user record.
    pub fn issue_for(&self, user: &UserRecord) -> Result<(String, i64), TokenError> {
        self.issue(user.id, &user.email, &user.username, user.role.as_str())
    }

    /// Validate a token and extract its claims.
    ///
    /// Only HS256 is accepted; a token asserting any other algorithm is
    /// rejected regardless of its signature. Time bounds are checked with
    /// zero leeway.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_nbf = true;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(TokenError::from)?;

        Ok(decoded.claims)
    }

    /// Validate a token and mint a brand-new one from its claims.
    ///
    /// The input must still be valid; an expired token cannot be refreshed.
    /// The old token is untouched and remains valid until its own expiry.
    pub fn refresh(&self, token: &str) -> Result<(String, i64), TokenError> {
        let claims = self.validate(token)?;
        self.issue(claims.user_id, &claims.email, &claims.username, &claims.role)
    }
}
