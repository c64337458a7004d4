//! JWT Token handling

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, DomainResult, TokenIssuer, VerifiedIdentity};

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Token expiration time in hours
    pub expiration_hours: i64,
    /// Issuer claim
    pub issuer: String,
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    /// Subject (username)
    pub sub: String,
    /// Granted role names
    pub roles: Vec<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

impl TokenClaims {
    /// Claims for `identity`, expiring `config.expiration_hours` from now.
    ///
    /// Fails with `Crypto` when the expiry does not fit a timestamp.
    pub fn new(identity: &VerifiedIdentity, config: &JwtConfig) -> DomainResult<Self> {
        let now = Utc::now();
        let exp = Duration::try_hours(config.expiration_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                DomainError::Crypto(format!(
                    "Token lifetime of {} hours is out of range",
                    config.expiration_hours
                ))
            })?;

        Ok(Self {
            sub: identity.username.clone(),
            roles: identity.authorities.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: config.issuer.clone(),
        })
    }

    pub fn into_identity(self) -> VerifiedIdentity {
        VerifiedIdentity::new(self.sub, self.roles)
    }
}

/// Create a JWT token for a verified identity
pub fn create_token(identity: &VerifiedIdentity, config: &JwtConfig) -> DomainResult<String> {
    let claims = TokenClaims::new(identity, config)?;

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| DomainError::Crypto(format!("Failed to create token: {}", e)))
}

/// Verify and decode a JWT token (signature, issuer and expiry)
pub fn verify_token(
    token: &str,
    config: &JwtConfig,
) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.set_issuer(&[&config.issuer]);

    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;

    Ok(token_data.claims)
}

/// Whether a verification failure was caused by expiry alone
pub fn is_expired_error(err: &jsonwebtoken::errors::Error) -> bool {
    matches!(err.kind(), ErrorKind::ExpiredSignature)
}

/// HS256 [`TokenIssuer`]
#[derive(Clone)]
pub struct JwtTokenIssuer {
    config: JwtConfig,
}

impl JwtTokenIssuer {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(&self, identity: &VerifiedIdentity) -> DomainResult<String> {
        create_token(identity, &self.config)
    }
}
