//! services/api/src/token.rs
//!
//! Minting and verification of the signed session token carried in the
//! `token` cookie. Tokens are stateless: validity is entirely determined
//! by the HMAC signature and the embedded expiry, so there is no
//! server-side session table and no revocation list.

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

/// Session lifetime in seconds. A token is good for one hour from issue.
pub const TOKEN_TTL_SECS: i64 = 3600;

/// The signed token payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated username.
    pub sub: String,
    /// Issued-at (Unix timestamp, seconds).
    pub iat: i64,
    /// Expiry (Unix timestamp, seconds) = iat + 1 hour.
    pub exp: i64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token is invalid")]
    Invalid,
}

/// Issues a token for `username`, valid for [`TOKEN_TTL_SECS`].
pub fn mint(username: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let issued_at = Utc::now().timestamp();
    let claims = Claims {
        sub: username.to_string(),
        iat: issued_at,
        exp: issued_at + TOKEN_TTL_SECS,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verifies signature and expiry, returning the embedded username.
pub fn verify(token: &str, secret: &str) -> Result<String, TokenError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })?;
    Ok(data.claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn mint_then_verify_round_trips_the_username() {
        let token = mint("alice", SECRET).unwrap();
        assert_eq!(verify(&token, SECRET).unwrap(), "alice");
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        // Craft a token whose expiry is well past the default leeway.
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "alice".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(verify(&token, SECRET), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let token = mint("alice", SECRET).unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push('x');
        assert_eq!(verify(&tampered, SECRET), Err(TokenError::Invalid));
    }

    #[test]
    fn token_signed_with_a_different_secret_is_rejected() {
        let token = mint("alice", "other-secret").unwrap();
        assert_eq!(verify(&token, SECRET), Err(TokenError::Invalid));
    }
}
