use std::time::Duration;

use atec_core::models::user::Role;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::crypto::SharedCryptor;
use crate::error::CryptoError;

pub const ISSUER: &str = "system";

/// What a token authorizes, carried in `sub`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    SignupVerification,
    Login,
    ChangePassword,
}

impl TokenKind {
    pub fn subject(self) -> &'static str {
        match self {
            TokenKind::SignupVerification => "signup-verification-token",
            TokenKind::Login => "login-token",
            TokenKind::ChangePassword => "change-password",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub iss: String,
    pub sub: String,
    /// The target user id, always a single entry.
    pub aud: Vec<String>,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Why a presented token was refused.
#[derive(Debug)]
pub enum TokenRejection {
    Expired,
    Invalid(CryptoError),
}

impl SharedCryptor {
    pub fn issue_token(
        &self,
        kind: TokenKind,
        audience: &str,
        role: Option<Role>,
        ttl: Duration,
    ) -> Result<String, CryptoError> {
        let now = jiff::Timestamp::now().as_second();
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = TokenClaims {
            iss: ISSUER.to_string(),
            sub: kind.subject().to_string(),
            aud: vec![audience.to_string()],
            exp: now.saturating_add(ttl),
            iat: Some(now),
            role,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.signing_key()),
        )?;
        Ok(token)
    }

    /// Verify signature, algorithm, expiry, issuer and subject.
    pub fn validate_token(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, TokenRejection> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.set_issuer(&[ISSUER]);
        validation.sub = Some(kind.subject().to_string());
        validation.validate_aud = false;
        validation.leeway = 0;

        decode::<TokenClaims>(token, &DecodingKey::from_secret(self.signing_key()), &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenRejection::Expired,
                _ => TokenRejection::Invalid(e.into()),
            })
    }
}
