//! HS256 token verification for user/company claims.

use crate::error::JwtError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token payload. Registered claims are optional; `exp` and `nbf` are enforced only when present.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Claims {
    pub user_id: String,
    /// Tenant identifier used to route to the company database.
    pub company_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    /// Claims for `user_id` in `company_id`, issued now and valid for `ttl`.
    pub fn new(user_id: impl Into<String>, company_id: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Claims {
            user_id: user_id.into(),
            company_id: company_id.into(),
            iat: Some(now.timestamp()),
            exp: Some((now + ttl).timestamp()),
            jti: Some(Uuid::new_v4().to_string()),
            ..Default::default()
        }
    }
}

pub struct JwtParser {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtParser {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_aud = false;
        validation.validate_nbf = true;
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify the signature and decode the claims.
    pub fn parse_claims(&self, token: &str) -> Result<Claims, JwtError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Sign `claims` with the shared secret.
    pub fn issue(&self, claims: &Claims) -> Result<String, JwtError> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)?)
    }
}
