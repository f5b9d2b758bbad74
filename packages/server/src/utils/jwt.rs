use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// JWT Claims structure.
///
/// Tokens are issued by the platform's auth service; this service only
/// verifies them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Username
    pub uid: i32,    // User ID
    #[serde(default)]
    pub permissions: Vec<String>,
    pub exp: usize, // Expiration timestamp
}

/// Sign a token for a user. Used by tooling and tests.
pub fn sign(
    secret: &str,
    user_id: i32,
    username: &str,
    permissions: &[&str],
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: username.to_owned(),
        uid: user_id,
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        exp: (Utc::now() + ttl).timestamp().max(0) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify and decode a JWT token.
pub fn verify(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
