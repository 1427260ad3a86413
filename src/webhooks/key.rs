use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifetime of an issued webhook key.
pub const WEBHOOK_KEY_TTL_DAYS: i64 = 1000;

/// Claims carried by the key embedded in a WABA webhook URL. The BSP calls
/// back with the key, which identifies the tenant and channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookKeyClaims {
    pub tenant_id: i32,
    pub whatsapp_id: i32,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Error, Debug)]
pub enum WebhookKeyError {
    #[error("Failed to sign webhook key: {0}")]
    Signing(jsonwebtoken::errors::Error),
    #[error("Invalid webhook key: {0}")]
    Invalid(jsonwebtoken::errors::Error),
}

pub fn issue_webhook_key(
    tenant_id: i32,
    channel_id: i32,
    secret: &str,
) -> Result<String, WebhookKeyError> {
    issue_webhook_key_at(tenant_id, channel_id, secret, Utc::now())
}

/// Signs a key as if issued at `issued_at`.
pub fn issue_webhook_key_at(
    tenant_id: i32,
    channel_id: i32,
    secret: &str,
    issued_at: DateTime<Utc>,
) -> Result<String, WebhookKeyError> {
    let expiration = issued_at + Duration::days(WEBHOOK_KEY_TTL_DAYS);
    let claims = WebhookKeyClaims {
        tenant_id,
        whatsapp_id: channel_id,
        iat: issued_at.timestamp() as usize,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(WebhookKeyError::Signing)
}

pub fn verify_webhook_key(token: &str, secret: &str) -> Result<WebhookKeyClaims, WebhookKeyError> {
    decode::<WebhookKeyClaims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(WebhookKeyError::Invalid)
}
