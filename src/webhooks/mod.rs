//! Inbound webhook addressing for BSP-backed channels: signed keys and the
//! public URL derived from them.

pub mod key;
pub mod url;

pub use key::{issue_webhook_key, verify_webhook_key, WebhookKeyClaims, WebhookKeyError};
pub use url::{waba_webhook_url, WebhookSettings};
