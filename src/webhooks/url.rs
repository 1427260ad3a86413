use crate::db::entities::channel;
use crate::db::enums::WabaBsp;

/// Settings needed to derive and sign inbound webhook addresses.
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub backend_url: String,
    pub dev_webhook_url: Option<String>,
    pub environment: String,
    pub jwt_secret: String,
}

impl WebhookSettings {
    /// Public base URL the BSPs call back to. In `dev` the tunnel URL wins.
    pub fn base_url(&self) -> &str {
        if self.environment == "dev" {
            if let Some(dev_url) = self.dev_webhook_url.as_deref() {
                return dev_url;
            }
        }
        &self.backend_url
    }

    pub fn waba_webhook_url_for(&self, channel: &channel::Model) -> Option<String> {
        waba_webhook_url(
            self.base_url(),
            channel.waba_bsp,
            channel.waba_key_hook.as_deref(),
        )
    }
}

/// `{base}/wabahooks/{bsp}/{key}`, or `None` while the channel has no BSP or key yet.
pub fn waba_webhook_url(base_url: &str, bsp: Option<WabaBsp>, key: Option<&str>) -> Option<String> {
    let bsp = bsp?;
    let key = key.filter(|k| !k.is_empty())?;
    Some(format!(
        "{}/wabahooks/{}/{}",
        base_url.trim_end_matches('/'),
        bsp,
        key
    ))
}
