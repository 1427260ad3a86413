//! Row fixtures shared by the unit tests.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use sea_orm::DatabaseConnection;

use crate::db::entities::{api_config, channel};
use crate::db::enums::{ChannelStatus, ChannelType, WabaBsp};
use crate::hooks::StatusHook;
use crate::queue::JobQueue;
use crate::sessions::{SessionContext, SessionRegistry};
use crate::webhooks::WebhookSettings;

pub fn sample_channel(id: i32, channel_type: ChannelType, status: ChannelStatus) -> channel::Model {
    let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    channel::Model {
        id,
        name: Some(format!("channel-{id}")),
        session: None,
        qrcode: None,
        status,
        battery: None,
        plugged: None,
        is_active: true,
        is_deleted: false,
        retries: 0,
        is_default: false,
        token_telegram: (channel_type == ChannelType::Telegram).then(|| "123:telegram-token".to_string()),
        instagram_user: (channel_type == ChannelType::Instagram).then(|| "shop".to_string()),
        instagram_key: (channel_type == ChannelType::Instagram).then(|| "insta-secret".to_string()),
        channel_type,
        number: Some("5511999990000".to_string()),
        phone: None,
        tenant_id: 1,
        waba_bsp: (channel_type == ChannelType::Waba).then_some(WabaBsp::Dialog360),
        waba_api_key: (channel_type == ChannelType::Waba).then(|| "d360-key".to_string()),
        waba_key_hook: None,
        created_at: timestamp,
        updated_at: timestamp,
    }
}

pub fn sample_api_config(id: i32, session_id: i32) -> api_config::Model {
    let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    api_config::Model {
        id,
        session_id,
        tenant_id: 1,
        user_id: Some(1),
        name: format!("integration-{id}"),
        is_active: true,
        token_api: None,
        url_service_status: Some(format!("https://tenant.example.com/status/{id}")),
        url_message_status: None,
        created_at: timestamp,
        updated_at: timestamp,
    }
}

/// Session context over a (mock) connection. Status-hook jobs go to a queue
/// whose receiver is dropped, so tests must not reach a hooked subscriber.
pub fn context_over(db: DatabaseConnection) -> SessionContext {
    let db = Arc::new(db);
    let (queue, _receiver) = JobQueue::new(8);
    SessionContext::new(
        db.clone(),
        SessionRegistry::new(),
        StatusHook::new(db, queue, "en"),
        WebhookSettings {
            backend_url: "https://api.example.com".to_string(),
            dev_webhook_url: None,
            environment: "production".to_string(),
            jwt_secret: "secret".to_string(),
        },
    )
}
