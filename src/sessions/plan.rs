use crate::db::entities::channel;
use crate::db::enums::{ChannelType, WabaBsp};
use crate::db::services::is_resumable;

use super::Provider;

/// Why a loaded channel got no session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotResumable,
    MissingTelegramToken,
    MissingWabaApiKey,
    UnsupportedBsp(Option<WabaBsp>),
    MissingInstagramKey,
    NoStarter,
}

#[derive(Debug, Clone)]
pub struct PlannedStart {
    pub provider: Provider,
    pub channel: channel::Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedChannel {
    pub channel_id: i32,
    pub channel_type: ChannelType,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default)]
pub struct SessionPlan {
    pub starts: Vec<PlannedStart>,
    pub skipped: Vec<SkippedChannel>,
}

impl SessionPlan {
    pub fn count(&self, provider: Provider) -> usize {
        self.starts.iter().filter(|s| s.provider == provider).count()
    }
}

/// Picks the starter for a channel from its type and stored credentials.
pub fn select_provider(channel: &channel::Model) -> Result<Provider, SkipReason> {
    if !is_resumable(channel) {
        return Err(SkipReason::NotResumable);
    }
    match channel.channel_type {
        ChannelType::Whatsapp => Ok(Provider::WhatsApp),
        ChannelType::Telegram => channel
            .telegram_token()
            .map(|_| Provider::Telegram)
            .ok_or(SkipReason::MissingTelegramToken),
        ChannelType::Waba => {
            if channel.waba_credentials().is_none() {
                return Err(SkipReason::MissingWabaApiKey);
            }
            match channel.waba_bsp {
                Some(WabaBsp::Dialog360) => Ok(Provider::Waba360),
                other => Err(SkipReason::UnsupportedBsp(other)),
            }
        }
        ChannelType::Instagram => channel
            .instagram_credentials()
            .map(|_| Provider::Instagram)
            .ok_or(SkipReason::MissingInstagramKey),
    }
}

/// Partitions channels into starts grouped by provider, in dispatch order,
/// and the channels left out.
pub fn plan_session_starts(channels: Vec<channel::Model>) -> SessionPlan {
    let mut plan = SessionPlan::default();
    for channel in channels {
        match select_provider(&channel) {
            Ok(provider) => plan.starts.push(PlannedStart { provider, channel }),
            Err(reason) => plan.skipped.push(SkippedChannel {
                channel_id: channel.id,
                channel_type: channel.channel_type,
                reason,
            }),
        }
    }
    // Stable: channels keep their id order inside each provider group.
    plan.starts.sort_by_key(|start| start.provider);
    plan
}
