pub mod api_config_service;
pub mod channel_service;

pub use api_config_service::{find_status_subscribers, status_subscribers_query};
pub use channel_service::{
    create_channel, ensure_webhook_key, find_default_channel, find_resumable_channels,
    get_channel_by_id, is_resumable, soft_delete_channel, update_channel, update_channel_status,
    update_channel_status_with, ChannelServiceError, ChannelUpdate, NewChannel, StatusChange,
    StatusDetails,
};
