use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    FromQueryResult, IntoActiveModel, QueryFilter, QueryOrder, QueryResult, Select, Set,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::entities::channel;
use crate::db::enums::{ChannelStatus, ChannelType, WabaBsp};
use crate::webhooks::{issue_webhook_key, WebhookKeyError};

#[derive(Error, Debug)]
pub enum ChannelServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),
    #[error("Webhook key error: {0}")]
    WebhookKeyError(#[from] WebhookKeyError),
    #[error("Channel not found: {0}")]
    NotFound(i32),
}

/// Fields accepted when an admin creates a channel.
#[derive(Debug, Clone, Default)]
pub struct NewChannel {
    pub tenant_id: i32,
    pub name: Option<String>,
    pub channel_type: ChannelType,
    pub is_default: bool,
    pub token_telegram: Option<String>,
    pub instagram_user: Option<String>,
    pub instagram_key: Option<String>,
    pub waba_bsp: Option<WabaBsp>,
    pub waba_api_key: Option<String>,
}

/// Partial admin edit; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ChannelUpdate {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub is_default: Option<bool>,
    pub token_telegram: Option<String>,
    pub instagram_user: Option<String>,
    pub instagram_key: Option<String>,
    pub waba_bsp: Option<WabaBsp>,
    pub waba_api_key: Option<String>,
}

/// Extra columns written together with a status.
#[derive(Debug, Clone, Default)]
pub struct StatusDetails {
    pub qrcode: Option<String>,
    pub number: Option<String>,
}

/// Result of a status write: the stored row and the status it replaced.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub previous: ChannelStatus,
    pub current: channel::Model,
}

impl StatusChange {
    pub fn changed(&self) -> bool {
        self.previous != self.current.status
    }
}

// --- Session resume selection ---

/// Channels that must be resumed on boot:
/// active, and either a token-based provider that is not DISCONNECTED, or a
/// WhatsApp session that was neither DESTROYED nor left waiting on a QR scan.
pub fn resumable_condition() -> Condition {
    Condition::all()
        .add(channel::Column::IsActive.eq(true))
        .add(
            Condition::any()
                .add(
                    Condition::all()
                        .add(channel::Column::ChannelType.is_in([
                            ChannelType::Instagram,
                            ChannelType::Telegram,
                            ChannelType::Waba,
                        ]))
                        .add(channel::Column::Status.is_not_in([ChannelStatus::Disconnected])),
                )
                .add(
                    Condition::all()
                        .add(channel::Column::ChannelType.eq(ChannelType::Whatsapp))
                        .add(
                            channel::Column::Status
                                .is_not_in([ChannelStatus::Destroyed, ChannelStatus::Qrcode]),
                        ),
                ),
        )
}

/// In-memory form of [`resumable_condition`].
pub fn is_resumable(channel: &channel::Model) -> bool {
    if !channel.is_active {
        return false;
    }
    match channel.channel_type {
        ChannelType::Instagram | ChannelType::Telegram | ChannelType::Waba => {
            channel.status != ChannelStatus::Disconnected
        }
        ChannelType::Whatsapp => !matches!(
            channel.status,
            ChannelStatus::Destroyed | ChannelStatus::Qrcode
        ),
    }
}

pub fn resumable_channels_query() -> Select<channel::Entity> {
    channel::Entity::find()
        .filter(resumable_condition())
        .order_by_asc(channel::Column::Id)
}

/// A channel row whose text columns may hold values outside the known enums.
enum LoadedChannel {
    Decoded(channel::Model),
    Undecodable { id: Option<i32>, error: String },
}

impl FromQueryResult for LoadedChannel {
    fn from_query_result(res: &QueryResult, pre: &str) -> Result<Self, DbErr> {
        match channel::Model::from_query_result(res, pre) {
            Ok(model) => Ok(Self::Decoded(model)),
            Err(DbErr::Type(error)) => Ok(Self::Undecodable {
                id: res.try_get(pre, "id").ok(),
                error,
            }),
            Err(e) => Err(e),
        }
    }
}

/// Loads the channels to resume. Rows that cannot be decoded (for example an
/// unknown status) are skipped with a warning; they never fail the whole load.
pub async fn find_resumable_channels(
    db: &DatabaseConnection,
) -> Result<Vec<channel::Model>, DbErr> {
    let rows = resumable_channels_query()
        .into_model::<LoadedChannel>()
        .all(db)
        .await?;

    let mut channels = Vec::with_capacity(rows.len());
    for row in rows {
        match row {
            LoadedChannel::Decoded(model) => channels.push(model),
            LoadedChannel::Undecodable { id, error } => {
                warn!(channel_id = ?id, %error, "Skipping channel row that cannot be decoded.");
            }
        }
    }
    Ok(channels)
}

// --- Lookups ---

pub async fn get_channel_by_id(
    db: &DatabaseConnection,
    channel_id: i32,
) -> Result<Option<channel::Model>, DbErr> {
    channel::Entity::find_by_id(channel_id).one(db).await
}

pub fn default_channel_query(tenant_id: i32, channel_type: ChannelType) -> Select<channel::Entity> {
    channel::Entity::find()
        .filter(channel::Column::TenantId.eq(tenant_id))
        .filter(channel::Column::ChannelType.eq(channel_type))
        .filter(channel::Column::IsDefault.eq(true))
        .filter(channel::Column::IsDeleted.eq(false))
        .order_by_asc(channel::Column::Id)
}

/// Default channel of a tenant for one provider. Uniqueness is not enforced
/// by storage, so the oldest default wins.
pub async fn find_default_channel(
    db: &DatabaseConnection,
    tenant_id: i32,
    channel_type: ChannelType,
) -> Result<Option<channel::Model>, DbErr> {
    default_channel_query(tenant_id, channel_type).one(db).await
}

// --- Mutations ---

pub async fn create_channel(
    db: &DatabaseConnection,
    new_channel: NewChannel,
    jwt_secret: &str,
) -> Result<channel::Model, ChannelServiceError> {
    let now = Utc::now();
    let active_channel = channel::ActiveModel {
        name: Set(new_channel.name),
        session: Set(None),
        qrcode: Set(None),
        status: Set(ChannelStatus::Disconnected),
        battery: Set(None),
        plugged: Set(None),
        is_active: Set(true),
        is_deleted: Set(false),
        retries: Set(0),
        is_default: Set(new_channel.is_default),
        token_telegram: Set(new_channel.token_telegram),
        instagram_user: Set(new_channel.instagram_user),
        instagram_key: Set(new_channel.instagram_key),
        channel_type: Set(new_channel.channel_type),
        number: Set(None),
        phone: Set(None),
        tenant_id: Set(new_channel.tenant_id),
        waba_bsp: Set(new_channel.waba_bsp),
        waba_api_key: Set(new_channel.waba_api_key),
        waba_key_hook: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default() // id
    };

    let created = active_channel.insert(db).await?;
    info!(
        channel_id = created.id,
        tenant_id = created.tenant_id,
        channel_type = %created.channel_type,
        "Channel created."
    );

    // The key embeds the channel id, so it can only be issued after the insert.
    ensure_webhook_key(db, created, jwt_secret).await
}

pub async fn update_channel(
    db: &DatabaseConnection,
    channel_id: i32,
    changes: ChannelUpdate,
    jwt_secret: &str,
) -> Result<channel::Model, ChannelServiceError> {
    let existing = get_channel_by_id(db, channel_id)
        .await?
        .ok_or(ChannelServiceError::NotFound(channel_id))?;

    let mut active_channel = existing.into_active_model();
    if let Some(name) = changes.name {
        active_channel.name = Set(Some(name));
    }
    if let Some(is_active) = changes.is_active {
        active_channel.is_active = Set(is_active);
    }
    if let Some(is_default) = changes.is_default {
        active_channel.is_default = Set(is_default);
    }
    if let Some(token) = changes.token_telegram {
        active_channel.token_telegram = Set(Some(token));
    }
    if let Some(user) = changes.instagram_user {
        active_channel.instagram_user = Set(Some(user));
    }
    if let Some(key) = changes.instagram_key {
        active_channel.instagram_key = Set(Some(key));
    }
    if let Some(bsp) = changes.waba_bsp {
        active_channel.waba_bsp = Set(Some(bsp));
    }
    if let Some(api_key) = changes.waba_api_key {
        active_channel.waba_api_key = Set(Some(api_key));
    }
    active_channel.updated_at = Set(Utc::now());

    let updated = active_channel.update(db).await?;
    ensure_webhook_key(db, updated, jwt_secret).await
}

/// Issues and stores a webhook key for WABA channels that do not carry one.
/// Any other channel is returned unchanged without touching the database.
pub async fn ensure_webhook_key(
    db: &DatabaseConnection,
    channel: channel::Model,
    jwt_secret: &str,
) -> Result<channel::Model, ChannelServiceError> {
    let has_key = channel
        .waba_key_hook
        .as_deref()
        .is_some_and(|key| !key.is_empty());
    if channel.channel_type != ChannelType::Waba || has_key {
        return Ok(channel);
    }

    let key = issue_webhook_key(channel.tenant_id, channel.id, jwt_secret)?;
    let channel_id = channel.id;
    let mut active_channel = channel.into_active_model();
    active_channel.waba_key_hook = Set(Some(key));
    active_channel.updated_at = Set(Utc::now());
    let updated = active_channel.update(db).await?;

    debug!(channel_id, "Issued WABA webhook key.");
    Ok(updated)
}

pub async fn update_channel_status(
    db: &DatabaseConnection,
    channel_id: i32,
    status: ChannelStatus,
) -> Result<StatusChange, ChannelServiceError> {
    update_channel_status_with(db, channel_id, status, StatusDetails::default()).await
}

/// Writes a status and returns the transition.
///
/// Entering `qrcode` stores the QR payload and counts a pairing retry;
/// entering `CONNECTED` clears both.
pub async fn update_channel_status_with(
    db: &DatabaseConnection,
    channel_id: i32,
    status: ChannelStatus,
    details: StatusDetails,
) -> Result<StatusChange, ChannelServiceError> {
    let existing = get_channel_by_id(db, channel_id)
        .await?
        .ok_or(ChannelServiceError::NotFound(channel_id))?;
    let previous = existing.status;
    let retries = existing.retries;

    let mut active_channel = existing.into_active_model();
    active_channel.status = Set(status);
    match status {
        ChannelStatus::Qrcode => {
            active_channel.qrcode = Set(details.qrcode);
            active_channel.retries = Set(retries + 1);
        }
        ChannelStatus::Connected => {
            active_channel.qrcode = Set(None);
            active_channel.retries = Set(0);
        }
        _ => {}
    }
    if let Some(number) = details.number {
        active_channel.number = Set(Some(number));
    }
    active_channel.updated_at = Set(Utc::now());

    let current = active_channel.update(db).await?;
    debug!(channel_id, %previous, status = %current.status, "Channel status updated.");
    Ok(StatusChange { previous, current })
}

/// Channels are never hard-deleted; a deleted channel is also deactivated so
/// it is never resumed.
pub async fn soft_delete_channel(
    db: &DatabaseConnection,
    channel_id: i32,
) -> Result<channel::Model, ChannelServiceError> {
    let existing = get_channel_by_id(db, channel_id)
        .await?
        .ok_or(ChannelServiceError::NotFound(channel_id))?;

    let mut active_channel = existing.into_active_model();
    active_channel.is_deleted = Set(true);
    active_channel.is_active = Set(false);
    active_channel.is_default = Set(false);
    active_channel.updated_at = Set(Utc::now());
    Ok(active_channel.update(db).await?)
}
