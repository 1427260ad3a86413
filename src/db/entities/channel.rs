use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::{ChannelStatus, ChannelType, WabaBsp};

/// One configured messaging-provider connection of a tenant.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "whatsapps")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique, column_type = "Text", nullable)]
    pub name: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub session: Option<String>, // Opaque provider session blob
    #[sea_orm(column_type = "Text", nullable)]
    pub qrcode: Option<String>,
    pub status: ChannelStatus,
    pub battery: Option<String>,
    pub plugged: Option<bool>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub retries: i32,
    pub is_default: bool,
    pub token_telegram: Option<String>,
    pub instagram_user: Option<String>,
    pub instagram_key: Option<String>,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    pub number: Option<String>,
    pub phone: Option<Json>,
    pub tenant_id: i32,
    pub waba_bsp: Option<WabaBsp>,
    #[sea_orm(column_type = "Text", nullable)]
    pub waba_api_key: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub waba_key_hook: Option<String>, // Signed webhook key, see webhooks::key
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id",
        on_delete = "Cascade",
        on_update = "Cascade"
    )]
    Tenant,
    #[sea_orm(has_many = "super::api_config::Entity")]
    ApiConfigs,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl Related<super::api_config::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApiConfigs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Credential accessors; an empty string counts as missing.
    pub fn telegram_token(&self) -> Option<&str> {
        non_empty(self.token_telegram.as_deref())
    }

    pub fn instagram_credentials(&self) -> Option<&str> {
        non_empty(self.instagram_key.as_deref())
    }

    pub fn waba_credentials(&self) -> Option<&str> {
        non_empty(self.waba_api_key.as_deref())
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
