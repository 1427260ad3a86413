use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// External API integration of a tenant. `url_service_status` receives the
/// session status webhooks of the channel referenced by `session_id`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "api_configs")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub session_id: i32,
    pub tenant_id: i32,
    pub user_id: Option<i32>,
    pub name: String,
    pub is_active: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub token_api: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub url_service_status: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub url_message_status: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::channel::Entity",
        from = "Column::SessionId",
        to = "super::channel::Column::Id",
        on_delete = "Cascade",
        on_update = "Cascade"
    )]
    Channel,
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id",
        on_delete = "Cascade",
        on_update = "Cascade"
    )]
    Tenant,
}

impl Related<super::channel::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Channel.def()
    }
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
