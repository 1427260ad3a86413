use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Messaging provider a channel is bound to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    #[default]
    #[sea_orm(string_value = "whatsapp")]
    Whatsapp,
    #[sea_orm(string_value = "telegram")]
    Telegram,
    #[sea_orm(string_value = "instagram")]
    Instagram,
    #[sea_orm(string_value = "waba")]
    Waba,
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value())
    }
}

/// Connectivity status reported by the provider sessions.
///
/// `qrcode` is lowercase in storage; every other value is uppercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ChannelStatus {
    #[sea_orm(string_value = "OPENING")]
    #[serde(rename = "OPENING")]
    Opening,
    #[sea_orm(string_value = "qrcode")]
    #[serde(rename = "qrcode")]
    Qrcode,
    #[sea_orm(string_value = "PAIRING")]
    #[serde(rename = "PAIRING")]
    Pairing,
    #[sea_orm(string_value = "TIMEOUT")]
    #[serde(rename = "TIMEOUT")]
    Timeout,
    #[sea_orm(string_value = "CONNECTED")]
    #[serde(rename = "CONNECTED")]
    Connected,
    #[sea_orm(string_value = "DISCONNECTED")]
    #[serde(rename = "DISCONNECTED")]
    Disconnected,
    #[sea_orm(string_value = "DESTROYED")]
    #[serde(rename = "DESTROYED")]
    Destroyed,
}

impl ChannelStatus {
    /// Statuses whose transitions are pushed to the tenant's status webhooks.
    pub fn is_hooked(&self) -> bool {
        matches!(
            self,
            ChannelStatus::Destroyed | ChannelStatus::Disconnected | ChannelStatus::Connected
        )
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value())
    }
}

/// WABA Business Solution Provider operating the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum WabaBsp {
    #[sea_orm(string_value = "360")]
    #[serde(rename = "360")]
    Dialog360,
    #[sea_orm(string_value = "gupshup")]
    #[serde(rename = "gupshup")]
    Gupshup,
}

impl fmt::Display for WabaBsp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value())
    }
}
