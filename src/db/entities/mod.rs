//! SeaORM Entity Crate
//!
//! Defines the SeaORM entities that map to database tables.

pub mod api_config;
pub mod channel;
pub mod tenant;
