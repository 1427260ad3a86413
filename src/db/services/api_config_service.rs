use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Select,
};

use crate::db::entities::api_config;

/// API integrations subscribed to status changes of one channel (`session_id`).
pub fn status_subscribers_query(tenant_id: i32, session_id: i32) -> Select<api_config::Entity> {
    api_config::Entity::find()
        .filter(api_config::Column::TenantId.eq(tenant_id))
        .filter(api_config::Column::SessionId.eq(session_id))
        .order_by_asc(api_config::Column::Id)
}

pub async fn find_status_subscribers(
    db: &DatabaseConnection,
    tenant_id: i32,
    session_id: i32,
) -> Result<Vec<api_config::Model>, DbErr> {
    status_subscribers_query(tenant_id, session_id).all(db).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_api_config;
    use sea_orm::{DatabaseBackend, MockDatabase, QueryTrait, Transaction};

    #[test]
    fn subscribers_match_tenant_and_session_only() {
        let sql = status_subscribers_query(1, 10)
            .build(DatabaseBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""api_configs"."tenant_id" = 1"#), "{sql}");
        assert!(sql.contains(r#""api_configs"."session_id" = 10"#), "{sql}");
        assert!(!sql.contains("is_active"), "{sql}");
    }

    #[tokio::test]
    async fn inactive_configs_are_still_subscribers() {
        let mut inactive = sample_api_config(2, 10);
        inactive.is_active = false;
        let rows = vec![sample_api_config(1, 10), inactive];
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([rows.clone()])
            .into_connection();

        let found = find_status_subscribers(&db, 1, 10).await.unwrap();
        assert_eq!(found, rows);
        assert_eq!(
            db.into_transaction_log(),
            vec![Transaction::one(
                status_subscribers_query(1, 10).build(DatabaseBackend::Postgres)
            )]
        );
    }
}
