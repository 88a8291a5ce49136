use sea_orm::entity::prelude::*;

/// One cursor row per `(search_query, user_id)` pair, enforced by a unique
/// index. `last_start_position` is the next upstream offset to request.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "search_pagination")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub search_query: String,
    pub user_id: String,
    pub last_start_position: i64,
    pub total_requests_made: i64,
    pub last_updated: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
