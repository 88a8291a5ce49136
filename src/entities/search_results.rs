use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "search_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub search_query: String,
    pub title: Option<String>,
    pub link: String,
    pub snippet: Option<String>,
    pub position: Option<i32>,
    pub user_id: String,
    pub processed: i32,
    pub category: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub errors: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub scan_details: Option<String>,
    pub contact_url: Option<String>,
    pub is_wordpress: Option<bool>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
