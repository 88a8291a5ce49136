use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SearchResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SearchResults::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SearchResults::SearchQuery)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SearchResults::Title).string().null())
                    .col(ColumnDef::new(SearchResults::Link).string().not_null())
                    .col(ColumnDef::new(SearchResults::Snippet).string().null())
                    .col(ColumnDef::new(SearchResults::Position).integer().null())
                    .col(ColumnDef::new(SearchResults::UserId).string().not_null())
                    .col(
                        ColumnDef::new(SearchResults::Processed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SearchResults::Category)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SearchResults::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SearchResults::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_results_query")
                    .table(SearchResults::Table)
                    .col(SearchResults::SearchQuery)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_results_user")
                    .table(SearchResults::Table)
                    .col(SearchResults::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_results_link_user")
                    .table(SearchResults::Table)
                    .col(SearchResults::Link)
                    .col(SearchResults::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SearchPagination::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SearchPagination::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SearchPagination::SearchQuery)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SearchPagination::UserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SearchPagination::LastStartPosition)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SearchPagination::TotalRequestsMade)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SearchPagination::LastUpdated)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pagination_query_user")
                    .table(SearchPagination::Table)
                    .col(SearchPagination::SearchQuery)
                    .col(SearchPagination::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SearchPagination::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SearchResults::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SearchResults {
    Table,
    Id,
    SearchQuery,
    Title,
    Link,
    Snippet,
    Position,
    UserId,
    Processed,
    Category,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SearchPagination {
    Table,
    Id,
    SearchQuery,
    UserId,
    LastStartPosition,
    TotalRequestsMade,
    LastUpdated,
}
