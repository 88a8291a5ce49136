use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if !manager.has_column("search_results", "contact_url").await? {
            manager
                .alter_table(
                    Table::alter()
                        .table(SearchResults::Table)
                        .add_column(ColumnDef::new(SearchResults::ContactUrl).string().null())
                        .to_owned(),
                )
                .await?;
        }

        if !manager.has_column("search_results", "is_wordpress").await? {
            manager
                .alter_table(
                    Table::alter()
                        .table(SearchResults::Table)
                        .add_column(ColumnDef::new(SearchResults::IsWordpress).boolean().null())
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if manager.has_column("search_results", "is_wordpress").await? {
            manager
                .alter_table(
                    Table::alter()
                        .table(SearchResults::Table)
                        .drop_column(SearchResults::IsWordpress)
                        .to_owned(),
                )
                .await?;
        }

        if manager.has_column("search_results", "contact_url").await? {
            manager
                .alter_table(
                    Table::alter()
                        .table(SearchResults::Table)
                        .drop_column(SearchResults::ContactUrl)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }
}

#[derive(DeriveIden)]
enum SearchResults {
    #[sea_orm(iden = "search_results")]
    Table,
    ContactUrl,
    IsWordpress,
}
