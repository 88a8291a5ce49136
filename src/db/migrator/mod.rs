use sea_orm_migration::prelude::*;

mod m20250310_initial;
mod m20250322_add_scan_columns;
mod m20250406_add_site_metadata;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250310_initial::Migration),
            Box::new(m20250322_add_scan_columns::Migration),
            Box::new(m20250406_add_site_metadata::Migration),
        ]
    }
}
