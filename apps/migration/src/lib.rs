//! Schema migrations for the geofeed tables.
//!
//! Every view is its own table. Composite primary keys follow the
//! partition-then-clustering layout the repositories scan by.

pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_post_views;
mod m20250101_000002_create_engagement;
mod m20250101_000003_create_social;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_post_views::Migration),
            Box::new(m20250101_000002_create_engagement::Migration),
            Box::new(m20250101_000003_create_social::Migration),
        ]
    }
}
