pub use sea_orm_migration::prelude::*;

mod m20260110_090000_users;
mod m20260110_100000_groups;
mod m20260111_090000_expenses;
mod m20260111_100000_payments;
mod m20260112_090000_balances;
mod m20260112_100000_audit;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260110_090000_users::Migration),
            Box::new(m20260110_100000_groups::Migration),
            Box::new(m20260111_090000_expenses::Migration),
            Box::new(m20260111_100000_payments::Migration),
            Box::new(m20260112_090000_balances::Migration),
            Box::new(m20260112_100000_audit::Migration),
        ]
    }
}
