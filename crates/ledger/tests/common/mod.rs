use ledger::{Currency, Ledger, MoneyCents, ShareSpec};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

pub async fn ledger_with_db() -> (Ledger, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let ledger = Ledger::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    for (username, display_name) in [
        ("alice", "Alice"),
        ("bob", "Bob"),
        ("carol", "Carol"),
        ("dave", "Dave"),
    ] {
        ledger.create_user(username, display_name).await.unwrap();
    }
    (ledger, db)
}

/// Group "Trip" owned by alice, with bob and carol as active members.
pub async fn trip_group(ledger: &Ledger) -> String {
    let group_id = ledger
        .create_group("Trip", "alice", Some(Currency::Eur))
        .await
        .unwrap();
    ledger.add_member(&group_id, "bob", "alice").await.unwrap();
    ledger
        .add_member(&group_id, "carol", "alice")
        .await
        .unwrap();
    group_id
}

pub fn share(user: &str, cents: i64) -> ShareSpec {
    ShareSpec::new(user, MoneyCents::new(cents))
}

/// Conservation (money never enters or leaves a group): cached net
/// balances sum to zero within one cent.
pub async fn assert_conserved(ledger: &Ledger, group_id: &str, acting_user: &str) {
    let balances = ledger.group_balances(group_id, acting_user).await.unwrap();
    let sum: MoneyCents = balances.iter().map(|b| b.balance).sum();
    assert!(
        sum.is_negligible(),
        "group balances sum to {sum}, expected ~0"
    );
}
