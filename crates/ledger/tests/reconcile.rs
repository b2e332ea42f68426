use chrono::Utc;
use ledger::{
    AuditAction, CreateExpenseCmd, CreatePaymentCmd, MoneyCents, UpdateExpenseCmd,
};
use sea_orm::{ConnectionTrait, Statement};

mod common;

use common::{ledger_with_db, share, trip_group};

#[tokio::test]
async fn consistent_caches_report_nothing_to_repair() {
    let (ledger, _db) = ledger_with_db().await;
    let group_id = trip_group(&ledger).await;

    ledger
        .create_expense(CreateExpenseCmd::new(
            &group_id,
            "alice",
            "alice",
            MoneyCents::new(6000),
            vec![share("alice", 2000), share("bob", 2000), share("carol", 2000)],
            Utc::now(),
        ))
        .await
        .unwrap();

    let report = ledger.reconcile(&group_id, "alice").await.unwrap();
    assert!(!report.repaired);
    assert!(report.diffs.is_empty());
}

#[tokio::test]
async fn corrupted_net_cache_is_restored_and_audited() {
    let (ledger, db) = ledger_with_db().await;
    let backend = db.get_database_backend();
    let group_id = trip_group(&ledger).await;

    ledger
        .create_expense(CreateExpenseCmd::new(
            &group_id,
            "alice",
            "alice",
            MoneyCents::new(6000),
            vec![share("alice", 2000), share("bob", 2000), share("carol", 2000)],
            Utc::now(),
        ))
        .await
        .unwrap();

    // Tamper with the cache directly, the way drift used to happen.
    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE net_balances SET balance_minor = ? WHERE group_id = ? AND user_id = ?;",
        vec![99999i64.into(), group_id.clone().into(), "alice".into()],
    ))
    .await
    .unwrap();

    let report = ledger.reconcile(&group_id, "ops").await.unwrap();
    assert!(report.repaired);
    assert_eq!(report.diffs.len(), 1);
    assert_eq!(report.diffs[0].cached, MoneyCents::new(99999));
    assert_eq!(report.diffs[0].computed, MoneyCents::new(4000));

    assert_eq!(
        ledger.net_balance(&group_id, "alice", "alice").await.unwrap(),
        MoneyCents::new(4000)
    );

    let entries = ledger.list_audit(&group_id, "alice", 10).await.unwrap();
    assert!(
        entries
            .iter()
            .any(|e| e.action == AuditAction::BalanceRepaired),
        "repair should leave an audit entry"
    );
}

#[tokio::test]
async fn corrupted_pair_rows_collapse_back_to_one_orientation() {
    let (ledger, db) = ledger_with_db().await;
    let backend = db.get_database_backend();
    let group_id = trip_group(&ledger).await;

    ledger
        .create_expense(CreateExpenseCmd::new(
            &group_id,
            "alice",
            "alice",
            MoneyCents::new(6000),
            vec![share("alice", 2000), share("bob", 2000), share("carol", 2000)],
            Utc::now(),
        ))
        .await
        .unwrap();

    // Inject the forbidden reverse-orientation row for bob/alice.
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO pair_balances (id, group_id, debtor_id, creditor_id, amount_minor, revision) \
         VALUES (?, ?, ?, ?, ?, ?);",
        vec![
            "bogus-row".into(),
            group_id.clone().into(),
            "alice".into(),
            "bob".into(),
            700i64.into(),
            1i64.into(),
        ],
    ))
    .await
    .unwrap();

    let report = ledger.reconcile(&group_id, "ops").await.unwrap();
    assert!(report.repaired);

    assert_eq!(
        ledger
            .pair_balance(&group_id, "bob", "alice", "alice")
            .await
            .unwrap(),
        MoneyCents::new(2000)
    );

    let row = db
        .query_one(Statement::from_sql_and_values(
            backend,
            "SELECT COUNT(*) AS n FROM pair_balances WHERE group_id = ?;",
            vec![group_id.clone().into()],
        ))
        .await
        .unwrap()
        .unwrap();
    let count: i64 = row.try_get("", "n").unwrap();
    assert_eq!(count, 2, "one row per indebted pair, single orientation");
}

#[tokio::test]
async fn reconcile_is_idempotent() {
    let (ledger, db) = ledger_with_db().await;
    let backend = db.get_database_backend();
    let group_id = trip_group(&ledger).await;

    ledger
        .create_expense(CreateExpenseCmd::new(
            &group_id,
            "alice",
            "alice",
            MoneyCents::new(3000),
            vec![share("bob", 1500), share("carol", 1500)],
            Utc::now(),
        ))
        .await
        .unwrap();

    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE net_balances SET balance_minor = ? WHERE group_id = ? AND user_id = ?;",
        vec![(-12345i64).into(), group_id.clone().into(), "bob".into()],
    ))
    .await
    .unwrap();

    let first = ledger.reconcile(&group_id, "ops").await.unwrap();
    assert!(first.repaired);

    let second = ledger.reconcile(&group_id, "ops").await.unwrap();
    assert!(!second.repaired);
    assert!(second.diffs.is_empty());
}

#[tokio::test]
async fn incremental_updates_match_the_reducer_at_every_step() {
    let (ledger, _db) = ledger_with_db().await;
    let group_id = trip_group(&ledger).await;

    let expense_id = ledger
        .create_expense(CreateExpenseCmd::new(
            &group_id,
            "alice",
            "alice",
            MoneyCents::new(1000),
            vec![share("alice", 334), share("bob", 333), share("carol", 333)],
            Utc::now(),
        ))
        .await
        .unwrap();
    let report = ledger.reconcile(&group_id, "ops").await.unwrap();
    assert!(!report.repaired, "drift after create: {:?}", report.diffs);

    ledger
        .update_expense(
            UpdateExpenseCmd::new(&group_id, expense_id, "bob")
                .payer_id("bob")
                .amount(MoneyCents::new(2000))
                .shares(vec![share("alice", 1000), share("carol", 1000)]),
        )
        .await
        .unwrap();
    let report = ledger.reconcile(&group_id, "ops").await.unwrap();
    assert!(!report.repaired, "drift after update: {:?}", report.diffs);

    ledger
        .create_payment(CreatePaymentCmd::new(
            &group_id,
            "carol",
            "carol",
            "bob",
            MoneyCents::new(1000),
            Utc::now(),
        ))
        .await
        .unwrap();
    let report = ledger.reconcile(&group_id, "ops").await.unwrap();
    assert!(!report.repaired, "drift after payment: {:?}", report.diffs);

    ledger
        .delete_expense(&group_id, expense_id, "alice", Utc::now())
        .await
        .unwrap();
    let report = ledger.reconcile(&group_id, "ops").await.unwrap();
    assert!(!report.repaired, "drift after delete: {:?}", report.diffs);
}
