use chrono::Utc;
use ledger::{
    CreateExpenseCmd, CreatePaymentCmd, ExpenseListFilter, LedgerError, MoneyCents,
    UpdateExpenseCmd,
};

mod common;

use common::{assert_conserved, ledger_with_db, share, trip_group};

#[tokio::test]
async fn dinner_split_credits_payer_and_debits_participants() {
    let (ledger, _db) = ledger_with_db().await;
    let group_id = trip_group(&ledger).await;

    ledger
        .create_expense(
            CreateExpenseCmd::new(
                &group_id,
                "alice",
                "alice",
                MoneyCents::new(6000),
                vec![share("alice", 2000), share("bob", 2000), share("carol", 2000)],
                Utc::now(),
            )
            .description("Dinner"),
        )
        .await
        .unwrap();

    assert_eq!(
        ledger.net_balance(&group_id, "alice", "alice").await.unwrap(),
        MoneyCents::new(4000)
    );
    assert_eq!(
        ledger.net_balance(&group_id, "bob", "alice").await.unwrap(),
        MoneyCents::new(-2000)
    );
    assert_eq!(
        ledger.net_balance(&group_id, "carol", "alice").await.unwrap(),
        MoneyCents::new(-2000)
    );
    assert_conserved(&ledger, &group_id, "alice").await;

    // bob owes alice 20.00, signed positive from bob's side.
    assert_eq!(
        ledger
            .pair_balance(&group_id, "bob", "alice", "bob")
            .await
            .unwrap(),
        MoneyCents::new(2000)
    );
}

#[tokio::test]
async fn payment_settles_one_pair_and_leaves_the_other() {
    let (ledger, _db) = ledger_with_db().await;
    let group_id = trip_group(&ledger).await;

    ledger
        .create_expense(
            CreateExpenseCmd::new(
                &group_id,
                "alice",
                "alice",
                MoneyCents::new(6000),
                vec![share("alice", 2000), share("bob", 2000), share("carol", 2000)],
                Utc::now(),
            )
            .description("Dinner"),
        )
        .await
        .unwrap();

    ledger
        .create_payment(CreatePaymentCmd::new(
            &group_id,
            "bob",
            "bob",
            "alice",
            MoneyCents::new(2000),
            Utc::now(),
        ))
        .await
        .unwrap();

    assert_eq!(
        ledger.net_balance(&group_id, "alice", "alice").await.unwrap(),
        MoneyCents::new(2000)
    );
    assert_eq!(
        ledger.net_balance(&group_id, "bob", "alice").await.unwrap(),
        MoneyCents::ZERO
    );

    // The settled pair has no row; the open one still reads.
    assert_eq!(
        ledger
            .pair_balance(&group_id, "bob", "alice", "alice")
            .await
            .unwrap(),
        MoneyCents::ZERO
    );
    assert_eq!(
        ledger
            .pair_balance(&group_id, "carol", "alice", "alice")
            .await
            .unwrap(),
        MoneyCents::new(2000)
    );
    assert_conserved(&ledger, &group_id, "alice").await;
}

#[tokio::test]
async fn deleting_an_expense_reverses_only_its_own_contribution() {
    let (ledger, _db) = ledger_with_db().await;
    let group_id = trip_group(&ledger).await;

    let dinner_id = ledger
        .create_expense(
            CreateExpenseCmd::new(
                &group_id,
                "alice",
                "alice",
                MoneyCents::new(6000),
                vec![share("alice", 2000), share("bob", 2000), share("carol", 2000)],
                Utc::now(),
            )
            .description("Dinner"),
        )
        .await
        .unwrap();
    ledger
        .create_payment(CreatePaymentCmd::new(
            &group_id,
            "bob",
            "bob",
            "alice",
            MoneyCents::new(2000),
            Utc::now(),
        ))
        .await
        .unwrap();

    ledger
        .delete_expense(&group_id, dinner_id, "bob", Utc::now())
        .await
        .unwrap();

    // The dinner credit vanishes, the unrelated payment stays: alice now
    // holds bob's 20.00 without an expense to back it.
    assert_eq!(
        ledger.net_balance(&group_id, "alice", "alice").await.unwrap(),
        MoneyCents::new(-2000)
    );
    assert_eq!(
        ledger.net_balance(&group_id, "bob", "alice").await.unwrap(),
        MoneyCents::new(2000)
    );
    assert_eq!(
        ledger.net_balance(&group_id, "carol", "alice").await.unwrap(),
        MoneyCents::ZERO
    );
    assert_conserved(&ledger, &group_id, "alice").await;

    let err = ledger
        .delete_expense(&group_id, dinner_id, "alice", Utc::now())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LedgerError::Validation("expense already deleted".to_string())
    );
}

#[tokio::test]
async fn update_matches_delete_plus_recreate() {
    let (ledger, _db) = ledger_with_db().await;
    let updated_group = trip_group(&ledger).await;

    let expense_id = ledger
        .create_expense(CreateExpenseCmd::new(
            &updated_group,
            "alice",
            "alice",
            MoneyCents::new(3000),
            vec![share("bob", 1500), share("carol", 1500)],
            Utc::now(),
        ))
        .await
        .unwrap();
    ledger
        .update_expense(
            UpdateExpenseCmd::new(&updated_group, expense_id, "alice")
                .payer_id("bob")
                .amount(MoneyCents::new(4000))
                .shares(vec![share("alice", 2500), share("carol", 1500)]),
        )
        .await
        .unwrap();

    // Same history expressed as delete + create in a twin group.
    let recreated_group = ledger
        .create_group("Trip B", "alice", None)
        .await
        .unwrap();
    ledger
        .add_member(&recreated_group, "bob", "alice")
        .await
        .unwrap();
    ledger
        .add_member(&recreated_group, "carol", "alice")
        .await
        .unwrap();
    let twin_id = ledger
        .create_expense(CreateExpenseCmd::new(
            &recreated_group,
            "alice",
            "alice",
            MoneyCents::new(3000),
            vec![share("bob", 1500), share("carol", 1500)],
            Utc::now(),
        ))
        .await
        .unwrap();
    ledger
        .delete_expense(&recreated_group, twin_id, "alice", Utc::now())
        .await
        .unwrap();
    ledger
        .create_expense(CreateExpenseCmd::new(
            &recreated_group,
            "alice",
            "bob",
            MoneyCents::new(4000),
            vec![share("alice", 2500), share("carol", 1500)],
            Utc::now(),
        ))
        .await
        .unwrap();

    for user in ["alice", "bob", "carol"] {
        assert_eq!(
            ledger
                .net_balance(&updated_group, user, "alice")
                .await
                .unwrap(),
            ledger
                .net_balance(&recreated_group, user, "alice")
                .await
                .unwrap(),
            "net balance mismatch for {user}"
        );
    }
    for (a, b) in [("alice", "bob"), ("alice", "carol"), ("bob", "carol")] {
        assert_eq!(
            ledger
                .pair_balance(&updated_group, a, b, "alice")
                .await
                .unwrap(),
            ledger
                .pair_balance(&recreated_group, a, b, "alice")
                .await
                .unwrap(),
            "pair balance mismatch for {a}/{b}"
        );
    }
}

#[tokio::test]
async fn rejects_shares_that_do_not_sum_to_total() {
    let (ledger, _db) = ledger_with_db().await;
    let group_id = trip_group(&ledger).await;

    let err = ledger
        .create_expense(CreateExpenseCmd::new(
            &group_id,
            "alice",
            "alice",
            MoneyCents::new(6000),
            vec![share("alice", 2000), share("bob", 2000)],
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    // One cent of N-way rounding slack is fine.
    ledger
        .create_expense(CreateExpenseCmd::new(
            &group_id,
            "alice",
            "alice",
            MoneyCents::new(1000),
            vec![share("alice", 333), share("bob", 333), share("carol", 333)],
            Utc::now(),
        ))
        .await
        .unwrap();
    assert_conserved(&ledger, &group_id, "alice").await;
}

#[tokio::test]
async fn rejects_participants_outside_the_group() {
    let (ledger, _db) = ledger_with_db().await;
    let group_id = trip_group(&ledger).await;

    // dave exists but is no member.
    let err = ledger
        .create_expense(CreateExpenseCmd::new(
            &group_id,
            "alice",
            "alice",
            MoneyCents::new(1000),
            vec![share("alice", 500), share("dave", 500)],
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let err = ledger
        .create_expense(CreateExpenseCmd::new(
            &group_id,
            "alice",
            "dave",
            MoneyCents::new(1000),
            vec![share("alice", 1000)],
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}

#[tokio::test]
async fn idempotent_create_returns_the_existing_expense() {
    let (ledger, _db) = ledger_with_db().await;
    let group_id = trip_group(&ledger).await;

    let cmd = CreateExpenseCmd::new(
        &group_id,
        "alice",
        "alice",
        MoneyCents::new(3000),
        vec![share("bob", 1500), share("carol", 1500)],
        Utc::now(),
    )
    .idempotency_key("retry-1");

    let first = ledger.create_expense(cmd.clone()).await.unwrap();
    let second = ledger.create_expense(cmd).await.unwrap();
    assert_eq!(first, second);

    // Counted once, not twice.
    assert_eq!(
        ledger.net_balance(&group_id, "alice", "alice").await.unwrap(),
        MoneyCents::new(3000)
    );
}

#[tokio::test]
async fn list_expenses_paginates_with_cursor_and_hides_deleted() {
    let (ledger, _db) = ledger_with_db().await;
    let group_id = trip_group(&ledger).await;

    let mut ids = Vec::new();
    for i in 0..5 {
        let id = ledger
            .create_expense(
                CreateExpenseCmd::new(
                    &group_id,
                    "alice",
                    "alice",
                    MoneyCents::new(1000 + i),
                    vec![share("bob", 1000 + i)],
                    Utc::now(),
                )
                .description(format!("expense {i}")),
            )
            .await
            .unwrap();
        ids.push(id);
    }
    ledger
        .delete_expense(&group_id, ids[0], "alice", Utc::now())
        .await
        .unwrap();

    let filter = ExpenseListFilter::default();
    let (page1, cursor) = ledger
        .list_expenses(&group_id, "bob", 2, None, &filter)
        .await
        .unwrap();
    assert_eq!(page1.len(), 2);
    let cursor = cursor.expect("expected a second page");

    let (page2, cursor2) = ledger
        .list_expenses(&group_id, "bob", 2, Some(&cursor), &filter)
        .await
        .unwrap();
    assert_eq!(page2.len(), 2);
    assert!(cursor2.is_none(), "deleted expense should not page");

    let seen: Vec<_> = page1.iter().chain(page2.iter()).map(|e| e.id).collect();
    assert!(!seen.contains(&ids[0]));
    assert!(page1.iter().all(|e| !e.shares.is_empty()));

    let deleted_filter = ExpenseListFilter {
        include_deleted: true,
        ..Default::default()
    };
    let (all, _) = ledger
        .list_expenses(&group_id, "bob", 10, None, &deleted_filter)
        .await
        .unwrap();
    assert_eq!(all.len(), 5);
}

#[tokio::test]
async fn conservation_holds_after_every_operation() {
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
    assert_conserved(&ledger, &group_id, "alice").await;

    ledger
        .update_expense(
            UpdateExpenseCmd::new(&group_id, expense_id, "carol")
                .amount(MoneyCents::new(900))
                .shares(vec![share("bob", 450), share("carol", 450)]),
        )
        .await
        .unwrap();
    assert_conserved(&ledger, &group_id, "alice").await;

    ledger
        .create_payment(CreatePaymentCmd::new(
            &group_id,
            "bob",
            "bob",
            "alice",
            MoneyCents::new(450),
            Utc::now(),
        ))
        .await
        .unwrap();
    assert_conserved(&ledger, &group_id, "alice").await;

    ledger
        .delete_expense(&group_id, expense_id, "bob", Utc::now())
        .await
        .unwrap();
    assert_conserved(&ledger, &group_id, "alice").await;
}
