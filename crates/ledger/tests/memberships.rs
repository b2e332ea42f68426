use chrono::Utc;
use ledger::{
    CreateExpenseCmd, CreatePaymentCmd, LedgerError, MembershipStatus, MoneyCents,
};

mod common;

use common::{ledger_with_db, share, trip_group};

#[tokio::test]
async fn removal_refused_while_balance_is_outstanding() {
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

    let err = ledger
        .remove_member(&group_id, "carol", "alice")
        .await
        .unwrap_err();
    match err {
        LedgerError::Precondition(reason) => {
            assert!(reason.contains("carol"), "reason should name the member");
        }
        other => panic!("expected Precondition, got {other:?}"),
    }

    // Still an active member.
    let members = ledger.list_members(&group_id, "alice").await.unwrap();
    let carol = members.iter().find(|m| m.user_id == "carol").unwrap();
    assert_eq!(carol.status, MembershipStatus::Active);
}

#[tokio::test]
async fn settled_member_is_archived_not_deleted() {
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
            "carol",
            "carol",
            "alice",
            MoneyCents::new(2000),
            Utc::now(),
        ))
        .await
        .unwrap();

    // carol is settled; bob still owes, so carol can leave but bob cannot.
    ledger
        .remove_member(&group_id, "carol", "alice")
        .await
        .unwrap();
    let err = ledger
        .remove_member(&group_id, "bob", "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Precondition(_)));

    let members = ledger.list_members(&group_id, "alice").await.unwrap();
    let carol = members.iter().find(|m| m.user_id == "carol").unwrap();
    assert_eq!(carol.status, MembershipStatus::Archived);

    // Historical attribution survives the archive.
    let (expenses, _) = ledger
        .list_expenses(&group_id, "alice", 10, None, &Default::default())
        .await
        .unwrap();
    assert!(
        expenses[0]
            .shares
            .iter()
            .any(|s| s.user_id == "carol"),
        "archived member's share should remain on the expense"
    );
}

#[tokio::test]
async fn archived_member_is_excluded_from_new_transactions() {
    let (ledger, _db) = ledger_with_db().await;
    let group_id = trip_group(&ledger).await;

    ledger
        .remove_member(&group_id, "carol", "alice")
        .await
        .unwrap();

    // Not as participant, not as payer, not as actor.
    let err = ledger
        .create_expense(CreateExpenseCmd::new(
            &group_id,
            "alice",
            "alice",
            MoneyCents::new(1000),
            vec![share("alice", 500), share("carol", 500)],
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let err = ledger
        .create_payment(CreatePaymentCmd::new(
            &group_id,
            "alice",
            "carol",
            "alice",
            MoneyCents::new(500),
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let err = ledger
        .create_expense(CreateExpenseCmd::new(
            &group_id,
            "carol",
            "alice",
            MoneyCents::new(1000),
            vec![share("alice", 1000)],
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}

#[tokio::test]
async fn re_adding_an_archived_member_reactivates() {
    let (ledger, _db) = ledger_with_db().await;
    let group_id = trip_group(&ledger).await;

    ledger
        .remove_member(&group_id, "carol", "alice")
        .await
        .unwrap();
    ledger
        .add_member(&group_id, "carol", "alice")
        .await
        .unwrap();

    let members = ledger.list_members(&group_id, "alice").await.unwrap();
    let carol = members.iter().find(|m| m.user_id == "carol").unwrap();
    assert_eq!(carol.status, MembershipStatus::Active);

    // Eligible again.
    ledger
        .create_expense(CreateExpenseCmd::new(
            &group_id,
            "carol",
            "carol",
            MoneyCents::new(1000),
            vec![share("alice", 1000)],
            Utc::now(),
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn add_member_rejects_duplicates_and_unknown_users() {
    let (ledger, _db) = ledger_with_db().await;
    let group_id = trip_group(&ledger).await;

    let err = ledger
        .add_member(&group_id, "bob", "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));

    let err = ledger
        .add_member(&group_id, "nobody", "alice")
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::NotFound("user".to_string()));

    // Non-members cannot act on the group.
    let err = ledger
        .add_member(&group_id, "dave", "dave")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}

#[tokio::test]
async fn removing_an_unknown_or_archived_membership_fails_cleanly() {
    let (ledger, _db) = ledger_with_db().await;
    let group_id = trip_group(&ledger).await;

    let err = ledger
        .remove_member(&group_id, "dave", "alice")
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::NotFound("membership".to_string()));

    ledger
        .remove_member(&group_id, "carol", "alice")
        .await
        .unwrap();
    let err = ledger
        .remove_member(&group_id, "carol", "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}
