use std::sync::Arc;

use chrono::NaiveDate;
use sea_orm::Database;

use engine::{Engine, EngineError, GroupMember};
use migration::MigratorTrait;

async fn engine_with_group() -> (Engine, String) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    for (id, name, phone) in [
        ("alice", "Alice", "+39 333 0000001"),
        ("bob", "Bob", "+39 333 0000002"),
        ("carol", "Carol", "+39 333 0000003"),
    ] {
        engine
            .create_user(id, name, phone, &format!("{id}@example.com"))
            .await
            .unwrap();
    }
    let (group_id, _) = engine
        .create_group(
            "Household",
            "alice",
            &[GroupMember {
                uid: "bob".to_string(),
                name: "Bob".to_string(),
                phone: "+39 333 0000002".to_string(),
            }],
        )
        .await
        .unwrap();
    (engine, group_id)
}

async fn funded_budget(engine: &Engine, group_id: &str, ceiling_minor: i64) -> String {
    let budget_id = engine
        .create_group_budget(group_id, "Groceries", "alice")
        .await
        .unwrap();
    engine
        .set_initial_budget(group_id, &budget_id, ceiling_minor, "alice")
        .await
        .unwrap();
    budget_id
}

fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

#[tokio::test]
async fn non_members_cannot_create_budgets() {
    let (engine, group_id) = engine_with_group().await;
    let err = engine
        .create_group_budget(&group_id, "Groceries", "carol")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));
}

#[tokio::test]
async fn initial_budget_is_owner_only_and_one_shot() {
    let (engine, group_id) = engine_with_group().await;
    let budget_id = engine
        .create_group_budget(&group_id, "Groceries", "bob")
        .await
        .unwrap();

    let err = engine
        .set_initial_budget(&group_id, &budget_id, 100_00, "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));

    engine
        .set_initial_budget(&group_id, &budget_id, 100_00, "alice")
        .await
        .unwrap();
    let err = engine
        .set_initial_budget(&group_id, &budget_id, 200_00, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let budget = engine.group_budget(&group_id, &budget_id).await.unwrap();
    assert_eq!(budget.ceiling_minor, Some(100_00));
    assert_eq!(budget.remaining_minor, Some(100_00));
}

#[tokio::test]
async fn entries_require_a_configured_ceiling() {
    let (engine, group_id) = engine_with_group().await;
    let budget_id = engine
        .create_group_budget(&group_id, "Groceries", "alice")
        .await
        .unwrap();

    let err = engine
        .add_group_field(&group_id, &budget_id, "food", "milk", 5_00, d(2026, 8, 1), "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[tokio::test]
async fn add_then_delete_restores_remaining() {
    let (engine, group_id) = engine_with_group().await;
    let budget_id = funded_budget(&engine, &group_id, 100_00).await;

    engine
        .add_group_field(&group_id, &budget_id, "food", "milk", 5_00, d(2026, 8, 1), "bob")
        .await
        .unwrap();
    let budget = engine.group_budget(&group_id, &budget_id).await.unwrap();
    assert_eq!(budget.remaining_minor, Some(95_00));

    engine
        .delete_group_field(&group_id, &budget_id, "food", "milk", "bob")
        .await
        .unwrap();
    let budget = engine.group_budget(&group_id, &budget_id).await.unwrap();
    assert_eq!(budget.remaining_minor, Some(100_00));
}

#[tokio::test]
async fn overspend_fails_and_leaves_remaining_unchanged() {
    let (engine, group_id) = engine_with_group().await;
    let budget_id = funded_budget(&engine, &group_id, 100_00).await;
    engine
        .add_group_field(&group_id, &budget_id, "food", "meat", 70_00, d(2026, 8, 1), "alice")
        .await
        .unwrap();

    let err = engine
        .add_group_field(&group_id, &budget_id, "food", "wine", 40_00, d(2026, 8, 2), "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBudget(_)));

    let budget = engine.group_budget(&group_id, &budget_id).await.unwrap();
    assert_eq!(budget.remaining_minor, Some(30_00));
    assert!(!budget.budget.contains_key("food") || !budget.budget["food"].contains_key("wine"));
}

#[tokio::test]
async fn overwriting_an_entry_frees_its_old_amount() {
    let (engine, group_id) = engine_with_group().await;
    let budget_id = funded_budget(&engine, &group_id, 100_00).await;
    engine
        .add_group_field(&group_id, &budget_id, "food", "meat", 60_00, d(2026, 8, 1), "alice")
        .await
        .unwrap();

    engine
        .add_group_field(&group_id, &budget_id, "food", "meat", 80_00, d(2026, 8, 2), "alice")
        .await
        .unwrap();
    let budget = engine.group_budget(&group_id, &budget_id).await.unwrap();
    assert_eq!(budget.remaining_minor, Some(20_00));
    assert_eq!(budget.budget["food"]["meat"].amount_minor, 80_00);
}

#[tokio::test]
async fn deleting_a_missing_entry_is_key_not_found() {
    let (engine, group_id) = engine_with_group().await;
    let budget_id = funded_budget(&engine, &group_id, 100_00).await;

    let err = engine
        .delete_group_field(&group_id, &budget_id, "food", "milk", "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn remaining_correction_rewrites_the_ceiling() {
    let (engine, group_id) = engine_with_group().await;
    let budget_id = funded_budget(&engine, &group_id, 100_00).await;
    engine
        .add_group_field(&group_id, &budget_id, "food", "milk", 5_00, d(2026, 8, 1), "alice")
        .await
        .unwrap();

    engine
        .set_remaining_budget(&group_id, &budget_id, 50_00, "bob")
        .await
        .unwrap();
    let budget = engine.group_budget(&group_id, &budget_id).await.unwrap();
    assert_eq!(budget.remaining_minor, Some(50_00));
    // remaining == ceiling − Σ entries still holds.
    assert_eq!(budget.ceiling_minor, Some(55_00));

    let err = engine
        .set_remaining_budget(&group_id, &budget_id, -1, "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[tokio::test]
async fn only_the_group_owner_deletes_budgets() {
    let (engine, group_id) = engine_with_group().await;
    let budget_id = funded_budget(&engine, &group_id, 100_00).await;

    let err = engine
        .delete_group_budget(&group_id, &budget_id, "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));

    engine
        .delete_group_budget(&group_id, &budget_id, "alice")
        .await
        .unwrap();
    let err = engine.group_budget(&group_id, &budget_id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn concurrent_spends_never_exceed_the_ceiling() {
    let (engine, group_id) = engine_with_group().await;
    let budget_id = funded_budget(&engine, &group_id, 100_00).await;
    let engine = Arc::new(engine);

    let first = {
        let engine = Arc::clone(&engine);
        let (group_id, budget_id) = (group_id.clone(), budget_id.clone());
        tokio::spawn(async move {
            engine
                .add_group_field(&group_id, &budget_id, "food", "meat", 60_00, d(2026, 8, 1), "alice")
                .await
        })
    };
    let second = {
        let engine = Arc::clone(&engine);
        let (group_id, budget_id) = (group_id.clone(), budget_id.clone());
        tokio::spawn(async move {
            engine
                .add_group_field(&group_id, &budget_id, "food", "wine", 60_00, d(2026, 8, 1), "bob")
                .await
        })
    };
    let (first, second) = (first.await.unwrap(), second.await.unwrap());

    // Both amounts fit individually but not together.
    assert!(!(first.is_ok() && second.is_ok()));

    let budget = engine.group_budget(&group_id, &budget_id).await.unwrap();
    let spent: i64 = budget
        .budget
        .values()
        .flat_map(|names| names.values())
        .map(|slot| slot.amount_minor)
        .sum();
    assert_eq!(budget.remaining_minor, Some(100_00 - spent));
    assert!(spent <= 100_00);
}
