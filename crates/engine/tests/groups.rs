use sea_orm::Database;

use engine::{Engine, EngineError, GroupMember};
use migration::MigratorTrait;

async fn engine() -> Engine {
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
    engine
}

fn member(uid: &str, name: &str, phone: &str) -> GroupMember {
    GroupMember {
        uid: uid.to_string(),
        name: name.to_string(),
        phone: phone.to_string(),
    }
}

#[tokio::test]
async fn create_group_includes_owner_and_fans_out_back_references() {
    let engine = engine().await;

    let (group_id, report) = engine
        .create_group(
            "Household",
            "alice",
            &[member("bob", "Bob", "+39 333 0000002")],
        )
        .await
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(report.succeeded.len(), 2);

    let group = engine.group(&group_id).await.unwrap();
    assert_eq!(group.owner_id, "alice");
    let uids: Vec<&str> = group.members.iter().map(|m| m.uid.as_str()).collect();
    assert_eq!(uids, ["alice", "bob"]);

    for uid in ["alice", "bob"] {
        let ledger = engine.ledger(uid).await.unwrap();
        assert_eq!(ledger.group_ids, [group_id.clone()]);
    }
}

#[tokio::test]
async fn create_group_rejects_blank_name() {
    let engine = engine().await;
    let err = engine.create_group("   ", "alice", &[]).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[tokio::test]
async fn unregistered_members_are_accepted_without_back_reference() {
    let engine = engine().await;

    // Invited from the phone book, never signed up.
    let (group_id, report) = engine
        .create_group(
            "Trip",
            "alice",
            &[member("contact-42", "Dana", "+39 333 0000042")],
        )
        .await
        .unwrap();
    assert!(report.is_complete());

    let group = engine.group(&group_id).await.unwrap();
    assert!(group.members.iter().any(|m| m.uid == "contact-42"));
}

#[tokio::test]
async fn only_the_owner_adds_members() {
    let engine = engine().await;
    let (group_id, _) = engine.create_group("Household", "alice", &[]).await.unwrap();

    let err = engine
        .add_member(&group_id, &member("carol", "Carol", "+39 333 0000003"), "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));

    let report = engine
        .add_member(&group_id, &member("carol", "Carol", "+39 333 0000003"), "alice")
        .await
        .unwrap();
    assert!(report.is_complete());
    let ledger = engine.ledger("carol").await.unwrap();
    assert_eq!(ledger.group_ids, [group_id]);
}

#[tokio::test]
async fn members_leave_on_their_own_and_owners_remove_others() {
    let engine = engine().await;
    let (group_id, _) = engine
        .create_group(
            "Household",
            "alice",
            &[
                member("bob", "Bob", "+39 333 0000002"),
                member("carol", "Carol", "+39 333 0000003"),
            ],
        )
        .await
        .unwrap();

    // Bob cannot remove Carol.
    let err = engine.remove_member(&group_id, "carol", "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));

    // Bob leaves, Alice removes Carol.
    engine.remove_member(&group_id, "bob", "bob").await.unwrap();
    engine.remove_member(&group_id, "carol", "alice").await.unwrap();

    let group = engine.group(&group_id).await.unwrap();
    let uids: Vec<&str> = group.members.iter().map(|m| m.uid.as_str()).collect();
    assert_eq!(uids, ["alice"]);
    assert!(engine.ledger("bob").await.unwrap().group_ids.is_empty());
}

#[tokio::test]
async fn the_owner_is_not_removable() {
    let engine = engine().await;
    let (group_id, _) = engine.create_group("Household", "alice", &[]).await.unwrap();

    let err = engine.remove_member(&group_id, "alice", "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[tokio::test]
async fn only_the_owner_deletes_the_group() {
    let engine = engine().await;
    let (group_id, _) = engine
        .create_group("Household", "alice", &[member("bob", "Bob", "+39 333 0000002")])
        .await
        .unwrap();

    let err = engine.delete_group(&group_id, "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));

    engine.delete_group(&group_id, "alice").await.unwrap();
    let err = engine.group(&group_id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn dangling_group_ids_are_filtered_at_read() {
    let engine = engine().await;
    let (group_id, _) = engine
        .create_group("Household", "alice", &[member("bob", "Bob", "+39 333 0000002")])
        .await
        .unwrap();
    let (kept_id, _) = engine.create_group("Trip", "alice", &[]).await.unwrap();

    // Deletion leaves the members' back-references behind on purpose.
    engine.delete_group(&group_id, "alice").await.unwrap();

    assert_eq!(engine.ledger("alice").await.unwrap().group_ids, [kept_id.clone()]);
    assert!(engine.ledger("bob").await.unwrap().group_ids.is_empty());

    let groups = engine.user_groups("alice").await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].id, kept_id);
}

#[tokio::test]
async fn delete_account_cascades_to_member_rows() {
    let engine = engine().await;
    let (group_id, _) = engine
        .create_group("Household", "alice", &[member("bob", "Bob", "+39 333 0000002")])
        .await
        .unwrap();

    let report = engine.delete_account("bob").await.unwrap();
    assert!(report.is_complete());

    let group = engine.group(&group_id).await.unwrap();
    assert!(!group.members.iter().any(|m| m.uid == "bob"));
}
