//! Integration tests for membership storage against LocalStack

mod common;

use chat_storage::membership::MembershipStorage;
use chat_storage::write::{WriteContext, WriteError};

use common::{create_membership_table, dynamodb_client, TestTables, TEST_CHAT_MEMBERS_INDEX};

async fn setup_test() -> (MembershipStorage, WriteContext, TestTables) {
    let client = dynamodb_client().await;
    let mut tables = TestTables::new(client.clone());
    let table = tables.register("test-memberships");
    create_membership_table(&client, &table).await;

    let storage =
        MembershipStorage::new(client.clone(), table, TEST_CHAT_MEMBERS_INDEX.to_string());
    (storage, WriteContext::new(client), tables)
}

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn membership_is_visible_from_both_key_orders() {
    let (storage, write_context, _tables) = setup_test().await;

    storage
        .create_many(&write_context, "chat-1", &ids(&["user-a", "user-b"]))
        .await
        .unwrap();
    storage
        .create_many(&write_context, "chat-2", &ids(&["user-a"]))
        .await
        .unwrap();

    assert!(storage.is_member("user-a", "chat-1").await.unwrap());
    assert!(storage.is_member("user-b", "chat-1").await.unwrap());
    assert!(!storage.is_member("user-b", "chat-2").await.unwrap());

    let chats = storage.chats_for_user("user-a").await.unwrap();
    assert_eq!(chats, ids(&["chat-1", "chat-2"]));

    let members = storage.members_of_chat("chat-1").await.unwrap();
    assert_eq!(members, ids(&["user-a", "user-b"]));
}

#[tokio::test]
async fn removed_members_disappear() {
    let (storage, write_context, _tables) = setup_test().await;

    storage
        .create_many(&write_context, "chat-1", &ids(&["user-a", "user-b"]))
        .await
        .unwrap();
    storage.remove(&write_context, "user-a", "chat-1").await.unwrap();

    assert!(!storage.is_member("user-a", "chat-1").await.unwrap());
    assert!(storage.is_member("user-b", "chat-1").await.unwrap());
}

#[tokio::test]
async fn purge_chat_removes_every_membership() {
    let (storage, write_context, _tables) = setup_test().await;

    let members: Vec<String> = (0..27).map(|i| format!("user-{i:02}")).collect();
    storage
        .create_many(&write_context, "chat-full", &members)
        .await
        .unwrap();

    let removed = storage.purge_chat(&write_context, "chat-full").await.unwrap();
    assert_eq!(removed, 27);
    assert!(storage.members_of_chat("chat-full").await.unwrap().is_empty());

    let removed = storage.purge_chat(&write_context, "chat-full").await.unwrap();
    assert_eq!(removed, 0);
}

#[tokio::test]
async fn direct_member_check_reads_the_store() {
    let (storage, write_context, _tables) = setup_test().await;

    storage
        .create_many(&write_context, "chat-1", &ids(&["user-a"]))
        .await
        .unwrap();

    storage
        .require_member(&write_context, "user-a", "chat-1")
        .await
        .unwrap();

    let err = storage
        .require_member(&write_context, "user-b", "chat-1")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        chat_storage::membership::MembershipStorageError::Write(WriteError::ConditionFailed { .. })
    ));
}
