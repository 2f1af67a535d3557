//! Integration tests for user and claimed-email storage against LocalStack

mod common;

use chat_storage::claimed_email::{ClaimedEmail, ClaimedEmailStorage, ClaimedEmailStorageError};
use chat_storage::user::{User, UserMetadata, UserStorage, UserStorageError};
use chat_storage::write::WriteContext;

use common::{create_key_only_table, dynamodb_client, TestTables};

fn sample_user(user_id: &str, email: &str) -> User {
    User {
        user_id: user_id.to_string(),
        created_at: 1_700_000_000,
        tombstone: false,
        hashed_password: "$argon2id$stub".to_string(),
        metadata: UserMetadata {
            username: "alice".to_string(),
            email: email.to_string(),
        },
    }
}

#[tokio::test]
async fn duplicate_user_ids_are_rejected() {
    let client = dynamodb_client().await;
    let mut tables = TestTables::new(client.clone());
    let table = tables.register("test-users");
    create_key_only_table(&client, &table, "user_id").await;

    let storage = UserStorage::new(client.clone(), table);
    let write_context = WriteContext::new(client);
    let user = sample_user("user-dup", "dup@example.com");

    storage.create(&write_context, &user).await.unwrap();
    let err = storage.create(&write_context, &user).await.unwrap_err();
    assert!(matches!(err, UserStorageError::UserExists));
}

#[tokio::test]
async fn tombstoning_hides_a_user_from_existence_checks() {
    let client = dynamodb_client().await;
    let mut tables = TestTables::new(client.clone());
    let table = tables.register("test-users");
    create_key_only_table(&client, &table, "user_id").await;

    let storage = UserStorage::new(client.clone(), table);
    let write_context = WriteContext::new(client);
    let user = sample_user("user-tomb", "tomb@example.com");

    storage.create(&write_context, &user).await.unwrap();
    assert!(storage.exists(&user.user_id).await.unwrap());

    storage.set_tombstone(&user.user_id).await.unwrap();

    // Gone for participation checks, still resolvable by ID.
    assert!(!storage.exists(&user.user_id).await.unwrap());
    let stored = storage.get_by_id(&user.user_id).await.unwrap().unwrap();
    assert!(stored.tombstone);
    assert_eq!(stored.metadata.email, "tomb@example.com");
}

#[tokio::test]
async fn tombstoning_a_missing_user_fails() {
    let client = dynamodb_client().await;
    let mut tables = TestTables::new(client.clone());
    let table = tables.register("test-users");
    create_key_only_table(&client, &table, "user_id").await;

    let storage = UserStorage::new(client, table);
    let err = storage.set_tombstone("user-ghost").await.unwrap_err();
    assert!(matches!(err, UserStorageError::UserNotFound));
}

#[tokio::test]
async fn an_email_can_only_be_claimed_once() {
    let client = dynamodb_client().await;
    let mut tables = TestTables::new(client.clone());
    let table = tables.register("test-claimed-emails");
    create_key_only_table(&client, &table, "email").await;

    let storage = ClaimedEmailStorage::new(client.clone(), table);
    let write_context = WriteContext::new(client);

    let first = ClaimedEmail {
        email: "taken@example.com".to_string(),
        user_id: "user-a".to_string(),
    };
    storage.claim(&write_context, &first).await.unwrap();
    assert!(storage.is_claimed(&first.email).await.unwrap());

    let second = ClaimedEmail {
        email: "taken@example.com".to_string(),
        user_id: "user-b".to_string(),
    };
    let err = storage.claim(&write_context, &second).await.unwrap_err();
    assert!(matches!(err, ClaimedEmailStorageError::EmailTaken));

    assert!(!storage.is_claimed("free@example.com").await.unwrap());
}
