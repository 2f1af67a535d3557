//! Shared LocalStack helpers wiring the full backend for service tests
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, KeyType, Projection,
    ProjectionType, ScalarAttributeType,
};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use tokio::time::sleep;

use chat_service::service::{ChatService, UserService};
use chat_storage::chat::ChatStorage;
use chat_storage::chat_history::ChatHistoryStorage;
use chat_storage::claimed_email::ClaimedEmailStorage;
use chat_storage::membership::MembershipStorage;
use chat_storage::user::UserStorage;
use chat_storage::write::WriteContext;

/// Test configuration for LocalStack
pub const LOCALSTACK_ENDPOINT: &str = "http://localhost:4566";
pub const TEST_REGION: &str = "us-east-1";
pub const TEST_CHAT_MEMBERS_INDEX: &str = "chat-members-index";

async fn dynamodb_client() -> Arc<DynamoDbClient> {
    let credentials = Credentials::from_keys("test", "test", None);
    let config = aws_config::defaults(BehaviorVersion::latest())
        .endpoint_url(LOCALSTACK_ENDPOINT)
        .region(Region::new(TEST_REGION))
        .credentials_provider(credentials)
        .load()
        .await;

    Arc::new(DynamoDbClient::new(&config))
}

fn string_attribute(name: &str) -> AttributeDefinition {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(ScalarAttributeType::S)
        .build()
        .expect("Failed to build attribute definition")
}

fn key_element(name: &str, key_type: KeyType) -> KeySchemaElement {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .expect("Failed to build key schema")
}

async fn create_key_only_table(client: &DynamoDbClient, table_name: &str, partition_key: &str) {
    client
        .create_table()
        .table_name(table_name)
        .billing_mode(BillingMode::PayPerRequest)
        .key_schema(key_element(partition_key, KeyType::Hash))
        .attribute_definitions(string_attribute(partition_key))
        .send()
        .await
        .expect("Failed to create test table");

    sleep(Duration::from_millis(100)).await;
}

async fn create_composite_table(
    client: &DynamoDbClient,
    table_name: &str,
    partition_key: &str,
    sort_key: &str,
) {
    client
        .create_table()
        .table_name(table_name)
        .billing_mode(BillingMode::PayPerRequest)
        .key_schema(key_element(partition_key, KeyType::Hash))
        .key_schema(key_element(sort_key, KeyType::Range))
        .attribute_definitions(string_attribute(partition_key))
        .attribute_definitions(string_attribute(sort_key))
        .send()
        .await
        .expect("Failed to create test table");

    sleep(Duration::from_millis(100)).await;
}

async fn create_membership_table(client: &DynamoDbClient, table_name: &str) {
    client
        .create_table()
        .table_name(table_name)
        .billing_mode(BillingMode::PayPerRequest)
        .key_schema(key_element("user_id", KeyType::Hash))
        .key_schema(key_element("chat_id", KeyType::Range))
        .attribute_definitions(string_attribute("user_id"))
        .attribute_definitions(string_attribute("chat_id"))
        .global_secondary_indexes(
            GlobalSecondaryIndex::builder()
                .index_name(TEST_CHAT_MEMBERS_INDEX)
                .key_schema(key_element("chat_id", KeyType::Hash))
                .key_schema(key_element("user_id", KeyType::Range))
                .projection(
                    Projection::builder()
                        .projection_type(ProjectionType::KeysOnly)
                        .build(),
                )
                .build()
                .expect("Failed to build GSI"),
        )
        .send()
        .await
        .expect("Failed to create test table");

    sleep(Duration::from_millis(100)).await;
}

/// Fully wired backend over uniquely named tables, dropped with them
pub struct TestBackend {
    pub user_service: UserService,
    pub chat_service: ChatService,
    pub chat_storage: Arc<ChatStorage>,
    pub membership_storage: Arc<MembershipStorage>,
    client: Arc<DynamoDbClient>,
    table_names: Vec<String>,
}

impl TestBackend {
    pub async fn provision() -> Self {
        let client = dynamodb_client().await;
        let run_id = uuid::Uuid::new_v4();

        let users_table = format!("test-users-{run_id}");
        let claimed_emails_table = format!("test-claimed-emails-{run_id}");
        let chats_table = format!("test-chats-{run_id}");
        let memberships_table = format!("test-memberships-{run_id}");
        let chat_history_table = format!("test-chat-history-{run_id}");

        create_key_only_table(&client, &users_table, "user_id").await;
        create_key_only_table(&client, &claimed_emails_table, "email").await;
        create_key_only_table(&client, &chats_table, "chat_id").await;
        create_membership_table(&client, &memberships_table).await;
        create_composite_table(&client, &chat_history_table, "chat_id", "ulid").await;

        let user_storage = Arc::new(UserStorage::new(client.clone(), users_table.clone()));
        let claimed_email_storage = Arc::new(ClaimedEmailStorage::new(
            client.clone(),
            claimed_emails_table.clone(),
        ));
        let chat_storage = Arc::new(ChatStorage::new(client.clone(), chats_table.clone()));
        let membership_storage = Arc::new(MembershipStorage::new(
            client.clone(),
            memberships_table.clone(),
            TEST_CHAT_MEMBERS_INDEX.to_string(),
        ));
        let chat_history_storage = Arc::new(ChatHistoryStorage::new(
            client.clone(),
            chat_history_table.clone(),
        ));

        let user_service = UserService::new(
            user_storage.clone(),
            claimed_email_storage,
            membership_storage.clone(),
            WriteContext::new(client.clone()),
        );
        let chat_service = ChatService::new(
            chat_storage.clone(),
            membership_storage.clone(),
            chat_history_storage,
            user_storage,
            WriteContext::new(client.clone()),
        );

        Self {
            user_service,
            chat_service,
            chat_storage,
            membership_storage,
            client: client.clone(),
            table_names: vec![
                users_table,
                claimed_emails_table,
                chats_table,
                memberships_table,
                chat_history_table,
            ],
        }
    }

    /// Registers a user and returns its generated ID
    pub async fn register_user(&self, username: &str) -> String {
        let email = format!("{username}-{}@example.com", uuid::Uuid::new_v4());
        self.user_service
            .sign_up(username.to_string(), email, "$argon2id$stub".to_string())
            .await
            .expect("sign up succeeds")
            .user_id
    }
}

impl Drop for TestBackend {
    fn drop(&mut self) {
        let handle = tokio::runtime::Handle::try_current();
        if let Ok(handle) = handle {
            for table in self.table_names.drain(..) {
                let client = self.client.clone();
                handle.spawn(async move {
                    let _ = client.delete_table().table_name(&table).send().await;
                });
            }
        }
    }
}
