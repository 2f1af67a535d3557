//! Shared LocalStack helpers for storage integration tests
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

/// Test configuration for LocalStack
pub const LOCALSTACK_ENDPOINT: &str = "http://localhost:4566";
pub const TEST_REGION: &str = "us-east-1";
pub const TEST_CHAT_MEMBERS_INDEX: &str = "chat-members-index";

/// Creates a DynamoDB client pointed at LocalStack
pub async fn dynamodb_client() -> Arc<DynamoDbClient> {
    let credentials = Credentials::from_keys(
        "test", // AWS_ACCESS_KEY_ID
        "test", // AWS_SECRET_ACCESS_KEY
        None,   // no session token
    );
    let config = aws_config::defaults(BehaviorVersion::latest())
        .endpoint_url(LOCALSTACK_ENDPOINT)
        .region(Region::new(TEST_REGION))
        .credentials_provider(credentials)
        .load()
        .await;

    Arc::new(DynamoDbClient::new(&config))
}

/// Tracks tables created for one test and deletes them on drop
pub struct TestTables {
    client: Arc<DynamoDbClient>,
    names: Vec<String>,
}

impl TestTables {
    pub fn new(client: Arc<DynamoDbClient>) -> Self {
        Self {
            client,
            names: Vec::new(),
        }
    }

    /// Generates a unique table name and registers it for cleanup
    pub fn register(&mut self, prefix: &str) -> String {
        let name = format!("{prefix}-{}", uuid::Uuid::new_v4());
        self.names.push(name.clone());
        name
    }
}

impl Drop for TestTables {
    fn drop(&mut self) {
        let handle = tokio::runtime::Handle::try_current();
        if let Ok(handle) = handle {
            for table in self.names.drain(..) {
                let client = self.client.clone();
                handle.spawn(async move {
                    let _ = client.delete_table().table_name(&table).send().await;
                });
            }
        }
    }
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

/// Creates a table with a single string partition key
pub async fn create_key_only_table(
    client: &DynamoDbClient,
    table_name: &str,
    partition_key: &str,
) {
    client
        .create_table()
        .table_name(table_name)
        .billing_mode(BillingMode::PayPerRequest)
        .key_schema(key_element(partition_key, KeyType::Hash))
        .attribute_definitions(string_attribute(partition_key))
        .send()
        .await
        .expect("Failed to create test table");

    // Wait for table to be ready
    sleep(Duration::from_millis(100)).await;
}

/// Creates a table with string partition and sort keys
pub async fn create_composite_table(
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

/// Creates the membership table with the inverted chat index
pub async fn create_membership_table(client: &DynamoDbClient, table_name: &str) {
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
