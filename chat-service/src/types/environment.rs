//! Environment configuration for different deployment stages

use std::env;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};
use tracing::Level;

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack`)
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Resolves a table or index name from the environment
    ///
    /// Production and staging require the variable to be set; development
    /// falls back to the given default.
    ///
    /// # Panics
    ///
    /// Panics if the variable is not set outside development
    fn resource_name(&self, var: &str, dev_default: &str) -> String {
        match self {
            Self::Production | Self::Staging => {
                env::var(var).unwrap_or_else(|_| panic!("{var} environment variable is not set"))
            }
            Self::Development => env::var(var).unwrap_or_else(|_| dev_default.to_string()),
        }
    }

    /// Name of the users table
    #[must_use]
    pub fn users_table(&self) -> String {
        self.resource_name("USERS_TABLE_NAME", "chat-users")
    }

    /// Name of the claimed emails table
    #[must_use]
    pub fn claimed_emails_table(&self) -> String {
        self.resource_name("CLAIMED_EMAILS_TABLE_NAME", "chat-claimed-emails")
    }

    /// Name of the chats table
    #[must_use]
    pub fn chats_table(&self) -> String {
        self.resource_name("CHATS_TABLE_NAME", "chat-data")
    }

    /// Name of the memberships table
    #[must_use]
    pub fn memberships_table(&self) -> String {
        self.resource_name("MEMBERSHIPS_TABLE_NAME", "chat-memberships")
    }

    /// Name of the chat history table
    #[must_use]
    pub fn chat_history_table(&self) -> String {
        self.resource_name("CHAT_HISTORY_TABLE_NAME", "chat-history")
    }

    /// Name of the GSI inverting the membership key order
    #[must_use]
    pub fn chat_members_index(&self) -> String {
        self.resource_name("CHAT_MEMBERS_INDEX_NAME", "chat-members-index")
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            // Regular AWS endpoints for production and staging
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
            Self::Development => Some("http://localhost:4566"),
        }
    }

    /// AWS configuration with retry and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// Log level for the environment, overridable via `TRACING_LEVEL`
    #[must_use]
    pub fn tracing_level(&self) -> Level {
        env::var("TRACING_LEVEL")
            .ok()
            .and_then(|val| val.parse::<Level>().ok())
            .unwrap_or(match self {
                Self::Production | Self::Staging => Level::INFO,
                Self::Development => Level::DEBUG,
            })
    }
}
