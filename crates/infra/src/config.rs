//! Facade configuration.

use useradmin_core::{UserAdminError, UserAdminResult};
use useradmin_credentials::CredentialConfig;
use useradmin_events::dispatcher::DEFAULT_QUEUE_CAPACITY;

pub const ENV_LISTENER_QUEUE_CAPACITY: &str = "USERADMIN_LISTENER_QUEUE_CAPACITY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAdminConfig {
    pub credentials: CredentialConfig,
    /// Per-listener notification queue; events beyond it are dropped with a warning.
    pub listener_queue_capacity: usize,
}

impl Default for UserAdminConfig {
    fn default() -> Self {
        Self {
            credentials: CredentialConfig::default(),
            listener_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl UserAdminConfig {
    pub fn with_credentials(mut self, credentials: CredentialConfig) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_listener_queue_capacity(mut self, capacity: usize) -> Self {
        self.listener_queue_capacity = capacity;
        self
    }

    pub fn validate(&self) -> UserAdminResult<()> {
        self.credentials.validate()?;
        if self.listener_queue_capacity == 0 {
            return Err(UserAdminError::configuration(
                "listener queue capacity must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn from_env() -> UserAdminResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> UserAdminResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = CredentialConfig::from_lookup(&lookup)?;
        let listener_queue_capacity = match lookup(ENV_LISTENER_QUEUE_CAPACITY) {
            Some(raw) => raw.trim().parse().map_err(|e| {
                UserAdminError::configuration(format!("{ENV_LISTENER_QUEUE_CAPACITY}='{raw}': {e}"))
            })?,
            None => DEFAULT_QUEUE_CAPACITY,
        };

        let config = Self {
            credentials,
            listener_queue_capacity,
        };
        config.validate()?;
        Ok(config)
    }
}
