//! Configuration for the client.

use std::time::Duration;
use uuid::Uuid;

/// Configuration for a client connection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Client id stamped as `from` on local changes.
    pub client_id: String,
    /// How long a call waits for its response. `None` waits until the
    /// connection closes.
    pub call_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Creates a configuration with a fresh random client id.
    pub fn new() -> Self {
        Self {
            client_id: Uuid::new_v4().to_string(),
            call_timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Sets the client id.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Sets the call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Lets calls wait until the connection closes.
    pub fn without_call_timeout(mut self) -> Self {
        self.call_timeout = None;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}
