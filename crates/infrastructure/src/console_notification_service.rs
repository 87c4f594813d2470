//! Console notification service for development. Logs deliveries to tracing
//! output instead of sending anything.

use async_trait::async_trait;
use farmgate_application::{AccessEvent, NotificationService, NotificationTarget};
use farmgate_core::AppResult;
use tracing::info;

/// Development notification service that logs deliveries to the console.
#[derive(Clone)]
pub struct ConsoleNotificationService;

impl ConsoleNotificationService {
    /// Creates a new console notification service.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleNotificationService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationService for ConsoleNotificationService {
    async fn notify(
        &self,
        event: AccessEvent,
        recipient: NotificationTarget,
        payload: serde_json::Value,
    ) -> AppResult<()> {
        let recipient = match recipient {
            NotificationTarget::User(user_id) => user_id.to_string(),
            NotificationTarget::Email(address) => address.to_string(),
        };

        info!(
            event = event.as_str(),
            recipient = %recipient,
            payload = %payload,
            "--- NOTIFICATION (console) ---"
        );

        Ok(())
    }
}
