use super::ApiClient;
use crate::domain::DrivenPortError;
use crate::domain::notification::Notification;
use crate::domain::notification::driven_ports::NotificationHistoryReader;
use crate::dto::notification::NotificationDto;
use crate::external_connections::{ApiRequest, HttpTransport};

impl<T: HttpTransport> NotificationHistoryReader for ApiClient<T> {
    /// The notification service is separate from the main API. It answers with a bare list and
    /// knows nothing about the session cookie.
    #[tracing::instrument(skip(self))]
    async fn notification_history(
        &self,
        user_id: i64,
    ) -> Result<Vec<Notification>, DrivenPortError> {
        let request =
            ApiRequest::get(self.notification_endpoint(&format!("/{user_id}"))?).without_refresh();
        let notifications: Vec<NotificationDto> = self.call_bare(request).await?;

        Ok(notifications.into_iter().map(Notification::from).collect())
    }
}
