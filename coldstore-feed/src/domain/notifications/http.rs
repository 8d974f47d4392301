//! HTTP implementation of [`NotificationFetcher`].

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use super::traits::{NotificationError, NotificationFetcher, Result};
use super::types::{Notification, NotificationCategory, NotificationUpdate, PageRequest};

#[derive(Deserialize)]
struct PageResponse {
    #[serde(default)]
    data: Vec<Notification>,
}

/// Talks to the facility backend.
///
/// `GET {api}/notifications/{category}?limit=&offset=` returns `{ "data": [...] }`;
/// `PATCH {api}/notifications/{id}` accepts `{ "read": bool }`.
#[derive(Debug, Clone)]
pub struct HttpNotificationClient {
    client: Client,
    base_url: Url,
}

impl HttpNotificationClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
            .map_err(|e| NotificationError::Fetch(format!("Invalid API URL {}: {}", base_url, e)))?;
        let client = Client::builder().build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| NotificationError::Fetch(format!("Failed to build URL for {}: {}", path, e)))
    }

    fn category_url(&self, category: NotificationCategory, request: PageRequest) -> Result<Url> {
        let mut url = self.endpoint(&format!("notifications/{}", category))?;
        url.query_pairs_mut()
            .append_pair("limit", &request.limit.to_string())
            .append_pair("offset", &request.offset.to_string());
        Ok(url)
    }

    fn notification_url(&self, id: &str) -> Result<Url> {
        let mut url = self.endpoint("notifications/")?;
        url.path_segments_mut()
            .map_err(|_| NotificationError::Update("API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }
}

#[async_trait]
impl NotificationFetcher for HttpNotificationClient {
    async fn fetch_category(
        &self,
        category: NotificationCategory,
        request: PageRequest,
    ) -> Result<Vec<Notification>> {
        let url = self.category_url(category, request)?;
        let response = self.client.get(url).send().await?.error_for_status()?;
        let page: PageResponse = response.json().await?;
        Ok(page.data)
    }

    async fn update_notification(&self, id: &str, update: NotificationUpdate) -> Result<()> {
        let url = self.notification_url(id)?;
        self.client
            .patch(url)
            .json(&update)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| NotificationError::Update(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_url_carries_pagination() {
        let client = HttpNotificationClient::new("http://localhost:8080/api/").unwrap();
        let url = client
            .category_url(NotificationCategory::Today, PageRequest::new(20, 40))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/notifications/today?limit=20&offset=40"
        );
    }

    #[test]
    fn notification_url_escapes_id() {
        let client = HttpNotificationClient::new("http://localhost:8080/api").unwrap();
        let url = client.notification_url("a b/c").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/notifications/a%20b%2Fc"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(HttpNotificationClient::new("not a url").is_err());
    }

    #[test]
    fn page_response_tolerates_missing_data() {
        let page: PageResponse = serde_json::from_str("{}").unwrap();
        assert!(page.data.is_empty());
    }
}
