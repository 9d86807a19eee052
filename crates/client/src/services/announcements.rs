use hostelmate_shared::{ApiError, Payload};
use serde_json::json;

use super::{confirm_fixed, segment, Query};
use crate::api_client::ApiClient;

/// Filters for [`AnnouncementService::list`].
#[derive(Debug, Clone, Default)]
pub struct AnnouncementFilters {
    pub category: Option<String>,
    pub hostel_id: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub pinned: Option<bool>,
}

/// Hostel announcement endpoints.
#[derive(Debug, Clone, Copy)]
pub struct AnnouncementService<'a> {
    api: &'a ApiClient,
}

impl<'a> AnnouncementService<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self, filters: &AnnouncementFilters) -> Result<Payload, ApiError> {
        let options = Query::new()
            .opt("category", filters.category.as_deref())
            .opt("hostelId", filters.hostel_id.as_deref())
            .num("page", filters.page)
            .num("limit", filters.limit)
            .opt("pinned", filters.pinned)
            .into_options();
        self.api.get_with("/announcements", &options).await
    }

    pub async fn get(&self, announcement_id: &str) -> Result<Payload, ApiError> {
        self.api
            .get(&format!("/announcements/{}", segment(announcement_id)))
            .await
    }

    pub async fn add_comment(&self, announcement_id: &str, text: &str) -> Result<Payload, ApiError> {
        let result = self
            .api
            .post(
                &format!("/announcements/{}/comments", segment(announcement_id)),
                &json!({ "text": text }),
            )
            .await?;
        confirm_fixed(self.api.notifier().as_ref(), "Comment added successfully");
        Ok(result)
    }

    pub async fn comments(&self, announcement_id: &str) -> Result<Payload, ApiError> {
        self.api
            .get(&format!("/announcements/{}/comments", segment(announcement_id)))
            .await
    }

    pub async fn toggle_reaction(&self, announcement_id: &str, reaction: &str) -> Result<Payload, ApiError> {
        self.api
            .post(
                &format!("/announcements/{}/reactions", segment(announcement_id)),
                &json!({ "type": reaction }),
            )
            .await
    }

    pub async fn reactions(&self, announcement_id: &str) -> Result<Payload, ApiError> {
        self.api
            .get(&format!("/announcements/{}/reactions", segment(announcement_id)))
            .await
    }

    pub async fn mark_read(&self, announcement_id: &str) -> Result<Payload, ApiError> {
        self.api
            .post(
                &format!("/announcements/{}/read", segment(announcement_id)),
                &json!({}),
            )
            .await
    }
}
