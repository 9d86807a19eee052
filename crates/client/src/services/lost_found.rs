use hostelmate_shared::{ApiError, Payload};
use serde_json::{json, Value};

use super::{confirm, confirm_fixed, segment, Query};
use crate::api_client::ApiClient;
use crate::notifier::Notifier;
use crate::upload::{ProgressFn, UploadFile, UploadForm};

/// Filters for [`LostFoundService::list`].
#[derive(Debug, Clone, Default)]
pub struct LostFoundFilters {
    /// `LOST` or `FOUND`.
    pub kind: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// A lost or found item report.
#[derive(Debug, Clone, Default)]
pub struct LostFoundDraft {
    pub kind: String,
    pub item_name: String,
    pub category: String,
    pub date_lost_found: String,
    pub location: String,
    pub description: String,
}

impl LostFoundDraft {
    fn into_form(self, image: Option<UploadFile>) -> UploadForm {
        let form = UploadForm::new()
            .text("type", self.kind)
            .text("itemName", self.item_name)
            .text("category", self.category)
            .text("dateLostFound", self.date_lost_found)
            .text("location", self.location)
            .text("description", self.description);
        match image {
            Some(image) => form.file(UploadFile { field: "image".to_string(), ..image }),
            None => form,
        }
    }
}

/// Lost and found board endpoints.
#[derive(Debug, Clone, Copy)]
pub struct LostFoundService<'a> {
    api: &'a ApiClient,
}

impl<'a> LostFoundService<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    fn notifier(&self) -> &dyn Notifier {
        self.api.notifier().as_ref()
    }

    pub async fn list(&self, filters: &LostFoundFilters) -> Result<Payload, ApiError> {
        let options = Query::new()
            .opt("type", filters.kind.as_deref())
            .opt("category", filters.category.as_deref())
            .opt("status", filters.status.as_deref())
            .opt("search", filters.search.as_deref())
            .num("page", filters.page)
            .num("limit", filters.limit)
            .into_options();
        self.api.get_with("/lost-found", &options).await
    }

    pub async fn get(&self, item_id: &str) -> Result<Payload, ApiError> {
        self.api.get(&format!("/lost-found/{}", segment(item_id))).await
    }

    pub async fn create(
        &self,
        draft: LostFoundDraft,
        image: Option<UploadFile>,
        on_progress: Option<ProgressFn>,
    ) -> Result<Payload, ApiError> {
        let form = draft.into_form(image);
        let result = self.api.upload("/lost-found", &form, on_progress).await?;
        confirm(self.notifier(), &result, "Item reported successfully!");
        Ok(result)
    }

    pub async fn update(&self, item_id: &str, changes: &Value) -> Result<Payload, ApiError> {
        let result = self.api.put(&format!("/lost-found/{}", segment(item_id)), changes).await?;
        confirm(self.notifier(), &result, "Item updated successfully");
        Ok(result)
    }

    pub async fn delete(&self, item_id: &str) -> Result<Payload, ApiError> {
        let result = self.api.delete(&format!("/lost-found/{}", segment(item_id))).await?;
        confirm(self.notifier(), &result, "Item deleted successfully");
        Ok(result)
    }

    pub async fn claim(&self, item_id: &str, details: &Value) -> Result<Payload, ApiError> {
        let result = self
            .api
            .post(&format!("/lost-found/{}/claim", segment(item_id)), details)
            .await?;
        confirm_fixed(self.notifier(), "Claim request submitted successfully");
        Ok(result)
    }

    /// Approve or reject a claim (staff only).
    pub async fn update_claim_status(
        &self,
        item_id: &str,
        claim_id: &str,
        status: &str,
    ) -> Result<Payload, ApiError> {
        let result = self
            .api
            .put(
                &format!("/lost-found/{}/claim/{}", segment(item_id), segment(claim_id)),
                &json!({ "status": status }),
            )
            .await?;
        confirm_fixed(self.notifier(), &format!("Claim {}", status.to_lowercase()));
        Ok(result)
    }

    pub async fn add_comment(&self, item_id: &str, text: &str) -> Result<Payload, ApiError> {
        let result = self
            .api
            .post(
                &format!("/lost-found/{}/comments", segment(item_id)),
                &json!({ "text": text }),
            )
            .await?;
        confirm_fixed(self.notifier(), "Comment added successfully");
        Ok(result)
    }

    pub async fn comments(&self, item_id: &str) -> Result<Payload, ApiError> {
        self.api.get(&format!("/lost-found/{}/comments", segment(item_id))).await
    }
}
