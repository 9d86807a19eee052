use std::time::Duration;

use hostelmate_shared::{ApiError, Payload};
use serde_json::{json, Value};

use super::{confirm, confirm_fixed, segment, Query};
use crate::api_client::ApiClient;
use crate::notifier::{Notifier, Toast};
use crate::upload::{ProgressFn, UploadFile, UploadForm};

/// Filters for [`IssueService::list`].
#[derive(Debug, Clone, Default)]
pub struct IssueFilters {
    pub status: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub reporter_id: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub visibility: Option<String>,
}

impl IssueFilters {
    pub(crate) fn query(&self) -> Query {
        Query::new()
            .opt("status", self.status.as_deref())
            .opt("category", self.category.as_deref())
            .opt("priority", self.priority.as_deref())
            .opt("reporterId", self.reporter_id.as_deref())
            .num("page", self.page)
            .num("limit", self.limit)
            .opt("search", self.search.as_deref())
            .opt("visibility", self.visibility.as_deref())
    }
}

/// Filters for [`IssueService::statistics`].
#[derive(Debug, Clone, Default)]
pub struct StatisticsFilters {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub hostel_id: Option<String>,
}

/// A new issue report. Sent as multipart form fields next to the media files.
#[derive(Debug, Clone, Default)]
pub struct IssueDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Option<String>,
    pub is_public: bool,
    pub hostel: String,
    pub room_number: Option<String>,
    pub block: Option<String>,
}

impl IssueDraft {
    fn into_form(self, media: Vec<UploadFile>) -> UploadForm {
        let mut form = UploadForm::new()
            .text("title", self.title)
            .text("description", self.description)
            .text("category", self.category)
            .text("isPublic", self.is_public.to_string())
            .text("hostel", self.hostel);
        for (name, value) in [
            ("priority", self.priority),
            ("roomNumber", self.room_number),
            ("block", self.block),
        ] {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                form = form.text(name, value);
            }
        }
        for file in media {
            form = form.file(UploadFile { field: "media".to_string(), ..file });
        }
        form
    }
}

/// Issue reporting and tracking endpoints.
#[derive(Debug, Clone, Copy)]
pub struct IssueService<'a> {
    api: &'a ApiClient,
}

impl<'a> IssueService<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    fn notifier(&self) -> &dyn Notifier {
        self.api.notifier().as_ref()
    }

    pub async fn list(&self, filters: &IssueFilters) -> Result<Payload, ApiError> {
        self.api.get_with("/issues", &filters.query().into_options()).await
    }

    pub async fn get(&self, issue_id: &str) -> Result<Payload, ApiError> {
        self.api.get(&format!("/issues/{}", segment(issue_id))).await
    }

    /// Report an issue with optional media attachments.
    pub async fn create(
        &self,
        draft: IssueDraft,
        media: Vec<UploadFile>,
        on_progress: Option<ProgressFn>,
    ) -> Result<Payload, ApiError> {
        let form = draft.into_form(media);
        let result = self.api.upload("/issues", &form, on_progress).await?;
        confirm(self.notifier(), &result, "Issue reported successfully!");
        for toast in creation_toasts(&result.data) {
            self.notifier().notify(toast);
        }
        Ok(result)
    }

    pub async fn update(&self, issue_id: &str, changes: &Value) -> Result<Payload, ApiError> {
        let result = self.api.put(&format!("/issues/{}", segment(issue_id)), changes).await?;
        confirm(self.notifier(), &result, "Issue updated successfully");
        Ok(result)
    }

    pub async fn update_status(
        &self,
        issue_id: &str,
        status: &str,
        remarks: &str,
    ) -> Result<Payload, ApiError> {
        let result = self
            .api
            .patch(
                &format!("/issues/{}/status", segment(issue_id)),
                &json!({ "status": status, "remarks": remarks }),
            )
            .await?;
        confirm(self.notifier(), &result, &format!("Status updated to {status}"));
        Ok(result)
    }

    pub async fn delete(&self, issue_id: &str) -> Result<Payload, ApiError> {
        let result = self.api.delete(&format!("/issues/{}", segment(issue_id))).await?;
        confirm(self.notifier(), &result, "Issue deleted successfully");
        Ok(result)
    }

    pub async fn add_comment(&self, issue_id: &str, comment: &str) -> Result<Payload, ApiError> {
        let result = self
            .api
            .post(
                &format!("/issues/{}/comments", segment(issue_id)),
                &json!({ "comment": comment }),
            )
            .await?;
        confirm_fixed(self.notifier(), "Comment added successfully");
        Ok(result)
    }

    pub async fn comments(&self, issue_id: &str) -> Result<Payload, ApiError> {
        self.api.get(&format!("/issues/{}/comments", segment(issue_id))).await
    }

    pub async fn toggle_reaction(&self, issue_id: &str, reaction: &str) -> Result<Payload, ApiError> {
        self.api
            .post(
                &format!("/issues/{}/reactions", segment(issue_id)),
                &json!({ "type": reaction }),
            )
            .await
    }

    pub async fn reactions(&self, issue_id: &str) -> Result<Payload, ApiError> {
        self.api.get(&format!("/issues/{}/reactions", segment(issue_id))).await
    }

    pub async fn link_duplicate(&self, issue_id: &str, master_issue_id: &str) -> Result<Payload, ApiError> {
        let result = self
            .api
            .post(
                &format!("/issues/{}/link-duplicate", segment(issue_id)),
                &json!({ "masterIssueId": master_issue_id }),
            )
            .await?;
        confirm_fixed(self.notifier(), "Issues linked as duplicates");
        Ok(result)
    }

    pub async fn duplicates(&self, issue_id: &str) -> Result<Payload, ApiError> {
        self.api.get(&format!("/issues/{}/duplicates", segment(issue_id))).await
    }

    pub async fn merge(&self, issue_id: &str, target_issue_id: &str) -> Result<Payload, ApiError> {
        let result = self
            .api
            .post(
                &format!("/issues/{}/merge", segment(issue_id)),
                &json!({ "targetIssueId": target_issue_id }),
            )
            .await?;
        confirm_fixed(self.notifier(), "Issues merged successfully");
        Ok(result)
    }

    /// Staff suggested for an issue by the server's recommender.
    pub async fn staff_recommendations(&self, issue_id: &str) -> Result<Payload, ApiError> {
        self.api.get(&format!("/issues/{}/recommendations", segment(issue_id))).await
    }

    pub async fn assign_recommended(&self, issue_id: &str, staff_id: &str) -> Result<Payload, ApiError> {
        let result = self
            .api
            .post(
                &format!("/issues/{}/assign-recommended", segment(issue_id)),
                &json!({ "staffId": staff_id }),
            )
            .await?;
        confirm_fixed(self.notifier(), "Issue assigned successfully");
        Ok(result)
    }

    pub async fn statistics(&self, filters: &StatisticsFilters) -> Result<Payload, ApiError> {
        let options = Query::new()
            .opt("startDate", filters.start_date.as_deref())
            .opt("endDate", filters.end_date.as_deref())
            .opt("hostelId", filters.hostel_id.as_deref())
            .into_options();
        self.api.get_with("/issues/statistics", &options).await
    }

    pub async fn upvote(&self, issue_id: &str) -> Result<Payload, ApiError> {
        let result = self
            .api
            .post(&format!("/issues/{}/upvote", segment(issue_id)), &json!({}))
            .await?;
        confirm_fixed(self.notifier(), "Issue upvoted");
        Ok(result)
    }

    /// Flag an issue as inappropriate.
    pub async fn report(&self, issue_id: &str, reason: &str) -> Result<Payload, ApiError> {
        let result = self
            .api
            .post(
                &format!("/issues/{}/report", segment(issue_id)),
                &json!({ "reason": reason }),
            )
            .await?;
        confirm_fixed(self.notifier(), "Issue reported to administrators");
        Ok(result)
    }
}

/// Extra notices for what the server did with a new report: category and
/// priority suggestions, similar issues and automatic assignment.
fn creation_toasts(data: &Value) -> Vec<Toast> {
    let mut toasts = Vec::new();

    if let Some(analysis) = data.get("aiAnalysis") {
        let field = |key: &str| analysis.get(key).and_then(Value::as_str).unwrap_or("");
        let (category, priority) = (field("suggestedCategory"), field("suggestedPriority"));
        if !category.is_empty() || !priority.is_empty() {
            toasts.push(
                Toast::info(format!("AI Suggestion: {category} - {priority}"))
                    .with_icon("🤖")
                    .with_duration(Duration::from_secs(4)),
            );
        }
    }

    let duplicates = data
        .get("duplicateIssues")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    if duplicates > 0 {
        toasts.push(
            Toast::warning(format!("Found {duplicates} similar issue(s)"))
                .with_icon("⚠️")
                .with_duration(Duration::from_secs(5)),
        );
    }

    if data.get("autoAssigned").and_then(Value::as_bool).unwrap_or(false) {
        let assignee = data
            .pointer("/assignedTo/fullName")
            .and_then(Value::as_str)
            .unwrap_or("staff");
        toasts.push(Toast::success(format!("Automatically assigned to {assignee}")).with_icon("✅"));
    }

    toasts
}
