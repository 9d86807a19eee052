//! Domain services over a mocked REST backend.

mod common;

use std::sync::Arc;

use common::{session_with, test_config, RecordingNavigator, RecordingNotifier};
use hostelmate_client::services::{
    AnnouncementFilters, AnnouncementService, AuthService, IssueDraft, IssueFilters, IssueService,
    LostFoundService,
};
use hostelmate_client::{ApiClient, MemoryStore, SessionStore, ToastKind, UploadFile};
use hostelmate_shared::RegisterRequest;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer, session: SessionStore, notifier: Arc<RecordingNotifier>) -> ApiClient {
    ApiClient::new(&test_config(&server.uri(), "http://127.0.0.1:9"), session)
        .unwrap()
        .with_notifier(notifier)
        .with_navigator(Arc::new(RecordingNavigator::default()))
}

#[tokio::test]
async fn login_stores_tokens_and_profile() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "email": "asha@hostel.edu", "password": "secret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "accessToken": "A1",
                "refreshToken": "R1",
                "user": { "_id": "u1", "fullName": "Asha", "email": "asha@hostel.edu", "role": "STUDENT" }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = SessionStore::new(Arc::new(MemoryStore::new()));
    let api = api(&server, session.clone(), Arc::default());
    let auth = AuthService::new(&api).login("asha@hostel.edu", "secret").await.unwrap();

    assert_eq!(auth.access_token.as_deref(), Some("A1"));
    assert_eq!(session.access_token().as_deref(), Some("A1"));
    assert_eq!(session.refresh_token().as_deref(), Some("R1"));
    assert_eq!(session.user().unwrap().full_name.as_deref(), Some("Asha"));
}

#[tokio::test]
async fn registration_without_tokens_leaves_the_session_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(json!({
            "fullName": "Asha Rao",
            "email": "asha@hostel.edu",
            "password": "secret"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "message": "Check your email for the OTP",
            "data": { "user": { "_id": "u1", "email": "asha@hostel.edu" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = SessionStore::new(Arc::new(MemoryStore::new()));
    let api = api(&server, session.clone(), Arc::default());
    let form = RegisterRequest {
        full_name: "Asha Rao".to_string(),
        email: "asha@hostel.edu".to_string(),
        phone: None,
        password: "secret".to_string(),
    };
    let auth = AuthService::new(&api).register(&form).await.unwrap();

    assert!(auth.access_token.is_none());
    assert!(!session.is_authenticated());
    assert_eq!(session.user().unwrap().id.as_deref(), Some("u1"));
}

#[tokio::test]
async fn logout_clears_the_session_even_when_the_server_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let session = session_with("A1", Some("R1"));
    let api = api(&server, session.clone(), notifier.clone());
    AuthService::new(&api).logout().await;

    assert!(!session.is_authenticated());
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn issue_list_sends_only_set_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/issues"))
        .and(query_param("status", "OPEN"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": { "issues": [] } })))
        .expect(1)
        .mount(&server)
        .await;

    let api = api(&server, session_with("A1", Some("R1")), Arc::default());
    let filters = IssueFilters {
        status: Some("OPEN".to_string()),
        limit: Some(10),
        search: Some(String::new()),
        ..Default::default()
    };
    let payload = IssueService::new(&api).list(&filters).await.unwrap();
    assert_eq!(payload.data, json!({ "issues": [] }));

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].url.query().unwrap_or_default().contains("search"));
}

#[tokio::test]
async fn creating_an_issue_surfaces_server_analysis() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/issues"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "message": "Issue created",
            "data": {
                "_id": "i1",
                "aiAnalysis": { "suggestedCategory": "PLUMBING", "suggestedPriority": "HIGH" },
                "duplicateIssues": [{ "_id": "i0" }],
                "autoAssigned": false
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let api = api(&server, session_with("A1", Some("R1")), notifier.clone());
    let draft = IssueDraft {
        title: "Leaking tap".to_string(),
        description: "Bathroom on floor 2".to_string(),
        category: "PLUMBING".to_string(),
        hostel: "h1".to_string(),
        ..Default::default()
    };
    let media = vec![UploadFile::new("file", "tap.jpg", vec![1u8; 16]).with_mime("image/jpeg")];

    let payload = IssueService::new(&api).create(draft, media, None).await.unwrap();
    assert_eq!(payload.data["_id"], "i1");

    let toasts = notifier.toasts();
    let messages: Vec<_> = toasts.iter().map(|t| t.message.as_str()).collect();
    assert_eq!(
        messages,
        vec!["Issue created", "AI Suggestion: PLUMBING - HIGH", "Found 1 similar issue(s)"]
    );
    assert_eq!(toasts[0].kind, ToastKind::Success);
    assert_eq!(toasts[2].kind, ToastKind::Warning);

    let body = String::from_utf8_lossy(&server.received_requests().await.unwrap()[0].body).to_string();
    assert!(body.contains("name=\"media\"; filename=\"tap.jpg\""));
    assert!(body.contains("name=\"title\""));
}

#[tokio::test]
async fn status_update_falls_back_to_a_local_message() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/issues/i1/status"))
        .and(body_json(json!({ "status": "RESOLVED", "remarks": "" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let api = api(&server, session_with("A1", Some("R1")), notifier.clone());
    IssueService::new(&api).update_status("i1", "RESOLVED", "").await.unwrap();

    assert_eq!(notifier.messages(), vec!["Status updated to RESOLVED"]);
}

#[tokio::test]
async fn failed_mutation_only_shows_the_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/issues/i1/upvote"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({ "message": "Already upvoted" })))
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let api = api(&server, session_with("A1", Some("R1")), notifier.clone());
    let err = IssueService::new(&api).upvote("i1").await.unwrap_err();

    assert_eq!(err.status(), Some(409));
    assert_eq!(notifier.messages(), vec!["Already upvoted"]);
}

#[tokio::test]
async fn announcement_filters_include_pinned_false() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/announcements"))
        .and(query_param("pinned", "false"))
        .and(query_param("hostelId", "h1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let api = api(&server, session_with("A1", Some("R1")), Arc::default());
    let filters = AnnouncementFilters {
        hostel_id: Some("h1".to_string()),
        pinned: Some(false),
        ..Default::default()
    };
    AnnouncementService::new(&api).list(&filters).await.unwrap();
}

#[tokio::test]
async fn claim_status_update_targets_the_claim() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/lost-found/item1/claim/c7"))
        .and(body_json(json!({ "status": "APPROVED" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let api = api(&server, session_with("A1", Some("R1")), notifier.clone());
    LostFoundService::new(&api)
        .update_claim_status("item1", "c7", "APPROVED")
        .await
        .unwrap();

    assert_eq!(notifier.messages(), vec!["Claim approved"]);
}
