//! LoomClient against a mock HTTP server: headers, status handling, and
//! verbatim rejection bodies.

use loom_cli::client::{ApiError, LoomClient};
use loom_cli::config::ApiConfig;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(base_url: &str, token: &str, org_id: &str) -> ApiConfig {
    ApiConfig {
        token: token.to_string(),
        base_url: base_url.to_string(),
        org_id: org_id.to_string(),
    }
}

fn archive_fixture() -> (TempDir, std::path::PathBuf) {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("upload.zip");
    std::fs::write(&path, b"PK\x03\x04fake-zip-bytes").expect("write archive");
    (tmp, path)
}

#[tokio::test]
async fn upload_sends_bearer_token_and_multipart_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/apps/upload"))
        .and(header("Authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    let (_tmp, archive) = archive_fixture();
    let client = LoomClient::new(api(&server.uri(), "secret", ""));
    client.upload_app(&archive).await.expect("upload succeeds");

    let requests = server.received_requests().await.expect("recorded");
    let content_type = requests[0]
        .headers
        .get("content-type")
        .expect("content-type")
        .to_str()
        .expect("ascii");
    assert!(content_type.starts_with("multipart/form-data"));
}

#[tokio::test]
async fn rejection_surfaces_the_remote_body_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/apps/upload"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad manifest"))
        .mount(&server)
        .await;

    let (_tmp, archive) = archive_fixture();
    let client = LoomClient::new(api(&server.uri(), "secret", ""));
    let err = client.upload_app(&archive).await.expect_err("must fail");
    assert!(err.to_string().contains("bad manifest"));
    assert!(matches!(err, ApiError::UploadRejected { status: 400, .. }));
}

#[tokio::test]
async fn token_with_existing_prefix_is_not_double_prefixed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows/wf-1"))
        .and(header("Authorization", "Bearer already-prefixed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "wf-1", "actions": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = LoomClient::new(api(&server.uri(), "Bearer already-prefixed", ""));
    let workflow = client.get_workflow("wf-1").await.expect("fetch");
    assert_eq!(workflow.id, "wf-1");
}

#[tokio::test]
async fn org_id_header_is_sent_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows/wf-1"))
        .and(header("Org-Id", "org-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "wf-1", "actions": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = LoomClient::new(api(&server.uri(), "secret", "org-42"));
    client.get_workflow("wf-1").await.expect("fetch");
}

#[tokio::test]
async fn get_workflow_non_200_is_rejected_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows/wf-404"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such workflow"))
        .mount(&server)
        .await;

    let client = LoomClient::new(api(&server.uri(), "secret", ""));
    let err = client.get_workflow("wf-404").await.expect_err("must fail");
    assert!(err.to_string().contains("no such workflow"));
}

#[tokio::test]
async fn put_workflow_checks_the_success_flag_beyond_the_status() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/workflows/wf-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false, "reason": "workflow is locked"
        })))
        .mount(&server)
        .await;

    let client = LoomClient::new(api(&server.uri(), "secret", ""));
    let workflow = loom_common::Workflow {
        id: "wf-1".to_string(),
        ..Default::default()
    };
    let err = client.put_workflow(&workflow).await.expect_err("must fail");
    assert!(err.to_string().contains("workflow is locked"));
}

#[tokio::test]
async fn put_workflow_succeeds_on_success_true() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/workflows/wf-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = LoomClient::new(api(&server.uri(), "secret", ""));
    let workflow = loom_common::Workflow {
        id: "wf-1".to_string(),
        ..Default::default()
    };
    client.put_workflow(&workflow).await.expect("push succeeds");
}
