//! End-to-end tests against a mock REDCap endpoint.

use std::io::Write;

use redcap_client::{BlockingRedcapClient, ClientError, ClientOptions, RedcapClient, Response};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_url(server: &MockServer) -> String {
    format!("{}/api/", server.uri())
}

async fn received_body(server: &MockServer) -> String {
    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    String::from_utf8_lossy(&requests[0].body).into_owned()
}

#[tokio::test]
async fn export_records_posts_form_and_decodes_json() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/"))
        .and(body_string_contains("token=secret"))
        .and(body_string_contains("content=record"))
        .and(body_string_contains("rawOrLabel=label"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"record_id": "1", "age": "30"}
        ])))
        .mount(&server)
        .await;

    let client = RedcapClient::new(api_url(&server), "secret").expect("valid url");
    let response = client
        .export_records(&[("rawOrLabel", "label")])
        .await
        .expect("request succeeds");

    assert_eq!(
        response,
        Response::Json(json!([{"record_id": "1", "age": "30"}]))
    );
}

#[tokio::test]
async fn rejected_override_is_not_sent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = RedcapClient::new(api_url(&server), "secret").expect("valid url");
    client
        .export_events(&[("arms", "1"), ("records", "5")])
        .await
        .expect("request succeeds");

    let body = received_body(&server).await;
    assert!(body.contains("arms=1"));
    assert!(!body.contains("records="));
}

#[tokio::test]
async fn survey_link_is_returned_as_url() {
    let server = MockServer::start().await;
    let link = "https://redcap.example.org/surveys/?s=K4XW9JPCTE";

    Mock::given(method("POST"))
        .and(body_string_contains("content=surveyLink"))
        .and(body_string_contains("instrument=consent"))
        .respond_with(ResponseTemplate::new(200).set_body_string(link))
        .mount(&server)
        .await;

    let client = RedcapClient::new(api_url(&server), "secret").expect("valid url");
    let response = client
        .export_survey_link("consent", "baseline_arm_1", "7", &[])
        .await
        .expect("request succeeds");

    assert_eq!(response, Response::Url(link.to_owned()));
}

#[tokio::test]
async fn import_records_sends_array_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("data=%5B%7B%22a%22%3A1%7D%5D"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 1})))
        .mount(&server)
        .await;

    let client = RedcapClient::new(api_url(&server), "secret").expect("valid url");
    let response = client
        .import_records_json(&json!({"a": 1}), &[])
        .await
        .expect("request succeeds");

    assert_eq!(response.as_json(), Some(&json!({"count": 1})));
}

#[tokio::test]
async fn delete_record_error_envelope_is_extracted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("action=delete"))
        .and(body_string_contains("records%5B0%5D=99"))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n\
             <hash><error>The following records do not exist: 99</error></hash>",
        ))
        .mount(&server)
        .await;

    let client = RedcapClient::new(api_url(&server), "secret").expect("valid url");
    let response = client.delete_record("99", &[]).await.expect("permissive");

    assert_eq!(
        response,
        Response::XmlError("The following records do not exist: 99".to_owned())
    );
}

#[tokio::test]
async fn strict_mode_reports_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"error": "You do not have permissions"})),
        )
        .mount(&server)
        .await;

    let options = ClientOptions {
        strict_errors: true,
        ..ClientOptions::default()
    };
    let client = RedcapClient::with_options(api_url(&server), "secret", options).expect("valid url");
    let error = client.export_metadata(&[]).await.expect_err("strict mode");

    match error {
        ClientError::HttpStatus { status, body } => {
            assert_eq!(status.as_u16(), 403);
            assert!(body.contains("permissions"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn import_file_uploads_multipart_and_accepts_empty_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("<p>scan report</p>"))
        .and(body_string_contains("name=\"repeat_instance\""))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, "<p>scan report</p>").expect("write temp file");

    let client = RedcapClient::new(api_url(&server), "secret").expect("valid url");
    let response = client
        .import_file("1", "report", "visit_arm_1", file.path(), Some(2), &[])
        .await
        .expect("request succeeds");

    assert_eq!(response, Response::Success);
}

#[tokio::test]
async fn import_file_reports_missing_attachment() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("missing.pdf");

    let client = RedcapClient::new("http://127.0.0.1:9/api/", "secret").expect("valid url");
    let error = client
        .import_file("1", "report", "visit_arm_1", &missing, None, &[])
        .await
        .expect_err("attachment does not exist");

    assert!(matches!(error, ClientError::Attachment { path, .. } if path == missing));
}

#[tokio::test]
async fn delete_file_without_file_is_a_no_op() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("content=file"))
        .and(body_string_contains("action=delete"))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            "<hash><error>There is no file to delete for this record</error></hash>",
        ))
        .mount(&server)
        .await;

    let client = RedcapClient::new(api_url(&server), "secret").expect("valid url");
    let response = client
        .delete_file("1", "report", "visit_arm_1", None, &[])
        .await
        .expect("request succeeds");

    assert_eq!(response, Response::Success);
}

#[tokio::test]
async fn connection_failure_is_a_request_error() {
    let client = RedcapClient::new("http://127.0.0.1:9/api/", "secret").expect("valid url");
    let error = client.export_events(&[]).await.expect_err("nothing listens");
    assert!(matches!(error, ClientError::Request(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn blocking_client_delete_form_field() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("content=file"))
        .and(body_string_contains("field=scan"))
        .and(body_string_contains("repeat_instance=3"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let url = api_url(&server);
    let response = tokio::task::spawn_blocking(move || {
        let client = BlockingRedcapClient::new(url, "secret").expect("valid url");
        client.delete_form_field("4", "scan", "visit_arm_1", 3, &[])
    })
    .await
    .expect("blocking task completes")
    .expect("request succeeds");

    assert_eq!(response, Response::Success);
}

#[tokio::test(flavor = "multi_thread")]
async fn blocking_client_export_survey_participants() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("content=participantList"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"email": "p@example.org", "record": "1"}
        ])))
        .mount(&server)
        .await;

    let url = api_url(&server);
    let response = tokio::task::spawn_blocking(move || {
        let client = BlockingRedcapClient::new(url, "secret").expect("valid url");
        client.export_survey_participants("consent", "baseline_arm_1", &[("format", "json")])
    })
    .await
    .expect("blocking task completes")
    .expect("request succeeds");

    assert_eq!(
        response.into_value(),
        json!([{"email": "p@example.org", "record": "1"}])
    );
}
