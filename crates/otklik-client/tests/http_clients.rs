//! HTTP client behaviour against a wiremock server.

use otklik_core::models::{ApplyRejection, ApplyResponse, Credential};
use otklik_core::traits::{CredentialSource, PageFetcher, StatusProbe, Submitter};
use otklik_client::{EnvCredentials, HhStatusProbe, HhSubmitter, ReqwestPageFetcher};
use otklik_core::error::EngineError;
use otklik_core::testutil::make_test_vacancy;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credential() -> Credential {
    Credential {
        resume_hash: "deadbeef".into(),
        session_token: "xsrf-token".into(),
    }
}

#[tokio::test]
async fn fetcher_requests_the_right_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/vacancy"))
        .and(query_param("text", "Rust"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>listing</html>", "text/html"),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestPageFetcher::new().unwrap();
    let base = format!("{}/search/vacancy?text=Rust", server.uri());

    let html = fetcher.fetch_page(&base, 2).await.unwrap();
    assert_eq!(html, "<html>listing</html>");
}

#[tokio::test]
async fn fetcher_maps_http_status_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fetcher = ReqwestPageFetcher::new().unwrap();
    let base = format!("{}/search/vacancy", server.uri());

    let err = fetcher.fetch_page(&base, 0).await.unwrap_err();
    assert!(matches!(err, EngineError::Http(_)));
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn probe_reports_live_vacancy_as_eligible() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vacancies/101"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "101",
            "archived": false,
            "test": null,
        })))
        .mount(&server)
        .await;

    let probe = HhStatusProbe::with_base_url(server.uri()).unwrap();
    let status = probe.check("101").await.unwrap();
    assert!(status.eligible);
}

#[tokio::test]
async fn probe_flags_archived_and_test_gated_vacancies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vacancies/201"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"archived": true})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vacancies/202"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "archived": false,
            "test": {"required": true},
        })))
        .mount(&server)
        .await;

    let probe = HhStatusProbe::with_base_url(server.uri()).unwrap();

    let archived = probe.check("201").await.unwrap();
    assert!(!archived.eligible);
    assert_eq!(archived.reason.as_deref(), Some("vacancy archived"));

    let gated = probe.check("202").await.unwrap();
    assert!(!gated.eligible);
    assert_eq!(gated.reason.as_deref(), Some("test required"));
}

#[tokio::test]
async fn probe_treats_missing_vacancy_as_ineligible() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let probe = HhStatusProbe::with_base_url(server.uri()).unwrap();
    let status = probe.check("999").await.unwrap();
    assert!(!status.eligible);
    assert_eq!(status.reason.as_deref(), Some("vacancy unavailable"));
}

#[tokio::test]
async fn submitter_posts_the_response_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/applicant/vacancy_response/popup"))
        .and(header("x-xsrftoken", "xsrf-token"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .and(body_string_contains("vacancy_id=42"))
        .and(body_string_contains("resume_hash=deadbeef"))
        .and(body_string_contains("letter=Hello"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let submitter = HhSubmitter::with_base_url(server.uri()).unwrap();
    let response = submitter
        .apply(&make_test_vacancy("42"), &credential(), "Hello")
        .await
        .unwrap();
    assert_eq!(response, ApplyResponse::Accepted);
}

#[tokio::test]
async fn submitter_classifies_quota_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_string(r#"{"error":"negotiations-limit-exceeded"}"#),
        )
        .mount(&server)
        .await;

    let submitter = HhSubmitter::with_base_url(server.uri()).unwrap();
    let response = submitter
        .apply(&make_test_vacancy("42"), &credential(), "")
        .await
        .unwrap();
    assert_eq!(
        response,
        ApplyResponse::Rejected(ApplyRejection::QuotaExceeded)
    );
}

#[tokio::test]
async fn submitter_surfaces_server_errors_for_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let submitter = HhSubmitter::with_base_url(server.uri()).unwrap();
    let err = submitter
        .apply(&make_test_vacancy("42"), &credential(), "")
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn credentials_discover_resume_hash_when_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/applicant/resumes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [{"hash": "f00dfeed"}, {"hash": "other"}],
        })))
        .mount(&server)
        .await;

    let source = EnvCredentials::with_resumes_url(
        None,
        Some("xsrf-token".into()),
        format!("{}/applicant/resumes", server.uri()),
    )
    .unwrap();

    let credential = source.credential().await.unwrap().unwrap();
    assert_eq!(credential.resume_hash, "f00dfeed");
    assert_eq!(credential.session_token, "xsrf-token");
}

#[tokio::test]
async fn credentials_without_token_yield_none() {
    let source = EnvCredentials::new(Some("deadbeef".into()), None).unwrap();
    assert!(source.credential().await.unwrap().is_none());
}

#[tokio::test]
async fn credentials_with_failed_discovery_yield_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let source = EnvCredentials::with_resumes_url(
        None,
        Some("xsrf-token".into()),
        format!("{}/applicant/resumes", server.uri()),
    )
    .unwrap();
    assert!(source.credential().await.unwrap().is_none());
}
