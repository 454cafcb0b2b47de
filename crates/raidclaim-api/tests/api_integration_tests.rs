//! API Integration Tests
//!
//! Full request/response cycle through the router, with scripted providers
//! behind the gateway instead of real network calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use raidclaim_api::{create_router, ApiConfig, AppState};
use raidclaim_vision::{
    ExtractionRequest, FailureKind, FallbackRouter, Gateway, GatewayConfig, ProviderCallResult,
    ProviderCredential, ProviderId, VisionProvider,
};

/// Returns a fixed result and counts its invocations
struct Scripted {
    result: ProviderCallResult,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl VisionProvider for Scripted {
    fn id(&self) -> ProviderId {
        self.result.provider
    }

    async fn call(&self, _: &ExtractionRequest, _: &ProviderCredential) -> ProviderCallResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Never answers within any reasonable request deadline
struct Stalled(ProviderId);

#[async_trait]
impl VisionProvider for Stalled {
    fn id(&self) -> ProviderId {
        self.0
    }

    async fn call(&self, _: &ExtractionRequest, _: &ProviderCredential) -> ProviderCallResult {
        tokio::time::sleep(Duration::from_secs(30)).await;
        ProviderCallResult::completed(self.0, 200, "too late")
    }
}

struct TestApp {
    router: Router,
    calls: Arc<AtomicUsize>,
}

/// Router over scripted providers; `keys` lists the providers that have a credential
fn test_app(results: Vec<ProviderCallResult>, keys: &[ProviderId]) -> TestApp {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut providers = FallbackRouter::new();
    for result in results {
        providers = providers.with_provider(Arc::new(Scripted {
            result,
            calls: calls.clone(),
        }));
    }

    let config = keys
        .iter()
        .fold(GatewayConfig::new(), |c, id| c.with_api_key(*id, "test-key"));
    let state = Arc::new(AppState::new(Gateway::with_router(config, providers)));

    TestApp {
        router: create_router(state, ApiConfig::default()),
        calls,
    }
}

/// Test helper to make a request and get JSON response
async fn json_request(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Body>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(body.unwrap_or_else(Body::empty))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!(null));

    (status, json)
}

fn json_body(value: Value) -> Option<Body> {
    Some(Body::from(serde_json::to_vec(&value).unwrap()))
}

// A few bytes of a JPEG header, base64 encoded
const IMAGE_B64: &str = "/9j/4AAQSkZJRg==";

// =============================================================================
// Extraction Endpoints
// =============================================================================

#[tokio::test]
async fn test_date_time_extraction() {
    let app = test_app(
        vec![ProviderCallResult::completed(
            ProviderId::OpenRouter,
            200,
            "Date: Nov 10, Time: 3:30 PM",
        )],
        &ProviderId::ALL,
    );

    let (status, json) = json_request(
        &app.router,
        "POST",
        "/api/v1/extract/datetime",
        json_body(json!({"image": IMAGE_B64, "mimeType": "image/png"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["extractedText"], "Date: Nov 10, Time: 3:30 PM");
    assert_eq!(json["success"], true);
    assert_eq!(json["provider"], "openrouter");
    assert_eq!(json["fallback"], false);
    assert!(json.get("result").is_none());
}

#[tokio::test]
async fn test_receipt_extraction_with_prose_around_json() {
    let app = test_app(
        vec![ProviderCallResult::completed(
            ProviderId::Gemini,
            200,
            r#"Here you go: {"title":"Taxi","amount":"450","currency":"LKR"}"#,
        )],
        &ProviderId::ALL,
    );

    let (status, json) = json_request(
        &app.router,
        "POST",
        "/api/v1/extract/receipt",
        json_body(json!({"image": IMAGE_B64, "fileName": "taxi.jpg"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["result"],
        json!({"title": "Taxi", "amount": "450", "currency": "LKR"})
    );
    assert_eq!(json["fileName"], "taxi.jpg");
    assert_eq!(json["success"], true);
    assert!(json.get("extractedText").is_none());
}

#[tokio::test]
async fn test_receipt_without_json_degrades_to_raw_response() {
    let app = test_app(
        vec![ProviderCallResult::completed(
            ProviderId::Gemini,
            200,
            "The image is too blurry to read.",
        )],
        &ProviderId::ALL,
    );

    let (status, json) = json_request(
        &app.router,
        "POST",
        "/api/v1/extract/receipt",
        json_body(json!({"image": IMAGE_B64})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["result"],
        json!({"rawResponse": "The image is too blurry to read."})
    );
}

#[tokio::test]
async fn test_text_extraction_falls_back() {
    let app = test_app(
        vec![
            ProviderCallResult::failed(
                ProviderId::HuggingFace,
                503,
                FailureKind::Upstream,
                "Model is currently loading",
            ),
            ProviderCallResult::completed(ProviderId::OpenRouter, 200, "TOTAL LKR 450"),
        ],
        &ProviderId::ALL,
    );

    let (status, json) = json_request(
        &app.router,
        "POST",
        "/api/v1/extract/text",
        json_body(json!({"image": format!("data:image/png;base64,{}", IMAGE_B64)})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["extractedText"], "TOTAL LKR 450");
    assert_eq!(json["provider"], "openrouter");
    assert_eq!(json["fallback"], true);
    assert_eq!(app.calls.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Request Errors
// =============================================================================

#[tokio::test]
async fn test_empty_image_is_rejected_before_any_provider_call() {
    let app = test_app(
        vec![ProviderCallResult::completed(ProviderId::OpenRouter, 200, "x")],
        &ProviderId::ALL,
    );

    for body in [json!({"image": ""}), json!({"fileName": "a.jpg"})] {
        let (status, json) = json_request(
            &app.router,
            "POST",
            "/api/v1/extract/datetime",
            json_body(body),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({"error": "Missing image data"}));
    }
    assert_eq!(app.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_json_body() {
    let app = test_app(vec![], &ProviderId::ALL);

    let (status, json) = json_request(
        &app.router,
        "POST",
        "/api/v1/extract/receipt",
        Some(Body::from("{image: nope")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({"error": "Invalid JSON body"}));
}

#[tokio::test]
async fn test_invalid_base64_image() {
    let app = test_app(vec![], &ProviderId::ALL);

    let (status, json) = json_request(
        &app.router,
        "POST",
        "/api/v1/extract/text",
        json_body(json!({"image": "%%%not-base64%%%"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({"error": "Invalid image data"}));
}

#[tokio::test]
async fn test_non_post_methods_are_rejected() {
    let app = test_app(vec![], &ProviderId::ALL);

    for (method, uri) in [
        ("GET", "/api/v1/extract/datetime"),
        ("PUT", "/api/v1/extract/receipt"),
        ("DELETE", "/api/v1/extract/text"),
    ] {
        let (status, json) = json_request(&app.router, method, uri, None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(json, json!({"error": "Method Not Allowed"}));
    }
}

#[tokio::test]
async fn test_oversized_body_uses_error_envelope() {
    let gateway = Gateway::with_router(GatewayConfig::new(), FallbackRouter::new());
    let config = ApiConfig {
        max_body_size: 64,
        ..ApiConfig::default()
    };
    let router = create_router(Arc::new(AppState::new(gateway)), config);

    let (status, json) = json_request(
        &router,
        "POST",
        "/api/v1/extract/datetime",
        json_body(json!({"image": "A".repeat(256)})),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json, json!({"error": "Request body too large"}));
}

#[tokio::test]
async fn test_request_timeout_uses_error_envelope() {
    let config = GatewayConfig::new().with_api_key(ProviderId::OpenRouter, "or");
    let providers = FallbackRouter::new().with_provider(Arc::new(Stalled(ProviderId::OpenRouter)));
    let gateway = Gateway::with_router(config, providers);
    let api_config = ApiConfig {
        request_timeout: Duration::from_millis(50),
        ..ApiConfig::default()
    };
    let router = create_router(Arc::new(AppState::new(gateway)), api_config);

    let (status, json) = json_request(
        &router,
        "POST",
        "/api/v1/extract/datetime",
        json_body(json!({"image": IMAGE_B64})),
    )
    .await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(json, json!({"error": "Request timed out"}));
}

// =============================================================================
// Configuration and Provider Errors
// =============================================================================

#[tokio::test]
async fn test_missing_api_key_for_whole_chain() {
    let app = test_app(
        vec![ProviderCallResult::completed(ProviderId::HuggingFace, 200, "x")],
        &[ProviderId::Gemini],
    );

    let (status, json) = json_request(
        &app.router,
        "POST",
        "/api/v1/extract/text",
        json_body(json!({"image": IMAGE_B64})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({"error": "Missing Hugging Face API key"}));
    assert_eq!(app.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_exhausted_chain_mirrors_last_provider_status() {
    let app = test_app(
        vec![
            ProviderCallResult::failed(ProviderId::OpenRouter, 500, FailureKind::Upstream, "a"),
            ProviderCallResult::failed(ProviderId::Groq, 503, FailureKind::Upstream, "b"),
            ProviderCallResult::failed(
                ProviderId::OpenAi,
                429,
                FailureKind::Upstream,
                "You exceeded your current quota",
            ),
        ],
        &ProviderId::ALL,
    );

    let (status, json) = json_request(
        &app.router,
        "POST",
        "/api/v1/extract/datetime",
        json_body(json!({"image": IMAGE_B64})),
    )
    .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        json,
        json!({"error": "OpenAI API error: You exceeded your current quota"})
    );
}

#[tokio::test]
async fn test_parse_failure_surfaces_as_bad_gateway() {
    let app = test_app(
        vec![ProviderCallResult::failed(
            ProviderId::Gemini,
            200,
            FailureKind::Malformed,
            "failed to parse Gemini response: expected value",
        )],
        &[ProviderId::Gemini],
    );

    let (status, json) = json_request(
        &app.router,
        "POST",
        "/api/v1/extract/receipt",
        json_body(json!({"image": IMAGE_B64})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Gemini API error: failed to parse"));
}

// =============================================================================
// Diagnostics
// =============================================================================

#[tokio::test]
async fn test_providers_report_key_presence() {
    let app = test_app(vec![], &[ProviderId::OpenAi, ProviderId::Groq]);

    let (status, json) = json_request(&app.router, "GET", "/api/v1/providers", None).await;

    assert_eq!(status, StatusCode::OK);
    let providers = json["providers"].as_array().unwrap();
    assert_eq!(providers.len(), 5);

    let key_of = |id: &str| {
        providers
            .iter()
            .find(|p| p["id"] == id)
            .map(|p| p["apiKey"].clone())
            .unwrap()
    };
    assert_eq!(key_of("openai"), "Present");
    assert_eq!(key_of("groq"), "Present");
    assert_eq!(key_of("huggingface"), "Missing");
    assert_eq!(
        json["chains"]["date_time"],
        json!(["openrouter", "groq", "openai"])
    );
    assert!(!json.to_string().contains("test-key"));
}

#[tokio::test]
async fn test_health_check_and_request_id() {
    let app = test_app(vec![], &[]);

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}
