use super::*;

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn status_mapping_covers_taxonomy() {
    assert_eq!(ApiError::validation("x").status(), StatusCode::BAD_REQUEST);
    assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
    assert_eq!(ApiError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(ApiError::Configuration("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(ApiError::UpstreamEmpty("No response from AI").status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(ApiError::MalformedResponse("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        ApiError::Llm(LlmError::ApiRequest("timeout".into())).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn error_codes_are_stable() {
    assert_eq!(ApiError::validation("x").error_code(), "E_VALIDATION");
    assert_eq!(ApiError::RateLimited.error_code(), "E_RATE_LIMITED");
    assert_eq!(ApiError::MalformedResponse("x".into()).error_code(), "E_MALFORMED_RESPONSE");
    assert_eq!(ApiError::Llm(LlmError::ApiParse("bad".into())).error_code(), "E_API_PARSE");
}

#[test]
fn llm_retryability_passes_through() {
    assert!(ApiError::Llm(LlmError::ApiResponse { status: 503, body: String::new() }).retryable());
    assert!(!ApiError::Llm(LlmError::ApiResponse { status: 400, body: String::new() }).retryable());
    assert!(!ApiError::validation("x").retryable());
}

#[tokio::test]
async fn validation_renders_message_body() {
    let response = ApiError::validation("Feature name and description are required").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Feature name and description are required");
}

#[tokio::test]
async fn internal_causes_are_not_leaked() {
    let response = ApiError::Llm(LlmError::ApiResponse { status: 401, body: "invalid key sk-123".into() }).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    let message = body["error"].as_str().unwrap();
    assert!(!message.contains("sk-123"));
}

#[tokio::test]
async fn rate_limited_renders_429() {
    let response = ApiError::RateLimited.into_response();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(response).await["error"], "Too many requests");
}
