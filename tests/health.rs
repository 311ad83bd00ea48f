use cartlink_api::routes::health::health_check;

#[tokio::test]
async fn health_check_returns_ok() {
    let response = health_check().await;
    assert!(response.0.success);
    assert_eq!(response.0.message.as_deref(), Some("Health check"));

    let body = serde_json::to_value(&response.0).expect("serialize health");
    assert_eq!(body["data"]["status"], "ok");
    assert!(body.get("meta").is_some());
}

#[tokio::test]
async fn health_reports_service_identity() {
    let body = serde_json::to_value(&health_check().await.0).expect("serialize health");
    assert_eq!(body["data"]["service"], "cartlink-api");
    assert!(body["data"]["version"].is_string());
}
