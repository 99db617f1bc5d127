use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use market_pipeline::core::{Action, HttpClient, HttpRequest, HttpResponse};
use market_pipeline::feeds::FetchRequest;
use market_pipeline::{Config, Error, Pipeline, Result};

/// Serves canned responses keyed by URL; unknown URLs get a 404
struct Routes(HashMap<String, (u16, String)>);

#[async_trait]
impl HttpClient for Routes {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let (status, body) = self
            .0
            .get(&request.url)
            .cloned()
            .unwrap_or((404, "not found".to_string()));
        Ok(HttpResponse { status, body })
    }
}

const CONFIG: &str = r#"
    [[sources]]
    id = "bull"
    base_url = "https://bull.example.com"
    api_key = "k1"

    [[sources]]
    id = "bear"
    base_url = "https://bear.example.com"
    api_key = "k2"

    [[sources]]
    id = "down"
    base_url = "https://down.example.com"
    api_key = "k3"

    [decision]
    min_profitability = 0.6
    max_risk = 0.4
    min_edge = 0.2
    action = "enter"
"#;

fn routes() -> Arc<Routes> {
    let bull = r#"{
        "timestamp": 1700000000,
        "metrics": {
            "expected_return": {"value": "6.0", "unit": "pct"},
            "volume": {"value": 900000, "unit": "usd"},
            "volatility": {"value": 8, "unit": "pct"},
            "spread": {"value": 2, "unit": "bps"},
            "note": "ignored"
        }
    }"#;
    let bear = r#"{
        "metrics": {
            "expected_return": {"value": -3.0, "unit": "pct"},
            "volatility": {"value": 70, "unit": "pct"}
        }
    }"#;

    Arc::new(Routes(HashMap::from([
        ("https://bull.example.com/api/v1/data".to_string(), (200, bull.to_string())),
        ("https://bear.example.com/api/v1/data".to_string(), (200, bear.to_string())),
        ("https://down.example.com/api/v1/data".to_string(), (502, "bad gateway".to_string())),
    ])))
}

fn pipeline() -> Pipeline {
    let config = Config::from_toml(CONFIG).unwrap();
    Pipeline::with_client(&config, routes()).unwrap()
}

#[tokio::test]
async fn bullish_source_enters() {
    let plan = pipeline().run("bull", &BTreeMap::new()).await.unwrap();
    assert_eq!(plan.action, Action::new("enter"));
}

#[tokio::test]
async fn bearish_source_holds() {
    let plan = pipeline().run("bear", &BTreeMap::new()).await.unwrap();
    assert!(plan.action.is_no_action());
    assert!(plan.expected_outcome.contains("below threshold"));
}

#[tokio::test]
async fn failing_source_aborts_batch() {
    let requests = [
        FetchRequest::new("bull"),
        FetchRequest::new("down"),
        FetchRequest::new("bear"),
    ];

    let err = pipeline().run_all(&requests).await.unwrap_err();
    assert!(err.is_connectivity());
}

#[tokio::test]
async fn run_each_isolates_failures() {
    let requests = [
        FetchRequest::new("bull"),
        FetchRequest::new("down"),
        FetchRequest::new("unknown"),
    ];

    let results = pipeline().run_each(&requests).await;
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(Error::Connectivity { status: 502, .. })));
    assert!(matches!(results[2], Err(Error::MissingCredential(_))));
}

#[tokio::test]
async fn missing_credential_fails_construction() {
    let config = Config::from_toml(
        r#"
        [[sources]]
        id = "market_pipeline_test_source_without_key"
        "#,
    )
    .unwrap();

    let result = Pipeline::with_client(&config, routes());
    assert!(matches!(result, Err(Error::Config(_))));
}
