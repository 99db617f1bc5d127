//! Collector - fetches source payloads and normalizes them into metric records

use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{Instrument, debug, error, info};

use crate::core::{
    Error, HttpClient, HttpRequest, Metric, MetricRecord, RawPayload, Result, Scalar,
};

/// Path appended to every source's base URL
pub const DATA_PATH: &str = "/api/v1/data";

/// Rendering of a null unit
pub const NULL_UNIT: &str = "None";

/// A reachable market-data source
#[derive(Clone)]
pub struct Source {
    pub id: String,
    pub base_url: String,
    credential: String,
}

impl Source {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
            credential: credential.into(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), DATA_PATH)
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .field("credential", &"***")
            .finish()
    }
}

/// One fetch in a batch
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub source_id: String,
    pub parameters: BTreeMap<String, String>,
}

impl FetchRequest {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// Market data collector. Single attempt per fetch, no retries.
pub struct Collector {
    client: Arc<dyn HttpClient>,
    sources: HashMap<String, Source>,
    span: tracing::Span,
}

impl Collector {
    pub fn new(client: Arc<dyn HttpClient>, sources: impl IntoIterator<Item = Source>) -> Self {
        Self {
            client,
            sources: sources.into_iter().map(|s| (s.id.clone(), s)).collect(),
            span: tracing::info_span!("collector"),
        }
    }

    /// Sources keyed by their base URL, each with its credential
    pub fn from_credentials(client: Arc<dyn HttpClient>, credentials: HashMap<String, String>) -> Self {
        Self::new(
            client,
            credentials
                .into_iter()
                .map(|(id, key)| Source::new(id.clone(), id, key)),
        )
    }

    /// Replace the span events are emitted under
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn source(&self, id: &str) -> Option<&Source> {
        self.sources.get(id)
    }

    /// Fetch and normalize one record from `source_id`
    pub async fn fetch(&self, source_id: &str, parameters: &BTreeMap<String, String>) -> Result<MetricRecord> {
        async move {
            match self.try_fetch(source_id, parameters).await {
                Ok(record) => {
                    info!(
                        source = source_id,
                        metrics = record.metrics.len(),
                        "Successfully fetched data from {}",
                        source_id
                    );
                    Ok(record)
                }
                Err(e) => {
                    error!(source = source_id, "Error fetching data: {}", e);
                    Err(e)
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }

    /// Run independent fetches concurrently. Results keep input order.
    pub async fn fetch_all(&self, requests: &[FetchRequest]) -> Vec<Result<MetricRecord>> {
        join_all(
            requests
                .iter()
                .map(|r| self.fetch(&r.source_id, &r.parameters)),
        )
        .await
    }

    async fn try_fetch(&self, source_id: &str, parameters: &BTreeMap<String, String>) -> Result<MetricRecord> {
        let source = self
            .sources
            .get(source_id)
            .ok_or_else(|| Error::MissingCredential(source_id.to_string()))?;

        let request = HttpRequest {
            url: source.endpoint(),
            query: parameters.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            headers: vec![("Authorization".to_string(), source.credential.clone())],
        };

        let resp = self.client.get(&request).await?;
        if !resp.is_success() {
            return Err(Error::Connectivity {
                source_id: source_id.to_string(),
                status: resp.status,
            });
        }

        let body: serde_json::Value = serde_json::from_str(&resp.body)
            .map_err(|e| Error::Format(format!("response body is not valid JSON: {}", e)))?;

        parse_payload(RawPayload::from(body))
    }
}

/// Convert an untrusted payload into a metric record
pub fn parse_payload(raw: RawPayload) -> Result<MetricRecord> {
    let mut top = match raw {
        RawPayload::Mapping(m) => m,
        other => return Err(Error::Format(format!("expected a mapping, got {}", other.kind()))),
    };

    let timestamp = match top.remove("timestamp") {
        None | Some(RawPayload::Null) => None,
        Some(RawPayload::Scalar(Scalar::Number(n))) => n.as_f64(),
        Some(other) => {
            debug!("Ignoring non-numeric timestamp ({})", other.kind());
            None
        }
    };

    let metrics = match top.get("metrics") {
        Some(RawPayload::Mapping(m)) => validate_metrics(m)?,
        Some(other) => {
            return Err(Error::Format(format!("metrics must be a mapping, got {}", other.kind())));
        }
        None => return Err(Error::Format("missing required key 'metrics'".to_string())),
    };

    Ok(MetricRecord::new(timestamp, metrics))
}

/// Keep entries that are mappings with both `value` and `unit`, coercing each.
/// Incomplete entries are dropped; a value that cannot be coerced fails the whole set.
pub fn validate_metrics(metrics: &BTreeMap<String, RawPayload>) -> Result<BTreeMap<String, Metric>> {
    let mut valid = BTreeMap::new();

    for (name, entry) in metrics {
        let Some(fields) = entry.as_mapping() else {
            debug!(metric = %name, "Dropping non-mapping metric ({})", entry.kind());
            continue;
        };

        let (Some(value), Some(unit)) = (fields.get("value"), fields.get("unit")) else {
            debug!(metric = %name, "Dropping metric without value/unit");
            continue;
        };

        valid.insert(
            name.clone(),
            Metric {
                value: coerce_value(name, value)?,
                unit: coerce_unit(unit),
            },
        );
    }

    Ok(valid)
}

fn coerce_value(metric: &str, raw: &RawPayload) -> Result<f64> {
    match raw {
        RawPayload::Scalar(Scalar::Number(n)) => n.as_f64().ok_or_else(|| Error::Validation {
            metric: metric.to_string(),
            reason: format!("value {} is not representable as a float", n),
        }),
        RawPayload::Scalar(Scalar::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
        RawPayload::Scalar(Scalar::Text(s)) => s.trim().parse::<f64>().map_err(|_| Error::Validation {
            metric: metric.to_string(),
            reason: format!("value '{}' is not a number", s),
        }),
        other => Err(Error::Validation {
            metric: metric.to_string(),
            reason: format!("value of type {} cannot be converted to a number", other.kind()),
        }),
    }
}

/// Units are free text; anything else is rendered, never rejected
fn coerce_unit(raw: &RawPayload) -> String {
    match raw {
        RawPayload::Scalar(Scalar::Text(s)) => s.clone(),
        RawPayload::Scalar(Scalar::Number(n)) => n.to_string(),
        RawPayload::Scalar(Scalar::Bool(b)) => b.to_string(),
        RawPayload::Null => NULL_UNIT.to_string(),
        structured => serde_json::Value::from(structured).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HttpResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Fake transport that records requests and replays a canned response
    struct Recorder {
        status: u16,
        body: String,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Recorder {
        fn new(status: u16, body: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                status,
                body: body.into(),
                seen: Mutex::new(vec![]),
            })
        }
    }

    #[async_trait]
    impl HttpClient for Recorder {
        async fn get(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(HttpResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    fn raw(value: serde_json::Value) -> BTreeMap<String, RawPayload> {
        match RawPayload::from(value) {
            RawPayload::Mapping(m) => m,
            other => panic!("expected mapping, got {:?}", other),
        }
    }

    fn collector(client: Arc<Recorder>) -> Collector {
        Collector::new(
            client,
            [Source::new("alpha", "https://alpha.example.com/", "token-a")],
        )
    }

    #[test]
    fn test_validate_empty() {
        assert!(validate_metrics(&BTreeMap::new()).unwrap().is_empty());
    }

    #[test]
    fn test_validate_coerces_text_value() {
        let out = validate_metrics(&raw(json!({"x": {"value": "1.5", "unit": "usd"}}))).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out["x"], Metric::new(1.5, "usd"));
    }

    #[test]
    fn test_validate_rejects_non_numeric_text() {
        let err = validate_metrics(&raw(json!({"x": {"value": "abc", "unit": "usd"}}))).unwrap_err();
        assert!(matches!(err, Error::Validation { ref metric, .. } if metric == "x"));
    }

    #[test]
    fn test_validate_drops_incomplete_entries() {
        let out = validate_metrics(&raw(json!({
            "no_value": {"unit": "usd"},
            "no_unit": {"value": 2},
            "scalar": 3.0,
            "list": [1, 2],
            "ok": {"value": 4, "unit": 7, "extra": "ignored"},
            "flag": {"value": true, "unit": false}
        })))
        .unwrap();

        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["flag", "ok"]);
        assert_eq!(out["ok"], Metric::new(4.0, "7"));
        assert_eq!(out["flag"], Metric::new(1.0, "false"));
    }

    #[test]
    fn test_validate_rejects_structured_values() {
        assert!(validate_metrics(&raw(json!({"x": {"value": null, "unit": "usd"}}))).is_err());
        assert!(validate_metrics(&raw(json!({"x": {"value": [1], "unit": "usd"}}))).is_err());
    }

    #[test]
    fn test_validate_renders_any_unit_as_text() {
        let out = validate_metrics(&raw(json!({
            "null_unit": {"value": 1, "unit": null},
            "list_unit": {"value": 2, "unit": ["usd"]},
            "map_unit": {"value": 3, "unit": {"base": "usd"}},
            "float_unit": {"value": 4, "unit": 1.0},
            "big_unit": {"value": 5, "unit": 9007199254740993u64}
        })))
        .unwrap();

        assert_eq!(out.len(), 5);
        assert_eq!(out["null_unit"], Metric::new(1.0, NULL_UNIT));
        assert_eq!(out["list_unit"], Metric::new(2.0, r#"["usd"]"#));
        assert_eq!(out["map_unit"], Metric::new(3.0, r#"{"base":"usd"}"#));
        assert_eq!(out["float_unit"], Metric::new(4.0, "1.0"));
        assert_eq!(out["big_unit"], Metric::new(5.0, "9007199254740993"));
    }

    #[test]
    fn test_parse_rejects_non_mapping() {
        let err = parse_payload(RawPayload::from(json!([1, 2, 3]))).unwrap_err();
        assert!(matches!(err, Error::Format(_)));

        let err = parse_payload(RawPayload::Null).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_parse_requires_metrics_mapping() {
        let missing = parse_payload(RawPayload::from(json!({"timestamp": 1}))).unwrap_err();
        assert!(matches!(missing, Error::Format(_)));

        let wrong = parse_payload(RawPayload::from(json!({"metrics": [1]}))).unwrap_err();
        assert!(matches!(wrong, Error::Format(_)));
    }

    #[test]
    fn test_parse_timestamp() {
        let record = parse_payload(RawPayload::from(json!({"timestamp": 1700000000, "metrics": {}}))).unwrap();
        assert_eq!(record.timestamp, Some(1_700_000_000.0));

        let record = parse_payload(RawPayload::from(json!({"metrics": {}}))).unwrap();
        assert_eq!(record.timestamp, None);

        let record = parse_payload(RawPayload::from(json!({
            "timestamp": "2024-01-01T00:00:00Z",
            "metrics": {"x": {"value": 1, "unit": "usd"}}
        })))
        .unwrap();
        assert_eq!(record.timestamp, None);
        assert_eq!(record.metric("x"), Some(&Metric::new(1.0, "usd")));

        let record = parse_payload(RawPayload::from(json!({"timestamp": [1], "metrics": {}}))).unwrap();
        assert_eq!(record.timestamp, None);
    }

    #[tokio::test]
    async fn test_fetch_builds_request() {
        let client = Recorder::new(
            200,
            r#"{"timestamp": 1700000000, "metrics": {"volume": {"value": "1200", "unit": "usd"}}}"#,
        );
        let collector = collector(client.clone());

        let params = BTreeMap::from([("symbol".to_string(), "BTC".to_string())]);
        let record = collector.fetch("alpha", &params).await.unwrap();
        assert_eq!(record.metric("volume"), Some(&Metric::new(1200.0, "usd")));

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].url, "https://alpha.example.com/api/v1/data");
        assert_eq!(seen[0].query, vec![("symbol".to_string(), "BTC".to_string())]);
        assert_eq!(
            seen[0].headers,
            vec![("Authorization".to_string(), "token-a".to_string())]
        );
    }

    #[tokio::test]
    async fn test_fetch_unknown_source_sends_nothing() {
        let client = Recorder::new(200, "{}");
        let collector = collector(client.clone());

        let err = collector.fetch("beta", &BTreeMap::new()).await.unwrap_err();
        assert!(matches!(err, Error::MissingCredential(ref id) if id == "beta"));
        assert!(client.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_non_success_is_connectivity() {
        let collector = collector(Recorder::new(503, "unavailable"));

        let err = collector.fetch("alpha", &BTreeMap::new()).await.unwrap_err();
        assert!(err.is_connectivity());
        assert!(matches!(err, Error::Connectivity { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_fetch_bad_body_is_format() {
        let err = collector(Recorder::new(200, "<html>"))
            .fetch("alpha", &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Format(_)));

        let err = collector(Recorder::new(200, "[1, 2]"))
            .fetch("alpha", &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[tokio::test]
    async fn test_from_credentials_uses_id_as_base_url() {
        let client = Recorder::new(200, r#"{"metrics": {}}"#);
        let collector = Collector::from_credentials(
            client.clone(),
            HashMap::from([("https://beta.example.com".to_string(), "token-b".to_string())]),
        );

        collector.fetch("https://beta.example.com", &BTreeMap::new()).await.unwrap();
        assert_eq!(
            client.seen.lock().unwrap()[0].url,
            "https://beta.example.com/api/v1/data"
        );
    }

    #[tokio::test]
    async fn test_fetch_all_keeps_order() {
        let client = Recorder::new(200, r#"{"metrics": {"x": {"value": 1, "unit": "u"}}}"#);
        let collector = collector(client.clone());

        let results = collector
            .fetch_all(&[
                FetchRequest::new("alpha").param("page", "1"),
                FetchRequest::new("missing"),
                FetchRequest::new("alpha").param("page", "2"),
            ])
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::MissingCredential(_))));
        assert!(results[2].is_ok());
        assert_eq!(client.seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_source_debug_redacts_credential() {
        let source = Source::new("alpha", "https://alpha.example.com", "token-a");
        assert!(!format!("{:?}", source).contains("token-a"));
    }
}
