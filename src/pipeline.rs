//! Pipeline - collector feeding the decision engine

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::try_join_all;

use crate::core::{ActionPlan, Config, HttpClient, Result};
use crate::decision::DecisionEngine;
use crate::feeds::{Collector, FetchRequest, ReqwestHttpClient, Source};

/// Fetch → analyze → decide, one way only
pub struct Pipeline {
    collector: Collector,
    engine: DecisionEngine,
}

impl Pipeline {
    pub fn new(collector: Collector, engine: DecisionEngine) -> Self {
        Self { collector, engine }
    }

    /// Build with the reqwest transport
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Arc::new(ReqwestHttpClient::new(&config.http)?);
        Self::with_client(config, client)
    }

    /// Build with a caller-supplied transport. Credentials are resolved here.
    pub fn with_client(config: &Config, client: Arc<dyn HttpClient>) -> Result<Self> {
        config.validate()?;

        let sources = config
            .sources
            .iter()
            .map(|s| -> Result<Source> { Ok(Source::new(&s.id, s.base_url(), s.credential()?)) })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(
            Collector::new(client, sources),
            DecisionEngine::from_config(config)?,
        ))
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// Run one source end to end
    pub async fn run(&self, source_id: &str, parameters: &BTreeMap<String, String>) -> Result<ActionPlan> {
        let record = self.collector.fetch(source_id, parameters).await?;
        self.engine.execute(record)
    }

    /// Fetch concurrently, decide in order. The first failure aborts the batch
    /// and drops the fetches still in flight.
    pub async fn run_all(&self, requests: &[FetchRequest]) -> Result<Vec<ActionPlan>> {
        let records = try_join_all(
            requests
                .iter()
                .map(|r| self.collector.fetch(&r.source_id, &r.parameters)),
        )
        .await?;

        records.into_iter().map(|r| self.engine.execute(r)).collect()
    }

    /// Independent invocations; each result stands alone
    pub async fn run_each(&self, requests: &[FetchRequest]) -> Vec<Result<ActionPlan>> {
        self.collector
            .fetch_all(requests)
            .await
            .into_iter()
            .map(|fetched| fetched.and_then(|r| self.engine.execute(r)))
            .collect()
    }
}
