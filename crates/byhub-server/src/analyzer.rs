//! Advisory safety analysis of package metadata.
//!
//! The analysis is best-effort enrichment shown to the uploader. It is an
//! injected capability so the catalog can run (and be tested) without any
//! provider; its result never reaches the database.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use byhub_shared::SafetyReport;

#[derive(Debug, Error)]
#[error("Analysis unavailable: {0}")]
pub struct AnalysisUnavailable(pub String);

#[async_trait]
pub trait SafetyAnalyzer: Send + Sync {
    async fn analyze(&self, name: &str, description: &str)
        -> Result<SafetyReport, AnalysisUnavailable>;
}

/// Used when no analysis endpoint is configured.
#[derive(Debug, Default)]
pub struct DisabledAnalyzer;

#[async_trait]
impl SafetyAnalyzer for DisabledAnalyzer {
    async fn analyze(&self, _name: &str, _description: &str) -> Result<SafetyReport, AnalysisUnavailable> {
        Err(AnalysisUnavailable("no analyzer configured".to_string()))
    }
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    name: &'a str,
    description: &'a str,
}

/// Posts `{name, description}` to a configured endpoint and expects a
/// [`SafetyReport`] JSON body back.
pub struct HttpAnalyzer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAnalyzer {
    pub fn new(
        endpoint: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl SafetyAnalyzer for HttpAnalyzer {
    async fn analyze(&self, name: &str, description: &str) -> Result<SafetyReport, AnalysisUnavailable> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&AnalyzeRequest { name, description });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Analysis request failed");
            AnalysisUnavailable(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Analysis service returned an error");
            return Err(AnalysisUnavailable(format!("analysis service returned {status}")));
        }

        let report: SafetyReport = response.json().await.map_err(|e| {
            warn!(error = %e, "Analysis response was not a valid report");
            AnalysisUnavailable(e.to_string())
        })?;

        debug!(name, score = report.security_score, "Received analysis report");
        Ok(report)
    }
}
