//! Inference Service Client

use crate::DashboardError;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// One client's fields, in service column order
pub type Record = serde_json::Map<String, Value>;

/// Prediction returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub id_client: i64,
    pub prediction: Vec<f64>,
}

impl PredictionResult {
    /// Probability of default for the scored client
    pub fn score(&self) -> Option<f64> {
        self.prediction.first().copied()
    }
}

#[derive(Debug, Serialize)]
struct PredictBody<'a> {
    id_client: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    modifications: Option<&'a BTreeMap<String, f64>>,
}

/// Calls the dashboard makes against the inference service
pub trait ScoringApi {
    /// `GET /client/{id}`
    fn get_client(&self, client_id: i64) -> impl Future<Output = Result<Record, DashboardError>> + Send;

    /// `GET /column/{name}`
    fn get_column(&self, name: &str) -> impl Future<Output = Result<Vec<Value>, DashboardError>> + Send;

    /// `POST /predict`
    fn predict(&self, client_id: i64) -> impl Future<Output = Result<PredictionResult, DashboardError>> + Send;

    /// `POST /predict_custom`
    fn predict_custom(
        &self,
        client_id: i64,
        modifications: &BTreeMap<String, f64>,
    ) -> impl Future<Output = Result<PredictionResult, DashboardError>> + Send;
}

/// reqwest-backed client
#[derive(Debug, Clone)]
pub struct HttpScoringApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpScoringApi {
    /// Create a client for the service at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DashboardError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DashboardError::UpstreamUnavailable(format!("invalid base url {}: {}", base_url, e)))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DashboardError::UpstreamUnavailable(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Build an endpoint URL, percent-encoding each segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url, DashboardError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                DashboardError::UpstreamUnavailable(format!("cannot append path to {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, DashboardError> {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(transport_error)?;
        decode(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, DashboardError> {
        let url = self.endpoint(segments)?;
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}

fn transport_error(err: reqwest::Error) -> DashboardError {
    warn!("Request failed: {}", err);
    DashboardError::UpstreamUnavailable(err.to_string())
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, DashboardError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| DashboardError::Decode(e.to_string()));
    }

    let detail = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("detail").cloned())
        .map(|detail| match detail {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_else(|| status.to_string());

    Err(match status {
        StatusCode::NOT_FOUND => DashboardError::NotFound(detail),
        StatusCode::UNPROCESSABLE_ENTITY => DashboardError::Validation(detail),
        _ => DashboardError::UpstreamStatus {
            status: status.as_u16(),
            detail,
        },
    })
}

impl ScoringApi for HttpScoringApi {
    async fn get_client(&self, client_id: i64) -> Result<Record, DashboardError> {
        self.get_json(&["client", &client_id.to_string()]).await
    }

    async fn get_column(&self, name: &str) -> Result<Vec<Value>, DashboardError> {
        self.get_json(&["column", name]).await
    }

    async fn predict(&self, client_id: i64) -> Result<PredictionResult, DashboardError> {
        let body = PredictBody {
            id_client: client_id,
            modifications: None,
        };
        self.post_json(&["predict"], &body).await
    }

    async fn predict_custom(
        &self,
        client_id: i64,
        modifications: &BTreeMap<String, f64>,
    ) -> Result<PredictionResult, DashboardError> {
        let body = PredictBody {
            id_client: client_id,
            modifications: Some(modifications),
        };
        self.post_json(&["predict_custom"], &body).await
    }
}
