//! Dashboard Controller
//!
//! Ties the service client, response caches, session and local importances
//! together. Every action either updates the session with complete data or
//! leaves it as it was.

use crate::cache::ResponseCache;
use crate::client::{HttpScoringApi, PredictionResult, Record, ScoringApi};
use crate::config::DashboardConfig;
use crate::importances::{FeatureImportance, LocalImportances};
use crate::session::{compute_modifications, Session};
use crate::DashboardError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Number of features shown by `explain`
pub const TOP_IMPORTANCES: usize = 15;

/// A client's value against the population distribution
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub variable: String,
    /// None when the loaded record has no numeric value for the variable
    pub client_value: Option<f64>,
    /// Numeric population values; empty when unavailable
    pub population: Vec<f64>,
    /// Set when the variable holds text rather than a number
    pub client_category: Option<String>,
    /// Population counts per category, in first-seen order
    pub categories: Vec<(String, usize)>,
}

/// Where a prediction came from
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    /// Issued to the service for this request
    Fresh(PredictionResult),
    /// Reused from the session
    Cached(PredictionResult),
}

impl PredictionOutcome {
    /// The prediction regardless of origin
    pub fn result(&self) -> &PredictionResult {
        match self {
            PredictionOutcome::Fresh(result) | PredictionOutcome::Cached(result) => result,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, PredictionOutcome::Cached(_))
    }
}

/// Stateful dashboard over a scoring API
pub struct Dashboard<A> {
    api: A,
    clients: ResponseCache<i64, Record>,
    columns: ResponseCache<String, Vec<Value>>,
    session: Session,
    importances: LocalImportances,
}

impl Dashboard<HttpScoringApi> {
    /// Build the HTTP-backed dashboard from configuration
    pub fn from_config(config: &DashboardConfig) -> Result<Self, DashboardError> {
        let api = HttpScoringApi::new(&config.base_url, config.request_timeout())?;
        let importances = LocalImportances::load_or_empty(&config.importances_path);

        info!(
            "Dashboard targeting {} (cache ttl: {:?})",
            config.base_url,
            config.cache_ttl()
        );

        let mut dashboard = Self::new(api, config.cache_ttl(), importances);
        dashboard.select(config.default_client_id);
        Ok(dashboard)
    }
}

impl<A: ScoringApi> Dashboard<A> {
    /// Create a dashboard with an empty session
    pub fn new(api: A, cache_ttl: Option<Duration>, importances: LocalImportances) -> Self {
        Self {
            api,
            clients: ResponseCache::new(cache_ttl),
            columns: ResponseCache::new(cache_ttl),
            session: Session::new(),
            importances,
        }
    }

    /// Underlying service client
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Current session state
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Select a client for subsequent actions without loading it
    pub fn select(&mut self, client_id: i64) {
        self.session.select(client_id);
    }

    /// Memoized `GET /client/{id}`
    pub async fn get_client_data(&mut self, client_id: i64) -> Result<Record, DashboardError> {
        let api = &self.api;
        self.clients
            .get_or_fetch(client_id, || api.get_client(client_id))
            .await
    }

    /// Memoized `GET /column/{name}`
    pub async fn get_column_data(&mut self, name: &str) -> Result<Vec<Value>, DashboardError> {
        let api = &self.api;
        self.columns
            .get_or_fetch(name.to_string(), || api.get_column(name))
            .await
    }

    /// Select and load a client.
    ///
    /// An unknown id hides the previously loaded client; any other failure
    /// leaves the session untouched.
    pub async fn load_client(&mut self, client_id: i64) -> Result<&Record, DashboardError> {
        self.session.select(client_id);

        match self.get_client_data(client_id).await {
            Ok(record) => {
                info!("Loaded client {}", client_id);
                self.session.set_loaded(client_id, record);
            }
            Err(DashboardError::NotFound(detail)) => {
                warn!("Client {} not found", client_id);
                self.session.clear_loaded();
                return Err(DashboardError::NotFound(detail));
            }
            Err(e) => return Err(e),
        }

        self.session
            .loaded()
            .map(|(_, record)| record)
            .ok_or(DashboardError::NoClientLoaded)
    }

    /// Compare the loaded client's value with the population.
    ///
    /// The column is only fetched when the client has a value for it. Text
    /// values are compared as categories, null or absent ones as missing.
    pub async fn compare(&mut self, variable: &str) -> Result<Comparison, DashboardError> {
        let (_, record) = self.session.loaded().ok_or(DashboardError::NoClientLoaded)?;
        let value = record.get(variable);
        let client_value = value.and_then(numeric);
        let client_category = value.and_then(Value::as_str).map(str::to_string);

        let mut comparison = Comparison {
            variable: variable.to_string(),
            client_value,
            population: Vec::new(),
            client_category,
            categories: Vec::new(),
        };

        if comparison.client_value.is_some() {
            comparison.population = self
                .get_column_data(variable)
                .await?
                .iter()
                .filter_map(numeric)
                .collect();
        } else if comparison.client_category.is_some() {
            comparison.categories = category_counts(&self.get_column_data(variable).await?);
        }

        Ok(comparison)
    }

    /// Score the selected client, reusing the stored prediction when it
    /// belongs to that client
    pub async fn predict(&mut self) -> Result<PredictionOutcome, DashboardError> {
        let client_id = self.session.selected().ok_or(DashboardError::NoClientLoaded)?;

        if let Some(result) = self.session.prediction_for(client_id) {
            debug!("Reusing prediction for client {}", client_id);
            return Ok(PredictionOutcome::Cached(result.clone()));
        }

        let result = self.api.predict(client_id).await?;
        self.session.set_prediction(client_id, result.clone());
        Ok(PredictionOutcome::Fresh(result))
    }

    /// Re-score the loaded client with edited variables.
    ///
    /// Returns None without calling the service when no edit changes a value.
    pub async fn simulate(
        &mut self,
        edits: &BTreeMap<String, f64>,
    ) -> Result<Option<PredictionResult>, DashboardError> {
        let (client_id, record) = self.session.loaded().ok_or(DashboardError::NoClientLoaded)?;
        let modifications = compute_modifications(record, edits)?;

        if modifications.is_empty() {
            info!("No variable changed for client {}, nothing to simulate", client_id);
            return Ok(None);
        }

        info!(
            "Simulating client {} with {} modified variables",
            client_id,
            modifications.len()
        );
        let result = self.api.predict_custom(client_id, &modifications).await?;
        self.session.set_simulation(client_id, result.clone());
        Ok(Some(result))
    }

    /// Top local importances for the selected client
    pub fn explain(&self) -> Result<Vec<FeatureImportance>, DashboardError> {
        let client_id = self.session.selected().ok_or(DashboardError::NoClientLoaded)?;
        self.importances
            .top(client_id, TOP_IMPORTANCES)
            .ok_or_else(|| DashboardError::Importances(format!("no importances for client {}", client_id)))
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn category_counts(values: &[Value]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for label in values.iter().filter_map(Value::as_str) {
        match counts.iter_mut().find(|(seen, _)| seen == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label.to_string(), 1)),
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockApi {
        client_calls: AtomicUsize,
        column_calls: AtomicUsize,
        predict_calls: AtomicUsize,
        custom_calls: AtomicUsize,
        /// When set, every call fails as unreachable
        offline: Mutex<bool>,
        last_modifications: Mutex<Option<BTreeMap<String, f64>>>,
    }

    impl MockApi {
        fn is_offline(&self) -> bool {
            *self.offline.lock().unwrap()
        }

        fn set_offline(&self, offline: bool) {
            *self.offline.lock().unwrap() = offline;
        }
    }

    fn record(id: i64) -> Record {
        json!({
            "SK_ID_CURR": id,
            "AMT_CREDIT": 500000.0,
            "EXT_SOURCE_1": null,
            "DAYS_BIRTH": -12000,
            "NAME_CONTRACT_TYPE": "Cash loans"
        })
            .as_object()
            .cloned()
            .unwrap()
    }

    impl ScoringApi for MockApi {
        async fn get_client(&self, client_id: i64) -> Result<Record, DashboardError> {
            self.client_calls.fetch_add(1, Ordering::SeqCst);
            if self.is_offline() {
                return Err(DashboardError::UpstreamUnavailable("offline".into()));
            }
            match client_id {
                1 | 2 => Ok(record(client_id)),
                _ => Err(DashboardError::NotFound("Client non trouvé".into())),
            }
        }

        async fn get_column(&self, name: &str) -> Result<Vec<Value>, DashboardError> {
            self.column_calls.fetch_add(1, Ordering::SeqCst);
            if self.is_offline() {
                return Err(DashboardError::UpstreamUnavailable("offline".into()));
            }
            match name {
                "NAME_CONTRACT_TYPE" => Ok(vec![
                    json!("Cash loans"),
                    json!("Revolving loans"),
                    json!(null),
                    json!("Cash loans"),
                ]),
                _ => Ok(vec![json!(100000.0), json!(250000), json!(500000.0), json!(null)]),
            }
        }

        async fn predict(&self, client_id: i64) -> Result<PredictionResult, DashboardError> {
            self.predict_calls.fetch_add(1, Ordering::SeqCst);
            Ok(PredictionResult {
                id_client: client_id,
                prediction: vec![0.25],
            })
        }

        async fn predict_custom(
            &self,
            client_id: i64,
            modifications: &BTreeMap<String, f64>,
        ) -> Result<PredictionResult, DashboardError> {
            self.custom_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_modifications.lock().unwrap() = Some(modifications.clone());
            Ok(PredictionResult {
                id_client: client_id,
                prediction: vec![0.9],
            })
        }
    }

    fn dashboard() -> Dashboard<MockApi> {
        Dashboard::new(MockApi::default(), None, LocalImportances::default())
    }

    #[tokio::test]
    async fn test_client_lookup_is_memoized() {
        let mut dashboard = dashboard();
        dashboard.get_client_data(1).await.unwrap();
        dashboard.get_client_data(1).await.unwrap();
        dashboard.get_client_data(2).await.unwrap();

        assert_eq!(dashboard.api.client_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_retried() {
        let mut dashboard = dashboard();
        assert!(dashboard.get_client_data(9).await.is_err());
        assert!(dashboard.get_client_data(9).await.is_err());

        assert_eq!(dashboard.api.client_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_load_unknown_client_hides_previous() {
        let mut dashboard = dashboard();
        dashboard.load_client(1).await.unwrap();

        let err = dashboard.load_client(9).await.unwrap_err();
        assert!(matches!(err, DashboardError::NotFound(_)));
        assert!(dashboard.session().loaded().is_none());
        assert_eq!(dashboard.session().selected(), Some(9));
    }

    #[tokio::test]
    async fn test_upstream_failure_keeps_session() {
        let mut dashboard = dashboard();
        dashboard.load_client(1).await.unwrap();

        dashboard.api.set_offline(true);
        let err = dashboard.load_client(2).await.unwrap_err();
        assert!(matches!(err, DashboardError::UpstreamUnavailable(_)));

        let (loaded_id, _) = dashboard.session().loaded().unwrap();
        assert_eq!(loaded_id, 1);
    }

    #[tokio::test]
    async fn test_predict_reuses_only_for_same_client() {
        let mut dashboard = dashboard();
        dashboard.select(1);

        assert!(!dashboard.predict().await.unwrap().is_cached());
        assert!(dashboard.predict().await.unwrap().is_cached());

        dashboard.select(2);
        let outcome = dashboard.predict().await.unwrap();
        assert!(!outcome.is_cached());
        assert_eq!(outcome.result().id_client, 2);
        assert_eq!(dashboard.api.predict_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_predict_without_selection() {
        let mut dashboard = dashboard();
        assert!(matches!(
            dashboard.predict().await,
            Err(DashboardError::NoClientLoaded)
        ));
    }

    #[tokio::test]
    async fn test_simulate_sends_only_changed_fields() {
        let mut dashboard = dashboard();
        dashboard.load_client(1).await.unwrap();

        let mut edits = BTreeMap::new();
        edits.insert("AMT_CREDIT".to_string(), 500000.0);
        edits.insert("AMT_ANNUITY".to_string(), 1500.0);

        let result = dashboard.simulate(&edits).await.unwrap().unwrap();
        assert_eq!(result.score(), Some(0.9));

        let sent = dashboard.api.last_modifications.lock().unwrap().clone().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent.get("AMT_ANNUITY"), Some(&1500.0));
    }

    #[tokio::test]
    async fn test_simulate_unchanged_makes_no_call() {
        let mut dashboard = dashboard();
        dashboard.load_client(1).await.unwrap();

        let mut edits = BTreeMap::new();
        edits.insert("AMT_CREDIT".to_string(), 500000.0);

        assert!(dashboard.simulate(&edits).await.unwrap().is_none());
        assert_eq!(dashboard.api.custom_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_simulation_does_not_replace_prediction() {
        let mut dashboard = dashboard();
        dashboard.load_client(1).await.unwrap();
        dashboard.predict().await.unwrap();

        let mut edits = BTreeMap::new();
        edits.insert("AMT_CREDIT".to_string(), 1.0);
        dashboard.simulate(&edits).await.unwrap();

        let outcome = dashboard.predict().await.unwrap();
        assert!(outcome.is_cached());
        assert_eq!(outcome.result().score(), Some(0.25));
        assert_eq!(dashboard.session().simulation().and_then(|r| r.score()), Some(0.9));
    }

    #[tokio::test]
    async fn test_simulate_rejects_non_allowed() {
        let mut dashboard = dashboard();
        dashboard.load_client(1).await.unwrap();

        let mut edits = BTreeMap::new();
        edits.insert("EXT_SOURCE_2".to_string(), 0.5);

        assert!(matches!(
            dashboard.simulate(&edits).await,
            Err(DashboardError::NotAllowed(_))
        ));
        assert_eq!(dashboard.api.custom_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_compare_drops_nulls_and_memoizes_column() {
        let mut dashboard = dashboard();
        dashboard.load_client(1).await.unwrap();

        let comparison = dashboard.compare("AMT_CREDIT").await.unwrap();
        assert_eq!(comparison.client_value, Some(500000.0));
        assert_eq!(comparison.population, vec![100000.0, 250000.0, 500000.0]);

        dashboard.compare("AMT_CREDIT").await.unwrap();
        assert_eq!(dashboard.api.column_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_compare_missing_client_value_skips_fetch() {
        let mut dashboard = dashboard();
        dashboard.load_client(1).await.unwrap();

        let comparison = dashboard.compare("EXT_SOURCE_1").await.unwrap();
        assert_eq!(comparison.client_value, None);
        assert!(comparison.population.is_empty());
        assert_eq!(dashboard.api.column_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_compare_text_value_counts_categories() {
        let mut dashboard = dashboard();
        dashboard.load_client(1).await.unwrap();

        let comparison = dashboard.compare("NAME_CONTRACT_TYPE").await.unwrap();
        assert_eq!(comparison.client_value, None);
        assert_eq!(comparison.client_category.as_deref(), Some("Cash loans"));
        assert_eq!(
            comparison.categories,
            vec![("Cash loans".to_string(), 2), ("Revolving loans".to_string(), 1)]
        );
        assert_eq!(dashboard.api.column_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_explain_unknown_client() {
        let mut dashboard = dashboard();
        dashboard.select(1);
        assert!(matches!(dashboard.explain(), Err(DashboardError::Importances(_))));
    }
}
