//! Inference Service
//!
//! Lookup and scoring over the immutable feature table. Every operation is
//! request-scoped and only reads shared state.

use crate::config::ServiceConfig;
use crate::error::{ApiError, StartupError};
use feature_store::{ClientRecord, FeatureTable};
use metrics::{counter, histogram};
use scoring::{Scorer, ScoringError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Prediction returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub id_client: i64,
    /// Probability of default, one entry per scored row
    pub prediction: Vec<f64>,
}

/// Feature table plus scorer
pub struct InferenceService {
    table: FeatureTable,
    scorer: Scorer,
    sample_size: usize,
}

impl InferenceService {
    /// Pair a table with a scorer whose features the table provides
    pub fn new(table: FeatureTable, scorer: Scorer, sample_size: usize) -> Result<Self, StartupError> {
        if let Some(missing) = scorer.features().iter().find(|f| !table.has_column(f)) {
            return Err(StartupError::MissingFeature(missing.clone()));
        }

        Ok(Self {
            table,
            scorer,
            sample_size,
        })
    }

    /// Load table and model artifacts named in the config
    pub fn load(config: &ServiceConfig) -> Result<Self, StartupError> {
        let table = FeatureTable::load(&config.data.table_path, &config.data.id_column)?;
        let scorer = Scorer::load(
            config.model.kind,
            &config.model.scaler_path,
            &config.model.model_path,
            config.model.onnx_options(),
        )?;

        info!(
            "Inference service ready: {} clients, model {}",
            table.len(),
            config.model.kind.as_str()
        );
        Self::new(table, scorer, config.data.sample_size)
    }

    /// Full field set of the first record matching `client_id`
    pub fn get_record(&self, client_id: i64) -> Result<&ClientRecord, ApiError> {
        match self.table.get_record(client_id) {
            Ok(record) => {
                counter!("credit_lookup_total", "outcome" => "found").increment(1);
                Ok(record)
            }
            Err(e) => {
                counter!("credit_lookup_total", "outcome" => "not_found").increment(1);
                info!("Client {} not found", client_id);
                Err(e.into())
            }
        }
    }

    /// First `n` rows in stored order
    pub fn get_sample(&self, n: usize) -> &[ClientRecord] {
        self.table.get_sample(n)
    }

    /// First rows using the configured sample size
    pub fn get_first(&self) -> &[ClientRecord] {
        self.get_sample(self.sample_size)
    }

    /// Non-missing values of a column
    pub fn get_column(&self, name: &str) -> Result<Vec<Value>, ApiError> {
        let values = self.table.get_column(name)?;
        debug!("Column {}: {} values", name, values.len());
        Ok(values)
    }

    /// Score a stored client
    pub fn predict(&self, client_id: i64) -> Result<PredictionResult, ApiError> {
        let record = self.get_record(client_id)?;
        self.score("stored", client_id, record)
    }

    /// Score a stored client with some numeric fields overridden.
    ///
    /// The override is applied to a copy; the table is untouched.
    pub fn predict_custom(
        &self,
        client_id: i64,
        modifications: &BTreeMap<String, f64>,
    ) -> Result<PredictionResult, ApiError> {
        for (name, value) in modifications {
            if !self.table.has_column(name) {
                return Err(ApiError::Validation(format!("Colonne inconnue: {}", name)));
            }
            if !value.is_finite() {
                return Err(ApiError::Validation(format!(
                    "Valeur non finie pour {}",
                    name
                )));
            }
        }

        let record = self.get_record(client_id)?;
        let mut fields = record.fields().clone();
        for (name, value) in modifications {
            fields.insert(name.clone(), Value::from(*value));
        }
        debug!(
            "Client {}: scoring with {} overridden fields",
            client_id,
            modifications.len()
        );

        self.score("custom", client_id, &ClientRecord::new(fields))
            .map_err(|e| match e {
                ApiError::Scoring(ScoringError::NonFiniteInput(name)) => {
                    ApiError::Validation(format!("Valeur hors limites pour {}", name))
                }
                other => other,
            })
    }

    fn score(
        &self,
        kind: &'static str,
        client_id: i64,
        record: &ClientRecord,
    ) -> Result<PredictionResult, ApiError> {
        match self.scorer.score(record) {
            Ok(result) => {
                counter!("credit_predictions_total", "kind" => kind, "outcome" => "ok").increment(1);
                histogram!("credit_scoring_latency_seconds").record(result.latency.as_secs_f64());
                Ok(PredictionResult {
                    id_client: client_id,
                    prediction: vec![result.probability],
                })
            }
            Err(e) => {
                counter!("credit_predictions_total", "kind" => kind, "outcome" => "error")
                    .increment(1);
                Err(e.into())
            }
        }
    }

    /// Number of clients in the table
    pub fn client_count(&self) -> usize {
        self.table.len()
    }

    /// Number of table columns
    pub fn feature_count(&self) -> usize {
        self.table.columns().len()
    }

    /// Model description
    pub fn model_description(&self) -> String {
        self.scorer.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_store::DEFAULT_ID_COLUMN;
    use scoring::{LogisticModel, Scaler};
    use serde_json::json;

    fn service() -> InferenceService {
        let table = FeatureTable::from_json_str(
            &json!([
                {"SK_ID_CURR": 100001, "AMT_CREDIT": 500000, "EXT_SOURCE_2": 0.4},
                {"SK_ID_CURR": 100002, "AMT_CREDIT": 90000, "EXT_SOURCE_2": null},
                {"SK_ID_CURR": 100003, "AMT_CREDIT": 1200000, "EXT_SOURCE_2": 0.1}
            ])
            .to_string(),
            DEFAULT_ID_COLUMN,
        )
        .unwrap();
        let scaler = Scaler::new(
            vec!["AMT_CREDIT".into(), "EXT_SOURCE_2".into()],
            vec![500000.0, 0.5],
            vec![300000.0, 0.2],
        )
        .unwrap();
        let scorer = Scorer::new(scaler, Box::new(LogisticModel::new(-0.5, vec![0.6, -0.8]))).unwrap();
        InferenceService::new(table, scorer, 2).unwrap()
    }

    #[test]
    fn test_missing_feature_column_rejected() {
        let table = FeatureTable::from_json_str(r#"[{"SK_ID_CURR": 1}]"#, DEFAULT_ID_COLUMN).unwrap();
        let scaler = Scaler::new(vec!["AMT_CREDIT".into()], vec![0.0], vec![1.0]).unwrap();
        let scorer = Scorer::new(scaler, Box::new(LogisticModel::new(0.0, vec![1.0]))).unwrap();

        assert!(matches!(
            InferenceService::new(table, scorer, 10),
            Err(StartupError::MissingFeature(f)) if f == "AMT_CREDIT"
        ));
    }

    #[test]
    fn test_get_record() {
        let service = service();
        let record = service.get_record(100001).unwrap();
        assert_eq!(record.get("AMT_CREDIT"), Some(&json!(500000)));
        assert!(matches!(service.get_record(1), Err(ApiError::ClientNotFound(1))));
    }

    #[test]
    fn test_get_first_uses_sample_size() {
        let service = service();
        assert_eq!(service.get_first().len(), 2);
        assert_eq!(service.get_sample(10).len(), 3);
    }

    #[test]
    fn test_get_column() {
        let service = service();
        assert_eq!(service.get_column("EXT_SOURCE_2").unwrap().len(), 2);
        assert!(matches!(
            service.get_column("NOPE"),
            Err(ApiError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_predict_is_deterministic_probability() {
        let service = service();
        let first = service.predict(100001).unwrap();
        let second = service.predict(100001).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.id_client, 100001);
        assert_eq!(first.prediction.len(), 1);
        assert!((0.0..=1.0).contains(&first.prediction[0]));
    }

    #[test]
    fn test_predict_unknown_client() {
        assert!(matches!(
            service().predict(999999),
            Err(ApiError::ClientNotFound(999999))
        ));
    }

    #[test]
    fn test_predict_custom_changes_score_not_table() {
        let service = service();
        let baseline = service.predict(100001).unwrap().prediction[0];

        let mut modifications = BTreeMap::new();
        modifications.insert("AMT_CREDIT".to_string(), 2_000_000.0);
        let custom = service.predict_custom(100001, &modifications).unwrap().prediction[0];

        assert!(custom > baseline);
        assert_eq!(service.predict(100001).unwrap().prediction[0], baseline);
        assert_eq!(
            service.get_record(100001).unwrap().get("AMT_CREDIT"),
            Some(&json!(500000))
        );
    }

    #[test]
    fn test_predict_custom_validation() {
        let service = service();

        let mut unknown = BTreeMap::new();
        unknown.insert("NOPE".to_string(), 1.0);
        assert!(matches!(
            service.predict_custom(100001, &unknown),
            Err(ApiError::Validation(_))
        ));

        let mut non_finite = BTreeMap::new();
        non_finite.insert("AMT_CREDIT".to_string(), f64::INFINITY);
        assert!(matches!(
            service.predict_custom(100001, &non_finite),
            Err(ApiError::Validation(_))
        ));

        let empty = BTreeMap::new();
        assert!(matches!(
            service.predict_custom(42, &empty),
            Err(ApiError::ClientNotFound(42))
        ));
    }

    #[test]
    fn test_predict_custom_overflowing_override_is_validation() {
        let service = service();

        let mut huge = BTreeMap::new();
        huge.insert("EXT_SOURCE_2".to_string(), 1.7e308);
        match service.predict_custom(100001, &huge) {
            Err(ApiError::Validation(detail)) => assert!(detail.contains("EXT_SOURCE_2")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
