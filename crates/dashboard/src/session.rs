//! Dashboard Session State

use crate::client::{PredictionResult, Record};
use crate::DashboardError;
use std::collections::BTreeMap;

/// Variables the user may override for a what-if re-scoring
pub const MODIFIABLE_VARS: [&str; 9] = [
    "AMT_CREDIT",
    "DAYS_BIRTH",
    "AMT_ANNUITY",
    "AMT_GOODS_PRICE",
    "DAYS_EMPLOYED",
    "DAYS_ID_PUBLISH",
    "DAYS_LAST_PHONE_CHANGE",
    "DAYS_REGISTRATION",
    "AMT_INCOME_TOTAL",
];

/// Variables offered for population comparison
pub const VARIABLES_TO_PLOT: [&str; 14] = [
    "EXT_SOURCE_1",
    "EXT_SOURCE_2",
    "EXT_SOURCE_3",
    "AMT_CREDIT",
    "DAYS_BIRTH",
    "AMT_ANNUITY",
    "AMT_GOODS_PRICE",
    "DAYS_EMPLOYED",
    "DAYS_ID_PUBLISH",
    "DAYS_LAST_PHONE_CHANGE",
    "DAYS_REGISTRATION",
    "AMT_INCOME_TOTAL",
    "REGION_POPULATION_RELATIVE",
    "NAME_CONTRACT_TYPE",
];

/// What the user is looking at
#[derive(Debug, Default, Clone)]
pub struct Session {
    /// Client id currently selected for actions
    selected: Option<i64>,
    /// Last successfully loaded client and record
    loaded: Option<(i64, Record)>,
    /// Last real prediction and the client it belongs to
    prediction: Option<(i64, PredictionResult)>,
    /// Last what-if result, kept apart from the real prediction
    simulation: Option<(i64, PredictionResult)>,
}

impl Session {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a client for subsequent actions
    pub fn select(&mut self, client_id: i64) {
        self.selected = Some(client_id);
    }

    /// Currently selected client
    pub fn selected(&self) -> Option<i64> {
        self.selected
    }

    /// Record a successful load
    pub fn set_loaded(&mut self, client_id: i64, record: Record) {
        if self.loaded.as_ref().map(|(id, _)| *id) != Some(client_id) {
            self.simulation = None;
        }
        self.loaded = Some((client_id, record));
    }

    /// Hide the loaded client (the selected id does not exist)
    pub fn clear_loaded(&mut self) {
        self.loaded = None;
        self.simulation = None;
    }

    /// Loaded client id and record
    pub fn loaded(&self) -> Option<(i64, &Record)> {
        self.loaded.as_ref().map(|(id, record)| (*id, record))
    }

    /// Store a real prediction for `client_id`
    pub fn set_prediction(&mut self, client_id: i64, result: PredictionResult) {
        self.prediction = Some((client_id, result));
    }

    /// Stored prediction, only if it belongs to `client_id`
    pub fn prediction_for(&self, client_id: i64) -> Option<&PredictionResult> {
        self.prediction
            .as_ref()
            .filter(|(id, _)| *id == client_id)
            .map(|(_, result)| result)
    }

    /// Store a what-if prediction
    pub fn set_simulation(&mut self, client_id: i64, result: PredictionResult) {
        self.simulation = Some((client_id, result));
    }

    /// Last what-if prediction for the loaded client
    pub fn simulation(&self) -> Option<&PredictionResult> {
        let loaded = self.loaded.as_ref().map(|(id, _)| *id)?;
        self.simulation
            .as_ref()
            .filter(|(id, _)| *id == loaded)
            .map(|(_, result)| result)
    }
}

/// Diff user edits against a record.
///
/// Only allow-listed variables may be edited; an edit naming anything else
/// is rejected. Returns only the fields whose value actually changes, with a
/// missing original counting as 0.
pub fn compute_modifications(
    record: &Record,
    edits: &BTreeMap<String, f64>,
) -> Result<BTreeMap<String, f64>, DashboardError> {
    if let Some(name) = edits.keys().find(|k| !MODIFIABLE_VARS.contains(&k.as_str())) {
        return Err(DashboardError::NotAllowed(name.clone()));
    }

    Ok(edits
        .iter()
        .filter(|(name, value)| {
            let original = record.get(name.as_str()).and_then(|v| v.as_f64()).unwrap_or(0.0);
            **value != original
        })
        .map(|(name, value)| (name.clone(), *value))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> Record {
        json!({"SK_ID_CURR": 100001, "AMT_CREDIT": 500000, "DAYS_BIRTH": -12000.0})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn prediction(id: i64, p: f64) -> PredictionResult {
        PredictionResult {
            id_client: id,
            prediction: vec![p],
        }
    }

    #[test]
    fn test_prediction_only_reused_for_same_client() {
        let mut session = Session::new();
        session.set_prediction(100001, prediction(100001, 0.3));

        assert!(session.prediction_for(100001).is_some());
        assert!(session.prediction_for(100002).is_none());
    }

    #[test]
    fn test_simulation_scoped_to_loaded_client() {
        let mut session = Session::new();
        session.set_loaded(100001, record());
        session.set_simulation(100001, prediction(100001, 0.8));
        assert!(session.simulation().is_some());

        session.set_loaded(100002, record());
        assert!(session.simulation().is_none());
    }

    #[test]
    fn test_clear_loaded_keeps_selection() {
        let mut session = Session::new();
        session.select(5);
        session.set_loaded(5, record());
        session.clear_loaded();

        assert!(session.loaded().is_none());
        assert_eq!(session.selected(), Some(5));
    }

    #[test]
    fn test_modifications_only_changed_fields() {
        let mut edits = BTreeMap::new();
        edits.insert("AMT_CREDIT".to_string(), 500000.0);
        edits.insert("DAYS_BIRTH".to_string(), -15000.0);

        let mods = compute_modifications(&record(), &edits).unwrap();
        assert_eq!(mods.len(), 1);
        assert_eq!(mods.get("DAYS_BIRTH"), Some(&-15000.0));
    }

    #[test]
    fn test_modifications_missing_original_counts_as_zero() {
        let mut edits = BTreeMap::new();
        edits.insert("AMT_ANNUITY".to_string(), 0.0);
        assert!(compute_modifications(&record(), &edits).unwrap().is_empty());

        edits.insert("AMT_ANNUITY".to_string(), 1200.0);
        assert_eq!(compute_modifications(&record(), &edits).unwrap().len(), 1);
    }

    #[test]
    fn test_modifications_reject_non_allowed() {
        let mut edits = BTreeMap::new();
        edits.insert("EXT_SOURCE_1".to_string(), 0.9);
        assert!(matches!(
            compute_modifications(&record(), &edits),
            Err(DashboardError::NotAllowed(name)) if name == "EXT_SOURCE_1"
        ));
    }
}
