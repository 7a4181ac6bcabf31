//! Client Record

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered mapping of column name to value
pub type Fields = serde_json::Map<String, Value>;

/// One row of the feature table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientRecord {
    fields: Fields,
}

impl ClientRecord {
    /// Wrap an ordered field set
    pub fn new(fields: Fields) -> Self {
        Self { fields }
    }

    /// Get a field by column name
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Get a field as a number; booleans read as 1/0
    pub fn get_f64(&self, column: &str) -> Option<f64> {
        match self.fields.get(column)? {
            Value::Number(n) => n.as_f64(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Coerced client id stored under `id_column`
    pub fn client_id(&self, id_column: &str) -> Option<i64> {
        self.fields.get(id_column).and_then(coerce_client_id)
    }

    /// Borrow all fields
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Consume into the field set
    pub fn into_fields(self) -> Fields {
        self.fields
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }
}

impl From<Fields> for ClientRecord {
    fn from(fields: Fields) -> Self {
        Self::new(fields)
    }
}

/// Coerce a raw identifier value to an integer.
///
/// Accepts integers, integral floats and strings holding either. Anything
/// else (null, fractional, non-numeric text) yields `None`, which lookups
/// treat as "never matches".
pub fn coerce_client_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral_f64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral_f64))
        }
        _ => None,
    }
}

fn integral_f64(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_integer_forms() {
        assert_eq!(coerce_client_id(&json!(100001)), Some(100001));
        assert_eq!(coerce_client_id(&json!(100001.0)), Some(100001));
        assert_eq!(coerce_client_id(&json!("100001")), Some(100001));
        assert_eq!(coerce_client_id(&json!(" 100001.0 ")), Some(100001));
    }

    #[test]
    fn test_coerce_rejects_non_ids() {
        assert_eq!(coerce_client_id(&json!(null)), None);
        assert_eq!(coerce_client_id(&json!("abc")), None);
        assert_eq!(coerce_client_id(&json!(1.5)), None);
        assert_eq!(coerce_client_id(&json!(true)), None);
        assert_eq!(coerce_client_id(&json!([1])), None);
    }

    #[test]
    fn test_get_f64() {
        let record: ClientRecord = serde_json::from_value(json!({
            "AMT_CREDIT": 500000,
            "FLAG_OWN_CAR": true,
            "EXT": "0.5",
            "NAME": "Cash loans",
        }))
        .unwrap();

        assert_eq!(record.get_f64("AMT_CREDIT"), Some(500000.0));
        assert_eq!(record.get_f64("FLAG_OWN_CAR"), Some(1.0));
        assert_eq!(record.get_f64("EXT"), Some(0.5));
        assert_eq!(record.get_f64("NAME"), None);
        assert_eq!(record.get_f64("MISSING"), None);
    }

    #[test]
    fn test_serializes_transparently_in_order() {
        let record: ClientRecord =
            serde_json::from_str(r#"{"SK_ID_CURR":1,"B":2,"A":3}"#).unwrap();
        let out = serde_json::to_string(&record).unwrap();
        assert_eq!(out, r#"{"SK_ID_CURR":1,"B":2,"A":3}"#);
    }
}
