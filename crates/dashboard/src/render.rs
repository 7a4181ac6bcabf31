//! Terminal Rendering
//!
//! Plain-text views of the dashboard state: risk band, client profile,
//! population histogram, local importances and the raw record.

use crate::client::{PredictionResult, Record};
use crate::dashboard::Comparison;
use crate::importances::FeatureImportance;
use crate::DashboardError;
use serde_json::Value;
use std::fmt::Write;

/// Bins used for population comparison
pub const HISTOGRAM_BINS: usize = 30;

/// Width of the longest bar in characters
const BAR_WIDTH: usize = 40;

/// Risk classification of a default probability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskBand {
    Solvent,
    SolventToReview,
    InsolventToReview,
    Insolvent,
}

impl RiskBand {
    /// Classify a score with the 0.70 / 0.78 / 0.85 thresholds
    pub fn from_score(score: f64) -> Self {
        if score < 0.70 {
            RiskBand::Solvent
        } else if score < 0.78 {
            RiskBand::SolventToReview
        } else if score < 0.85 {
            RiskBand::InsolventToReview
        } else {
            RiskBand::Insolvent
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskBand::Solvent => "solvent",
            RiskBand::SolventToReview => "solvent, to review",
            RiskBand::InsolventToReview => "insolvent, to review",
            RiskBand::Insolvent => "insolvent",
        }
    }
}

/// Score line with its risk band
pub fn render_prediction(result: &PredictionResult) -> String {
    match result.score() {
        Some(score) => format!(
            "Client {}: score {:.3} ({})",
            result.id_client,
            score,
            RiskBand::from_score(score).label()
        ),
        None => format!("Client {}: no score returned", result.id_client),
    }
}

fn number(record: &Record, field: &str) -> Option<f64> {
    match record.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn flag(record: &Record, field: &str) -> &'static str {
    match number(record, field) {
        Some(v) if v != 0.0 => "yes",
        _ => "no",
    }
}

fn amount(record: &Record, field: &str) -> String {
    number(record, field)
        .map(|v| group_thousands(v.trunc() as i64))
        .unwrap_or_else(|| "n/a".to_string())
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if value < 0 {
        grouped.insert(0, '-');
    }
    grouped
}

/// Age in whole years from `DAYS_BIRTH` (days before application, negative)
pub fn age_years(days_birth: f64) -> i64 {
    (-days_birth / 365.0).trunc() as i64
}

/// Client summary card
pub fn render_profile(client_id: i64, record: &Record) -> String {
    let mut out = String::new();
    let age = number(record, "DAYS_BIRTH")
        .map(|d| format!("{} years", age_years(d)))
        .unwrap_or_else(|| "n/a".to_string());
    let children = number(record, "CNT_CHILDREN")
        .map(|c| (c.trunc() as i64).to_string())
        .unwrap_or_else(|| "n/a".to_string());
    let family = if flag(record, "NAME_FAMILY_STATUS_Married") == "yes" {
        "married"
    } else {
        "other"
    };
    let housing = if flag(record, "NAME_HOUSING_TYPE_House / apartment") == "yes" {
        "house / apartment"
    } else {
        "other"
    };

    let _ = writeln!(out, "Client #{}", client_id);
    let _ = writeln!(out, "  Personal");
    let _ = writeln!(out, "    Age             {}", age);
    let _ = writeln!(out, "    Annual income   {}", amount(record, "AMT_INCOME_TOTAL"));
    let _ = writeln!(out, "    Children        {}", children);
    let _ = writeln!(out, "    Family status   {}", family);
    let _ = writeln!(out, "  Credit");
    let _ = writeln!(out, "    Amount          {}", amount(record, "AMT_CREDIT"));
    let _ = writeln!(out, "    Annuity         {}", amount(record, "AMT_ANNUITY"));
    let _ = writeln!(out, "    Goods price     {}", amount(record, "AMT_GOODS_PRICE"));
    let _ = writeln!(out, "  Other");
    let _ = writeln!(out, "    Owns car        {}", flag(record, "FLAG_OWN_CAR"));
    let _ = writeln!(out, "    Owns realty     {}", flag(record, "FLAG_OWN_REALTY"));
    let _ = write!(out, "    Housing         {}", housing);
    out
}

/// Equal-width histogram over finite values
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bin `values` into `bins` buckets; None when there is nothing to bin
    pub fn new(values: &[f64], bins: usize) -> Option<Self> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() || bins == 0 {
            return None;
        }

        let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut histogram = Self {
            min,
            max,
            counts: vec![0; bins],
        };
        for value in finite {
            if let Some(bin) = histogram.bin_of(value) {
                histogram.counts[bin] += 1;
            }
        }
        Some(histogram)
    }

    /// Bin holding `value`; the maximum falls in the last bin
    pub fn bin_of(&self, value: f64) -> Option<usize> {
        if !value.is_finite() || value < self.min || value > self.max {
            return None;
        }
        let bins = self.counts.len();
        let width = (self.max - self.min) / bins as f64;
        if width == 0.0 {
            return Some(0);
        }
        let bin = ((value - self.min) / width) as usize;
        Some(bin.min(bins - 1))
    }

    pub fn bin_range(&self, bin: usize) -> (f64, f64) {
        let width = (self.max - self.min) / self.counts.len() as f64;
        let start = self.min + width * bin as f64;
        (start, start + width)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Population histogram with the client's bin marked
pub fn render_comparison(comparison: &Comparison) -> String {
    if let Some(category) = &comparison.client_category {
        return render_categories(comparison, category);
    }
    let Some(client_value) = comparison.client_value else {
        return format!("Warning: missing value for variable {}", comparison.variable);
    };
    let Some(histogram) = Histogram::new(&comparison.population, HISTOGRAM_BINS) else {
        return format!("Warning: data unavailable for variable {}", comparison.variable);
    };

    let client_bin = histogram.bin_of(client_value);
    let peak = histogram.counts.iter().copied().max().unwrap_or(0).max(1);

    let mut out = String::new();
    let _ = writeln!(out, "Distribution of {}", comparison.variable);
    let _ = writeln!(out, "Client value: {}", client_value);
    for (bin, count) in histogram.counts.iter().enumerate() {
        let (start, end) = histogram.bin_range(bin);
        let bar = "#".repeat(count * BAR_WIDTH / peak);
        let marker = if client_bin == Some(bin) { "  <- client" } else { "" };
        let _ = writeln!(
            out,
            "{:>14.4} .. {:<14.4} |{:<width$}| {}{}",
            start,
            end,
            bar,
            count,
            marker,
            width = BAR_WIDTH
        );
    }
    if client_bin.is_none() {
        let _ = writeln!(out, "Client value lies outside the population range");
    }
    let _ = write!(out, "{} values", histogram.total());
    out
}

fn render_categories(comparison: &Comparison, client_category: &str) -> String {
    if comparison.categories.is_empty() {
        return format!("Warning: data unavailable for variable {}", comparison.variable);
    }
    let peak = comparison.categories.iter().map(|(_, n)| *n).max().unwrap_or(0).max(1);
    let name_width = comparison.categories.iter().map(|(c, _)| c.len()).max().unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "Categories of {}", comparison.variable);
    let _ = writeln!(out, "Client value: {}", client_category);
    for (category, count) in &comparison.categories {
        let bar = "#".repeat(count * BAR_WIDTH / peak);
        let marker = if category == client_category { "  <- client" } else { "" };
        let _ = writeln!(
            out,
            "{:<name_width$} |{:<width$}| {}{}",
            category,
            bar,
            count,
            marker,
            width = BAR_WIDTH
        );
    }
    let total: usize = comparison.categories.iter().map(|(_, n)| n).sum();
    let _ = write!(out, "{} values", total);
    out
}

/// Signed horizontal bar chart of local importances
pub fn render_importances(client_id: i64, features: &[FeatureImportance]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Local importance for client {}", client_id);

    let peak = features
        .iter()
        .map(|f| f.importance.abs())
        .fold(0.0_f64, f64::max);
    let name_width = features.iter().map(|f| f.feature.len()).max().unwrap_or(0);
    let half = BAR_WIDTH / 2;

    for feature in features {
        let len = if peak > 0.0 {
            ((feature.importance.abs() / peak) * half as f64).round() as usize
        } else {
            0
        };
        let (left, right) = if feature.importance < 0.0 {
            (format!("{:>half$}", "-".repeat(len)), String::new())
        } else {
            (" ".repeat(half), "+".repeat(len))
        };
        let _ = writeln!(
            out,
            "{:<name_width$}  {}|{:<half$} {:+.4}",
            feature.feature,
            left,
            right,
            feature.importance
        );
    }
    let _ = write!(out, "(+ raises the default risk, - lowers it)");
    out
}

/// Pretty JSON of the loaded record
pub fn render_raw(record: &Record) -> Result<String, DashboardError> {
    serde_json::to_string_pretty(record).map_err(|e| DashboardError::Decode(e.to_string()))
}
