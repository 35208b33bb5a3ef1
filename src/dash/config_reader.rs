use crate::dash::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSettings {
    pub title: String,
    /// Number of states in the table of the selected metric (default 10)
    #[serde(rename = "topN")]
    pub top_n: Option<usize>,
    /// Number of priority states (default 5)
    #[serde(rename = "priorityN")]
    pub priority_n: Option<usize>,
    #[serde(rename = "defaultMetric")]
    pub default_metric: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MetricEntry {
    pub name: String,
    pub label: Option<String>,
    pub unit: Option<String>,
    /// `higherIsWorse` or `higherIsBetter`
    pub polarity: String,
    /// `health` or `foodAccess`
    pub source: String,
}

impl MetricEntry {
    pub fn to_definition(&self) -> DashResult<MetricDefinition> {
        let polarity = match self.polarity.as_str() {
            "higherIsWorse" => Polarity::HigherIsWorse,
            "higherIsBetter" => Polarity::HigherIsBetter,
            x => whatever!("metric {}: unknown polarity {:?}", self.name, x),
        };
        let source = match self.source.as_str() {
            "health" => MetricSource::Health,
            "foodAccess" => MetricSource::FoodAccess,
            x => whatever!("metric {}: unknown source {:?}", self.name, x),
        };
        Ok(MetricDefinition {
            name: self.name.clone(),
            label: self.label.clone().unwrap_or_else(|| self.name.clone()),
            unit: self.unit.clone().unwrap_or_default(),
            polarity,
            source,
        })
    }
}

/// A metric read from a column of a source.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MetricColumn {
    pub metric: String,
    /// The header of the column. Defaults to the name of the metric.
    pub column: Option<String>,
}

impl MetricColumn {
    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(self.metric.as_str())
    }
}

/// A demographic category read from a column of a source.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownColumn {
    pub dimension: String,
    pub category: String,
    pub column: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    /// `csv` or `xlsx`
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "stateColumn")]
    pub state_column: String,
    pub delimiter: Option<String>,
    #[serde(rename = "worksheetName")]
    pub worksheet_name: Option<String>,
    #[serde(rename = "missingLabels")]
    pub missing_labels: Option<Vec<String>>,
    pub metrics: Vec<MetricColumn>,
    #[serde(default)]
    pub breakdowns: Vec<BreakdownColumn>,
}

pub const DEFAULT_MISSING_LABELS: [&str; 5] = ["NA", "N/A", "null", "-", "--"];

impl FileSource {
    /// Blank cells are always missing. The other labels are compared without case.
    pub fn is_missing_label(&self, content: &str) -> bool {
        let c = content.trim();
        if c.is_empty() {
            return true;
        }
        match &self.missing_labels {
            Some(labels) => labels.iter().any(|l| l.trim().eq_ignore_ascii_case(c)),
            None => DEFAULT_MISSING_LABELS
                .iter()
                .any(|l| l.eq_ignore_ascii_case(c)),
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DashConfig {
    pub dashboard: DashboardSettings,
    pub metrics: Vec<MetricEntry>,
    pub sources: Vec<FileSource>,
    /// Metric name -> weight. If not provided, all the metrics have the same weight.
    pub weights: Option<BTreeMap<String, f64>>,
    #[serde(rename = "statesOnly")]
    pub states_only: Option<bool>,
    /// The metrics averaged over the priority states. Defaults to all the metrics.
    #[serde(rename = "impactMetrics")]
    pub impact_metrics: Option<Vec<String>>,
    /// The demographic dimension averaged over the priority states.
    #[serde(rename = "impactDimension")]
    pub impact_dimension: Option<String>,
}

impl DashConfig {
    pub fn registry(&self) -> DashResult<MetricRegistry> {
        let mut defs: Vec<MetricDefinition> = Vec::new();
        for m in self.metrics.iter() {
            defs.push(m.to_definition()?);
        }
        MetricRegistry::new(defs).context(InvalidConfigSnafu {})
    }

    pub fn top_n(&self) -> usize {
        self.dashboard.top_n.unwrap_or(10)
    }

    pub fn priority_n(&self) -> usize {
        self.dashboard.priority_n.unwrap_or(5)
    }
}

pub fn read_config(path: &str) -> DashResult<DashConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: DashConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// Reads a reference summary, as written with the `--out` option.
pub fn read_summary(path: &str) -> DashResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}
