// ********* Input data structures ***********

use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::Display;

use crate::states::StateCode;

/// Whether a high raw value is a bad or a good outcome.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Polarity {
    HigherIsWorse,
    HigherIsBetter,
}

/// Where a metric comes from. It only matters for grouping in displays.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum MetricSource {
    Health,
    FoodAccess,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MetricDefinition {
    /// The key used in queries and weights, for example `OBESITY_CrudePrev`.
    pub name: String,
    /// A human-readable name, for example `Obesity Prevalence`.
    pub label: String,
    pub unit: String,
    pub polarity: Polarity,
    pub source: MetricSource,
}

impl MetricDefinition {
    pub fn new(name: &str, polarity: Polarity, source: MetricSource) -> MetricDefinition {
        MetricDefinition {
            name: name.to_string(),
            label: name.to_string(),
            unit: "%".to_string(),
            polarity,
            source,
        }
    }
}

/// The value of one metric for one state.
///
/// A missing value is never treated as zero: it is excluded from the
/// rankings and normalizations of that metric.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum MetricValue {
    Present(f64),
    Missing,
}

impl MetricValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            MetricValue::Present(x) => Some(*x),
            MetricValue::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, MetricValue::Missing)
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(x: Option<f64>) -> Self {
        match x {
            Some(v) => MetricValue::Present(v),
            None => MetricValue::Missing,
        }
    }
}

/// Index of a metric inside a [`MetricRegistry`].
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub(crate) struct MetricId(pub(crate) usize);

/// The set of metrics known to a session.
///
/// Names are resolved once to fixed positions, so the state records all have
/// the same shape.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MetricRegistry {
    definitions: Vec<MetricDefinition>,
    by_name: HashMap<String, MetricId>,
}

impl MetricRegistry {
    pub fn new(definitions: Vec<MetricDefinition>) -> Result<MetricRegistry, ConfigError> {
        if definitions.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }
        let mut by_name: HashMap<String, MetricId> = HashMap::new();
        for (idx, def) in definitions.iter().enumerate() {
            if by_name.insert(def.name.clone(), MetricId(idx)).is_some() {
                return Err(ConfigError::DuplicateMetric(def.name.clone()));
            }
        }
        Ok(MetricRegistry {
            definitions,
            by_name,
        })
    }

    pub fn definitions(&self) -> &[MetricDefinition] {
        &self.definitions
    }

    pub fn get(&self, name: &str) -> Option<&MetricDefinition> {
        self.id(name).map(|id| &self.definitions[id.0])
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub(crate) fn id(&self, name: &str) -> Option<MetricId> {
        self.by_name.get(name).cloned()
    }

    pub(crate) fn definition(&self, id: MetricId) -> &MetricDefinition {
        &self.definitions[id.0]
    }
}

// ********* Configuration **********

/// Relative importance of each metric in a composite score.
///
/// Weights are validated at construction: every metric must be known to the
/// registry, every weight must be finite and non-negative, and at least one
/// weight must be positive. Only the ratios between weights matter.
///
/// The metrics are kept by name, so a session resolves them against its own
/// registry when computing scores.
#[derive(PartialEq, Debug, Clone)]
pub struct Weights {
    // In the order of the registry the weights were built from.
    entries: Vec<(String, f64)>,
}

impl Weights {
    pub fn new(registry: &MetricRegistry, weights: &[(String, f64)]) -> Result<Weights, ConfigError> {
        let mut by_id: BTreeMap<MetricId, f64> = BTreeMap::new();
        for (name, w) in weights.iter() {
            let id = registry
                .id(name)
                .ok_or_else(|| ConfigError::UnknownMetric(name.clone()))?;
            if !w.is_finite() || *w < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    metric: name.clone(),
                    weight: *w,
                });
            }
            // The last weight given for a metric is the one kept.
            by_id.insert(id, *w);
        }
        if !by_id.values().any(|w| *w > 0.0) {
            return Err(ConfigError::NoPositiveWeight);
        }
        Ok(Weights {
            entries: by_id
                .into_iter()
                .map(|(id, w)| (registry.definition(id).name.clone(), w))
                .collect(),
        })
    }

    /// The same weight for each of the given metrics.
    pub fn equal(registry: &MetricRegistry, metrics: &[String]) -> Result<Weights, ConfigError> {
        let pairs: Vec<(String, f64)> = metrics.iter().map(|m| (m.clone(), 1.0)).collect();
        Weights::new(registry, &pairs)
    }

    /// The same weight for every metric of the registry.
    pub fn uniform(registry: &MetricRegistry) -> Weights {
        Weights {
            entries: registry
                .definitions()
                .iter()
                .map(|d| (d.name.clone(), 1.0))
                .collect(),
        }
    }

    /// The metrics with a strictly positive weight.
    pub(crate) fn active(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries
            .iter()
            .filter(|(_, w)| *w > 0.0)
            .map(|(name, w)| (name.as_str(), *w))
    }

    /// The weights as (metric name, weight) pairs.
    pub fn to_named(&self) -> Vec<(String, f64)> {
        self.entries.clone()
    }
}

// ******** Output data structures *********

/// States ordered from worst to best for one metric.
#[derive(PartialEq, Debug, Clone)]
pub struct Ranking {
    pub metric: String,
    pub entries: Vec<(StateCode, f64)>,
    /// The states known to the session that have no value for this metric.
    pub excluded: Vec<StateCode>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct CompositeScore {
    pub state: StateCode,
    /// In [0, 1], 1.0 being the worst. `None` if the state has no value for
    /// any of the weighted metrics.
    pub score: Option<f64>,
    /// True when some weighted metrics were missing for this state and the
    /// score was computed over the others only.
    pub partial: bool,
    /// The weighted metrics that contributed to the score.
    pub metrics_used: Vec<String>,
    /// The weighted metrics for which all the states share the same value.
    /// They contribute 0.0 to every score.
    pub flat_metrics: Vec<String>,
}

impl CompositeScore {
    pub fn no_discrimination(&self) -> bool {
        !self.flat_metrics.is_empty()
    }
}

/// Descriptive statistics over the non-missing values of a metric.
#[derive(PartialEq, Debug, Clone)]
pub struct MetricSummary {
    pub metric: String,
    pub count: usize,
    pub missing: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// The mean of a value over a group of states.
#[derive(PartialEq, Debug, Clone)]
pub struct GroupAverage {
    pub name: String,
    pub mean: Option<f64>,
    /// How many states of the group had a value.
    pub contributors: usize,
}

/// Non-fatal problems found while loading the data.
#[derive(PartialEq, Debug, Clone)]
pub enum ValidationWarning {
    UnrecognizedState {
        source: String,
        line: u64,
        raw: String,
    },
    /// A valid jurisdiction that the session was configured to ignore.
    ExcludedJurisdiction {
        source: String,
        line: u64,
        state: StateCode,
    },
    MissingValue {
        source: String,
        line: u64,
        state: StateCode,
        field: String,
    },
    InvalidValue {
        source: String,
        line: u64,
        state: StateCode,
        field: String,
        value: f64,
    },
    DuplicateValue {
        source: String,
        line: u64,
        state: StateCode,
        field: String,
        previous: MetricValue,
        replacement: MetricValue,
    },
}

impl ValidationWarning {
    /// True for the warnings that caused a whole row to be dropped.
    pub fn drops_row(&self) -> bool {
        matches!(
            self,
            ValidationWarning::UnrecognizedState { .. }
                | ValidationWarning::ExcludedJurisdiction { .. }
        )
    }
}

impl Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationWarning::UnrecognizedState { source, line, raw } => {
                write!(f, "{}:{}: unrecognized state {:?}, row dropped", source, line, raw)
            }
            ValidationWarning::ExcludedJurisdiction {
                source,
                line,
                state,
            } => write!(f, "{}:{}: {} is not a state, row dropped", source, line, state),
            ValidationWarning::MissingValue {
                source,
                line,
                state,
                field,
            } => write!(f, "{}:{}: {}: no data for {}", source, line, state, field),
            ValidationWarning::InvalidValue {
                source,
                line,
                state,
                field,
                value,
            } => write!(
                f,
                "{}:{}: {}: invalid value {} for {}, treated as missing",
                source, line, state, value, field
            ),
            ValidationWarning::DuplicateValue {
                source,
                line,
                state,
                field,
                previous,
                replacement,
            } => write!(
                f,
                "{}:{}: {}: duplicate value for {} ({:?} replaced by {:?})",
                source, line, state, field, previous, replacement
            ),
        }
    }
}

/// Errors returned by the queries of a session.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum QueryError {
    UnknownMetric(String),
    UnknownState(String),
}

impl Error for QueryError {}

impl Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::UnknownMetric(m) => write!(f, "unknown metric: {}", m),
            QueryError::UnknownState(s) => write!(f, "unknown state: {}", s),
        }
    }
}

/// Errors in the definitions of the metrics or of the weights.
#[derive(PartialEq, Debug, Clone)]
pub enum ConfigError {
    EmptyRegistry,
    DuplicateMetric(String),
    UnknownMetric(String),
    InvalidWeight { metric: String, weight: f64 },
    NoPositiveWeight,
}

impl Error for ConfigError {}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EmptyRegistry => write!(f, "no metric defined"),
            ConfigError::DuplicateMetric(m) => write!(f, "metric defined twice: {}", m),
            ConfigError::UnknownMetric(m) => write!(f, "unknown metric: {}", m),
            ConfigError::InvalidWeight { metric, weight } => write!(
                f,
                "weight for {} must be a non-negative number, got {}",
                metric, weight
            ),
            ConfigError::NoPositiveWeight => write!(f, "at least one weight must be positive"),
        }
    }
}
