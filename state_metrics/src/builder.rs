pub use crate::config::*;

use log::{debug, warn};
use std::collections::BTreeMap;

use crate::states::{JurisdictionKind, StateCode};
use crate::{Session, StateRecord};

/// One row of a source table, as produced by the file readers.
///
/// Values are already converted to numbers: `None` marks a blank or
/// explicitly missing cell.
#[derive(PartialEq, Debug, Clone)]
pub struct ParsedRow {
    /// The file the row comes from.
    pub source: String,
    /// Line number in the file, starting at 1 with the header.
    pub line: u64,
    /// The raw content of the state column.
    pub state: String,
    /// (metric name, value)
    pub values: Vec<(String, Option<f64>)>,
    /// (dimension, category, value)
    pub breakdowns: Vec<(String, String, Option<f64>)>,
}

/// Assembles a [`Session`] from parsed rows.
///
/// The builder performs all the business validation of the loaded data.
/// None of the problems it finds is fatal: they are recorded as
/// [`ValidationWarning`]s and returned with the session.
///
/// ```
/// use state_metrics::builder::{ParsedRow, SessionBuilder};
/// use state_metrics::{MetricDefinition, MetricRegistry, MetricSource, Polarity};
///
/// let registry = MetricRegistry::new(vec![MetricDefinition::new(
///     "obesity",
///     Polarity::HigherIsWorse,
///     MetricSource::Health,
/// )])?;
/// let mut builder = SessionBuilder::new(registry);
/// builder.add_row(&ParsedRow {
///     source: "health.csv".to_string(),
///     line: 2,
///     state: "MS".to_string(),
///     values: vec![("obesity".to_string(), Some(40.1))],
///     breakdowns: vec![],
/// })?;
/// let (session, warnings) = builder.build();
/// assert_eq!(session.states().len(), 1);
/// assert!(warnings.is_empty());
/// # Ok::<(), state_metrics::ConfigError>(())
/// ```
pub struct SessionBuilder {
    registry: MetricRegistry,
    states_only: bool,
    records: BTreeMap<StateCode, StateRecord>,
    warnings: Vec<ValidationWarning>,
}

impl SessionBuilder {
    pub fn new(registry: MetricRegistry) -> SessionBuilder {
        SessionBuilder {
            registry,
            states_only: false,
            records: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    /// If set, only the 50 states are kept. Rows for the District of
    /// Columbia and the territories are dropped with a warning.
    pub fn states_only(self, states_only: bool) -> SessionBuilder {
        SessionBuilder {
            states_only,
            ..self
        }
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Adds a row to the session.
    ///
    /// The only error is a metric name that is not part of the registry,
    /// which is a problem of configuration and not of data.
    pub fn add_row(&mut self, row: &ParsedRow) -> Result<(), ConfigError> {
        // Resolve the names first so that a bad configuration leaves nothing behind.
        let mut resolved: Vec<(MetricId, &String, Option<f64>)> = Vec::new();
        for (name, v) in row.values.iter() {
            let id = self
                .registry
                .id(name)
                .ok_or_else(|| ConfigError::UnknownMetric(name.clone()))?;
            resolved.push((id, name, *v));
        }

        let state = match StateCode::parse(&row.state) {
            Some(s) => s,
            None => {
                self.push_warning(ValidationWarning::UnrecognizedState {
                    source: row.source.clone(),
                    line: row.line,
                    raw: row.state.clone(),
                });
                return Ok(());
            }
        };
        if self.states_only && state.kind() != JurisdictionKind::State {
            self.push_warning(ValidationWarning::ExcludedJurisdiction {
                source: row.source.clone(),
                line: row.line,
                state,
            });
            return Ok(());
        }

        debug!("add_row: {}:{} state {}", row.source, row.line, state);
        // A row without any value still makes the state part of the session.
        self.record_mut(state);

        for (id, name, raw) in resolved {
            let value = self.validate_value(row, state, name, raw);
            let record = self.record_mut(state);
            let previous = record.values[id.0];
            let seen = record.seen[id.0];
            record.values[id.0] = value;
            record.seen[id.0] = true;
            if seen {
                self.push_warning(ValidationWarning::DuplicateValue {
                    source: row.source.clone(),
                    line: row.line,
                    state,
                    field: name.clone(),
                    previous,
                    replacement: value,
                });
            }
        }

        for (dimension, category, raw) in row.breakdowns.iter() {
            let field = format!("{}/{}", dimension, category);
            let value = self.validate_value(row, state, &field, *raw);
            let previous = self
                .record_mut(state)
                .breakdowns
                .entry(dimension.clone())
                .or_default()
                .insert(category.clone(), value);
            if let Some(previous) = previous {
                self.push_warning(ValidationWarning::DuplicateValue {
                    source: row.source.clone(),
                    line: row.line,
                    state,
                    field,
                    previous,
                    replacement: value,
                });
            }
        }
        Ok(())
    }

    pub fn add_rows(&mut self, rows: &[ParsedRow]) -> Result<(), ConfigError> {
        for row in rows.iter() {
            self.add_row(row)?;
        }
        Ok(())
    }

    /// Freezes the data. The warnings are returned in the order they were found.
    pub fn build(self) -> (Session, Vec<ValidationWarning>) {
        let session = Session {
            registry: self.registry,
            records: self.records,
        };
        (session, self.warnings)
    }

    fn validate_value(
        &mut self,
        row: &ParsedRow,
        state: StateCode,
        field: &str,
        raw: Option<f64>,
    ) -> MetricValue {
        match raw {
            None => {
                self.push_warning(ValidationWarning::MissingValue {
                    source: row.source.clone(),
                    line: row.line,
                    state,
                    field: field.to_string(),
                });
                MetricValue::Missing
            }
            Some(x) if !x.is_finite() || x < 0.0 => {
                self.push_warning(ValidationWarning::InvalidValue {
                    source: row.source.clone(),
                    line: row.line,
                    state,
                    field: field.to_string(),
                    value: x,
                });
                MetricValue::Missing
            }
            Some(x) => MetricValue::Present(x),
        }
    }

    fn record_mut(&mut self, state: StateCode) -> &mut StateRecord {
        let num_metrics = self.registry.len();
        self.records
            .entry(state)
            .or_insert_with(|| StateRecord::empty(num_metrics))
    }

    fn push_warning(&mut self, w: ValidationWarning) {
        warn!("{}", w);
        self.warnings.push(w);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MetricRegistry {
        MetricRegistry::new(vec![
            MetricDefinition::new("health", Polarity::HigherIsWorse, MetricSource::Health),
            MetricDefinition::new("food", Polarity::HigherIsWorse, MetricSource::FoodAccess),
        ])
        .unwrap()
    }

    fn row(line: u64, state: &str, values: &[(&str, Option<f64>)]) -> ParsedRow {
        ParsedRow {
            source: "test.csv".to_string(),
            line,
            state: state.to_string(),
            values: values.iter().map(|(m, v)| (m.to_string(), *v)).collect(),
            breakdowns: vec![],
        }
    }

    #[test]
    fn drops_unrecognized_states() {
        let mut b = SessionBuilder::new(registry());
        b.add_row(&row(2, "AL", &[("health", Some(1.0))])).unwrap();
        b.add_row(&row(3, "ZZ", &[("health", Some(2.0))])).unwrap();
        b.add_row(&row(4, "", &[("health", Some(3.0))])).unwrap();
        let (session, warnings) = b.build();
        assert_eq!(session.states().len(), 1);
        assert_eq!(warnings.iter().filter(|w| w.drops_row()).count(), 2);
        assert!(matches!(
            &warnings[0],
            ValidationWarning::UnrecognizedState { line: 3, raw, .. } if raw == "ZZ"
        ));
    }

    #[test]
    fn states_only_drops_territories() {
        let mut b = SessionBuilder::new(registry()).states_only(true);
        b.add_row(&row(2, "PR", &[("health", Some(1.0))])).unwrap();
        b.add_row(&row(3, "DC", &[("health", Some(1.0))])).unwrap();
        b.add_row(&row(4, "OH", &[("health", Some(1.0))])).unwrap();
        let (session, warnings) = b.build();
        let states: Vec<&str> = session.states().iter().map(|s| s.as_str()).collect();
        assert_eq!(states, vec!["OH"]);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn missing_and_invalid_values() {
        let mut b = SessionBuilder::new(registry());
        b.add_row(&row(2, "AL", &[("health", None), ("food", Some(-1.0))]))
            .unwrap();
        let (session, warnings) = b.build();
        assert_eq!(session.value("AL", "health"), Ok(MetricValue::Missing));
        assert_eq!(session.value("AL", "food"), Ok(MetricValue::Missing));
        assert!(matches!(warnings[0], ValidationWarning::MissingValue { .. }));
        assert!(matches!(
            warnings[1],
            ValidationWarning::InvalidValue { value, .. } if value == -1.0
        ));
    }

    #[test]
    fn duplicates_keep_last_value() {
        let mut b = SessionBuilder::new(registry());
        b.add_row(&row(2, "AL", &[("health", Some(1.0))])).unwrap();
        b.add_row(&row(3, "al", &[("health", Some(5.0))])).unwrap();
        // A different metric for the same state is not a duplicate.
        b.add_row(&row(4, "AL", &[("food", Some(7.0))])).unwrap();
        let (session, warnings) = b.build();
        assert_eq!(session.value("AL", "health"), Ok(MetricValue::Present(5.0)));
        assert_eq!(session.value("AL", "food"), Ok(MetricValue::Present(7.0)));
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            ValidationWarning::DuplicateValue {
                line: 3,
                previous: MetricValue::Present(p),
                replacement: MetricValue::Present(r),
                ..
            } if *p == 1.0 && *r == 5.0
        ));
    }

    #[test]
    fn duplicate_breakdowns() {
        let mut b = SessionBuilder::new(registry());
        let mut r = row(2, "AL", &[]);
        r.breakdowns = vec![
            ("group".to_string(), "Seniors".to_string(), Some(2.0)),
            ("group".to_string(), "Seniors".to_string(), Some(3.0)),
        ];
        b.add_row(&r).unwrap();
        let (session, warnings) = b.build();
        let bd = session.breakdown("AL", "group").unwrap();
        assert_eq!(bd.get("Seniors"), Some(&MetricValue::Present(3.0)));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn unknown_metric_is_a_config_error() {
        let mut b = SessionBuilder::new(registry());
        let res = b.add_row(&row(2, "AL", &[("sleep", Some(1.0))]));
        assert_eq!(res, Err(ConfigError::UnknownMetric("sleep".to_string())));
        let (session, warnings) = b.build();
        assert!(session.states().is_empty());
        assert!(warnings.is_empty());
    }
}
