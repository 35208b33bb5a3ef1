/*!
Joins state-level health and food-access statistics and ranks the states.

The entry point is the [`builder::SessionBuilder`], which validates the rows
read from the source files and freezes them into an immutable [`Session`].
All the queries of the dashboard are then answered by the session:

* [`Session::metric_ranking`] orders the states from worst to best for one metric
* [`Session::composite_score`] combines several metrics with user-provided [`Weights`]
* [`Session::priority_states`] returns the states with the highest composite scores
* [`Session::breakdown`] returns the demographic split of a value for a state

See the [manual] for the details of the computations.
*/

mod config;

pub mod builder;
pub mod manual;
pub mod states;

use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};

pub use crate::config::*;
pub use crate::states::{Jurisdiction, JurisdictionKind, StateCode};

// **** Private structures ****

#[derive(PartialEq, Debug, Clone)]
pub(crate) struct StateRecord {
    // Indexed by MetricId.
    pub(crate) values: Vec<MetricValue>,
    // Whether a value (possibly missing) was already provided by a source.
    pub(crate) seen: Vec<bool>,
    // dimension -> category -> value
    pub(crate) breakdowns: BTreeMap<String, BTreeMap<String, MetricValue>>,
}

impl StateRecord {
    pub(crate) fn empty(num_metrics: usize) -> StateRecord {
        StateRecord {
            values: vec![MetricValue::Missing; num_metrics],
            seen: vec![false; num_metrics],
            breakdowns: BTreeMap::new(),
        }
    }
}

// Min-max normalization of one metric across all the states.
#[derive(PartialEq, Debug, Clone, Copy)]
struct Normalization {
    min: f64,
    max: f64,
    polarity: Polarity,
}

impl Normalization {
    fn is_flat(&self) -> bool {
        self.max <= self.min
    }

    // 1.0 is always the worst value.
    fn apply(&self, x: f64) -> f64 {
        if self.is_flat() {
            return 0.0;
        }
        let span = self.max - self.min;
        match self.polarity {
            Polarity::HigherIsWorse => (x - self.min) / span,
            Polarity::HigherIsBetter => (self.max - x) / span,
        }
    }
}

// The weighted metrics of a composite computation, with their normalization.
// Metrics without any value in the session have no normalization.
struct CompositePlan {
    terms: Vec<(MetricId, f64, Option<Normalization>)>,
    flat_metrics: Vec<String>,
}

/// The loaded data of a dashboard.
///
/// A session is immutable: it is created once by
/// [`builder::SessionBuilder::build`] and every query borrows it. It can be
/// shared between threads without synchronization.
#[derive(PartialEq, Debug, Clone)]
pub struct Session {
    pub(crate) registry: MetricRegistry,
    pub(crate) records: BTreeMap<StateCode, StateRecord>,
}

impl Session {
    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// The states with at least one row in the sources, in alphabetical order.
    pub fn states(&self) -> Vec<StateCode> {
        self.records.keys().cloned().collect()
    }

    /// All the demographic dimensions found in the sources.
    pub fn dimensions(&self) -> Vec<String> {
        let dims: BTreeSet<&String> = self
            .records
            .values()
            .flat_map(|r| r.breakdowns.keys())
            .collect();
        dims.into_iter().cloned().collect()
    }

    /// The value of a metric for a state.
    ///
    /// A valid state that does not appear in the sources has missing values.
    pub fn value(&self, state: &str, metric: &str) -> Result<MetricValue, QueryError> {
        let state = parse_state(state)?;
        let id = self.metric_id(metric)?;
        Ok(self.value_by_id(state, id))
    }

    /// Orders the states from the worst to the best value of a metric.
    ///
    /// The states without a value are not ranked: they are listed in
    /// [`Ranking::excluded`]. Equal values are ordered by state code.
    pub fn metric_ranking(&self, metric: &str) -> Result<Ranking, QueryError> {
        let id = self.metric_id(metric)?;
        let polarity = self.registry.definition(id).polarity;
        let mut entries: Vec<(StateCode, f64)> = Vec::new();
        let mut excluded: Vec<StateCode> = Vec::new();
        for (state, record) in self.records.iter() {
            match record.values[id.0] {
                MetricValue::Present(x) => entries.push((*state, x)),
                MetricValue::Missing => excluded.push(*state),
            }
        }
        entries.sort_by(|(s1, x1), (s2, x2)| {
            let by_value = match polarity {
                Polarity::HigherIsWorse => x2.total_cmp(x1),
                Polarity::HigherIsBetter => x1.total_cmp(x2),
            };
            by_value.then_with(|| s1.cmp(s2))
        });
        debug!(
            "metric_ranking: {}: {} ranked, {} excluded",
            metric,
            entries.len(),
            excluded.len()
        );
        Ok(Ranking {
            metric: metric.to_string(),
            entries,
            excluded,
        })
    }

    /// The composite score of one state.
    ///
    /// Each weighted metric is min-max normalized across all the states so
    /// that 1.0 is the worst value, and the score is the weighted mean of the
    /// normalized values available for this state.
    pub fn composite_score(
        &self,
        state: &str,
        weights: &Weights,
    ) -> Result<CompositeScore, QueryError> {
        let state = parse_state(state)?;
        let plan = self.composite_plan(weights)?;
        Ok(self.compute_composite(state, &plan))
    }

    /// The composite scores of all the states of the session, in state order.
    pub fn composite_scores(&self, weights: &Weights) -> Result<Vec<CompositeScore>, QueryError> {
        let plan = self.composite_plan(weights)?;
        Ok(self
            .records
            .keys()
            .map(|state| self.compute_composite(*state, &plan))
            .collect())
    }

    /// The `top_n` states with the highest composite scores and their scores.
    ///
    /// States without a score are left out. Equal scores are ordered by state code.
    pub fn priority_ranking(
        &self,
        weights: &Weights,
        top_n: usize,
    ) -> Result<Vec<(StateCode, f64)>, QueryError> {
        let mut scored: Vec<(StateCode, f64)> = self
            .composite_scores(weights)?
            .iter()
            .filter_map(|cs| cs.score.map(|x| (cs.state, x)))
            .collect();
        scored.sort_by(|(s1, x1), (s2, x2)| x2.total_cmp(x1).then_with(|| s1.cmp(s2)));
        scored.truncate(top_n);
        info!("priority_ranking: top {}: {:?}", top_n, scored);
        Ok(scored)
    }

    pub fn priority_states(
        &self,
        weights: &Weights,
        top_n: usize,
    ) -> Result<Vec<StateCode>, QueryError> {
        Ok(self
            .priority_ranking(weights, top_n)?
            .into_iter()
            .map(|(state, _)| state)
            .collect())
    }

    /// The values of a demographic dimension for a state, by category.
    ///
    /// Returns an empty map if the sources have no such breakdown for this state.
    pub fn breakdown(
        &self,
        state: &str,
        dimension: &str,
    ) -> Result<BTreeMap<String, MetricValue>, QueryError> {
        let state = parse_state(state)?;
        let res = self
            .records
            .get(&state)
            .and_then(|r| r.breakdowns.get(dimension))
            .cloned()
            .unwrap_or_default();
        if res.is_empty() {
            debug!("breakdown: no dimension {:?} for {}", dimension, state);
        }
        Ok(res)
    }

    /// Count, mean, median, min and max of the values of a metric.
    pub fn metric_summary(&self, metric: &str) -> Result<MetricSummary, QueryError> {
        let id = self.metric_id(metric)?;
        let mut values: Vec<f64> = self
            .records
            .values()
            .filter_map(|r| r.values[id.0].value())
            .collect();
        values.sort_by(|a, b| a.total_cmp(b));
        let count = values.len();
        let median = match count {
            0 => None,
            n if n % 2 == 1 => Some(values[n / 2]),
            n => Some((values[n / 2 - 1] + values[n / 2]) / 2.0),
        };
        Ok(MetricSummary {
            metric: metric.to_string(),
            count,
            missing: self.records.len() - count,
            mean: mean(&values),
            median,
            min: values.first().cloned(),
            max: values.last().cloned(),
        })
    }

    /// The mean of a metric over a group of states, ignoring missing values.
    pub fn group_average(
        &self,
        states: &[StateCode],
        metric: &str,
    ) -> Result<GroupAverage, QueryError> {
        let id = self.metric_id(metric)?;
        let values: Vec<f64> = states
            .iter()
            .filter_map(|s| self.value_by_id(*s, id).value())
            .collect();
        Ok(GroupAverage {
            name: metric.to_string(),
            mean: mean(&values),
            contributors: values.len(),
        })
    }

    /// The mean of each category of a demographic dimension over a group of states.
    pub fn breakdown_average(&self, states: &[StateCode], dimension: &str) -> Vec<GroupAverage> {
        let mut by_category: BTreeMap<&String, Vec<f64>> = BTreeMap::new();
        for state in states.iter() {
            let cells = self
                .records
                .get(state)
                .and_then(|r| r.breakdowns.get(dimension));
            for (category, v) in cells.into_iter().flatten() {
                let values = by_category.entry(category).or_default();
                if let Some(x) = v.value() {
                    values.push(x);
                }
            }
        }
        by_category
            .into_iter()
            .map(|(category, values)| GroupAverage {
                name: category.clone(),
                mean: mean(&values),
                contributors: values.len(),
            })
            .collect()
    }

    fn metric_id(&self, metric: &str) -> Result<MetricId, QueryError> {
        self.registry
            .id(metric)
            .ok_or_else(|| QueryError::UnknownMetric(metric.to_string()))
    }

    fn value_by_id(&self, state: StateCode, id: MetricId) -> MetricValue {
        self.records
            .get(&state)
            .map(|r| r.values[id.0])
            .unwrap_or(MetricValue::Missing)
    }

    fn normalization(&self, id: MetricId) -> Option<Normalization> {
        let mut values = self.records.values().filter_map(|r| r.values[id.0].value());
        let first = values.next()?;
        let (min, max) = values.fold((first, first), |(lo, hi), x| (lo.min(x), hi.max(x)));
        Some(Normalization {
            min,
            max,
            polarity: self.registry.definition(id).polarity,
        })
    }

    // Fails if a weighted metric is not part of the registry of this session.
    fn composite_plan(&self, weights: &Weights) -> Result<CompositePlan, QueryError> {
        let mut terms = Vec::new();
        let mut flat_metrics = Vec::new();
        for (name, w) in weights.active() {
            let id = self.metric_id(name)?;
            let norm = self.normalization(id);
            if let Some(n) = norm {
                if n.is_flat() {
                    let name = &self.registry.definition(id).name;
                    debug!("composite_plan: metric {} has no discriminating value", name);
                    flat_metrics.push(name.clone());
                }
            }
            terms.push((id, w, norm));
        }
        Ok(CompositePlan {
            terms,
            flat_metrics,
        })
    }

    fn compute_composite(&self, state: StateCode, plan: &CompositePlan) -> CompositeScore {
        let mut total_weight: f64 = 0.0;
        let mut acc: f64 = 0.0;
        let mut metrics_used: Vec<String> = Vec::new();
        let mut missing = 0;
        for (id, w, norm) in plan.terms.iter() {
            match (self.value_by_id(state, *id), norm) {
                (MetricValue::Present(x), Some(n)) => {
                    acc += w * n.apply(x);
                    total_weight += w;
                    metrics_used.push(self.registry.definition(*id).name.clone());
                }
                _ => missing += 1,
            }
        }
        let score = if metrics_used.is_empty() {
            None
        } else {
            Some(acc / total_weight)
        };
        CompositeScore {
            state,
            score,
            partial: score.is_some() && missing > 0,
            metrics_used,
            flat_metrics: plan.flat_metrics.clone(),
        }
    }
}

fn parse_state(raw: &str) -> Result<StateCode, QueryError> {
    StateCode::parse(raw).ok_or_else(|| QueryError::UnknownState(raw.to_string()))
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::builder::{ParsedRow, SessionBuilder};
    use super::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn registry(polarities: &[(&str, Polarity)]) -> MetricRegistry {
        MetricRegistry::new(
            polarities
                .iter()
                .map(|(name, p)| MetricDefinition::new(name, *p, MetricSource::Health))
                .collect(),
        )
        .unwrap()
    }

    fn session(reg: MetricRegistry, rows: &[(&str, &[(&str, Option<f64>)])]) -> Session {
        init_logger();
        let mut b = SessionBuilder::new(reg);
        for (idx, (state, values)) in rows.iter().enumerate() {
            b.add_row(&ParsedRow {
                source: "test".to_string(),
                line: idx as u64 + 2,
                state: state.to_string(),
                values: values.iter().map(|(m, v)| (m.to_string(), *v)).collect(),
                breakdowns: vec![],
            })
            .unwrap();
        }
        b.build().0
    }

    fn health_food() -> MetricRegistry {
        registry(&[
            ("health", Polarity::HigherIsWorse),
            ("food", Polarity::HigherIsWorse),
        ])
    }

    fn weights(reg: &MetricRegistry, w: &[(&str, f64)]) -> Weights {
        let pairs: Vec<(String, f64)> = w.iter().map(|(m, x)| (m.to_string(), *x)).collect();
        Weights::new(reg, &pairs).unwrap()
    }

    fn codes(states: &[StateCode]) -> Vec<&'static str> {
        states.iter().map(|s| s.as_str()).collect()
    }

    fn assert_close(a: Option<f64>, b: f64) {
        match a {
            Some(x) => assert!((x - b).abs() < 1e-12, "{} != {}", x, b),
            None => panic!("expected {}, got no score", b),
        }
    }

    #[test]
    fn ranking_worst_first_with_ties() {
        let s = session(
            health_food(),
            &[
                ("TX", &[("health", Some(30.0))]),
                ("AL", &[("health", Some(35.0))]),
                ("MS", &[("health", Some(40.0))]),
                ("AR", &[("health", Some(35.0))]),
                ("CO", &[("health", None)]),
            ],
        );
        let r = s.metric_ranking("health").unwrap();
        let order: Vec<&str> = r.entries.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(order, vec!["MS", "AL", "AR", "TX"]);
        assert_eq!(codes(&r.excluded), vec!["CO"]);
        assert_eq!(r.entries.len(), 4);
    }

    #[test]
    fn ranking_higher_is_better() {
        let reg = registry(&[("access", Polarity::HigherIsBetter)]);
        let s = session(
            reg,
            &[
                ("WA", &[("access", Some(90.0))]),
                ("WV", &[("access", Some(60.0))]),
                ("VA", &[("access", Some(75.0))]),
            ],
        );
        let r = s.metric_ranking("access").unwrap();
        let order: Vec<&str> = r.entries.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(order, vec!["WV", "VA", "WA"]);
    }

    #[test]
    fn ranking_single_row() {
        let s = session(health_food(), &[("NM", &[("food", Some(12.5))])]);
        let r = s.metric_ranking("food").unwrap();
        assert_eq!(r.entries.len(), 1);
        assert_eq!(r.entries[0].0.as_str(), "NM");
        assert_eq!(r.entries[0].1, 12.5);
    }

    #[test]
    fn unknown_metric_and_state() {
        let reg = health_food();
        let w = Weights::uniform(&reg);
        let s = session(reg, &[("NM", &[("food", Some(12.5))])]);
        assert_eq!(
            s.metric_ranking("sleep"),
            Err(QueryError::UnknownMetric("sleep".to_string()))
        );
        assert_eq!(
            s.composite_score("XX", &w),
            Err(QueryError::UnknownState("XX".to_string()))
        );
        assert_eq!(
            s.breakdown("??", "race"),
            Err(QueryError::UnknownState("??".to_string()))
        );
    }

    #[test]
    fn weights_from_another_registry() {
        let s = session(
            health_food(),
            &[
                ("AL", &[("health", Some(10.0)), ("food", Some(5.0))]),
                ("AK", &[("health", Some(5.0)), ("food", Some(10.0))]),
            ],
        );
        // "sleep" is at the position of "food" in the other registry.
        let other = registry(&[
            ("health", Polarity::HigherIsWorse),
            ("sleep", Polarity::HigherIsWorse),
        ]);
        let w = weights(&other, &[("sleep", 1.0)]);
        assert_eq!(
            s.composite_score("AL", &w),
            Err(QueryError::UnknownMetric("sleep".to_string()))
        );
        assert_eq!(
            s.priority_states(&w, 1),
            Err(QueryError::UnknownMetric("sleep".to_string()))
        );

        // More metrics than the session knows.
        let larger = registry(&[
            ("a", Polarity::HigherIsWorse),
            ("b", Polarity::HigherIsWorse),
            ("c", Polarity::HigherIsWorse),
        ]);
        assert_eq!(
            s.composite_scores(&Weights::uniform(&larger)),
            Err(QueryError::UnknownMetric("a".to_string()))
        );

        // Same names in a different order resolve by name.
        let swapped = registry(&[
            ("food", Polarity::HigherIsWorse),
            ("health", Polarity::HigherIsWorse),
        ]);
        let w = weights(&swapped, &[("health", 1.0)]);
        let al = s.composite_score("AL", &w).unwrap();
        assert_eq!(al.metrics_used, vec!["health".to_string()]);
        assert_close(al.score, 1.0);
    }

    #[test]
    fn symmetric_composite_and_alphabetical_priority() {
        let reg = health_food();
        let w = weights(&reg, &[("health", 1.0), ("food", 1.0)]);
        let s = session(
            reg,
            &[
                ("NE", &[("health", Some(10.0)), ("food", Some(5.0))]),
                ("IA", &[("health", Some(5.0)), ("food", Some(10.0))]),
            ],
        );
        let a = s.composite_score("NE", &w).unwrap();
        let b = s.composite_score("IA", &w).unwrap();
        assert_eq!(a.score, b.score);
        assert_close(a.score, 0.5);
        assert!(!a.partial);
        assert_eq!(codes(&s.priority_states(&w, 1).unwrap()), vec!["IA"]);
    }

    #[test]
    fn composite_weights_scale_invariance() {
        let reg = health_food();
        let w1 = weights(&reg, &[("health", 1.0), ("food", 3.0)]);
        let w2 = weights(&reg, &[("health", 2.5), ("food", 7.5)]);
        let s = session(
            reg,
            &[
                ("GA", &[("health", Some(31.0)), ("food", Some(18.0))]),
                ("FL", &[("health", Some(28.0)), ("food", Some(12.0))]),
                ("SC", &[("health", Some(35.0)), ("food", Some(22.0))]),
            ],
        );
        for state in ["GA", "FL", "SC"] {
            let c1 = s.composite_score(state, &w1).unwrap();
            let c2 = s.composite_score(state, &w2).unwrap();
            assert_close(c2.score, c1.score.unwrap());
        }
        // GA: health 0.5714..., food 0.6; (0.5714 + 3 * 0.6) / 4
        let ga = s.composite_score("GA", &w1).unwrap();
        assert_close(ga.score, (3.0 / 7.0 + 3.0 * 0.6) / 4.0);
        assert_close(s.composite_score("SC", &w1).unwrap().score, 1.0);
        assert_close(s.composite_score("FL", &w1).unwrap().score, 0.0);
    }

    #[test]
    fn composite_polarity() {
        let reg = registry(&[
            ("obesity", Polarity::HigherIsWorse),
            ("access", Polarity::HigherIsBetter),
        ]);
        let w = Weights::uniform(&reg);
        let s = session(
            reg,
            &[
                ("KY", &[("obesity", Some(40.0)), ("access", Some(50.0))]),
                ("VT", &[("obesity", Some(25.0)), ("access", Some(90.0))]),
            ],
        );
        assert_close(s.composite_score("KY", &w).unwrap().score, 1.0);
        assert_close(s.composite_score("VT", &w).unwrap().score, 0.0);
    }

    #[test]
    fn flat_metric_has_no_discrimination() {
        let reg = health_food();
        let w = Weights::uniform(&reg);
        let s = session(
            reg,
            &[
                ("OH", &[("health", Some(7.0)), ("food", Some(1.0))]),
                ("MI", &[("health", Some(7.0)), ("food", Some(3.0))]),
            ],
        );
        let oh = s.composite_score("OH", &w).unwrap();
        let mi = s.composite_score("MI", &w).unwrap();
        assert_eq!(oh.flat_metrics, vec!["health".to_string()]);
        assert!(oh.no_discrimination());
        assert!(mi.no_discrimination());
        // health contributes 0.0, food is 0.0 for OH and 1.0 for MI.
        assert_close(oh.score, 0.0);
        assert_close(mi.score, 0.5);

        let only_health = weights(s.registry(), &[("health", 1.0)]);
        for cs in s.composite_scores(&only_health).unwrap() {
            assert_close(cs.score, 0.0);
            assert!(cs.no_discrimination());
        }
    }

    #[test]
    fn partial_composite() {
        let reg = health_food();
        let w = weights(&reg, &[("health", 1.0), ("food", 1.0)]);
        let s = session(
            reg,
            &[
                ("NV", &[("health", Some(10.0)), ("food", Some(5.0))]),
                ("UT", &[("health", Some(5.0)), ("food", Some(10.0))]),
                ("ID", &[("health", Some(10.0)), ("food", None)]),
            ],
        );
        let id = s.composite_score("ID", &w).unwrap();
        assert!(id.partial);
        assert_eq!(id.metrics_used, vec!["health".to_string()]);
        assert_close(id.score, 1.0);
        let nv = s.composite_score("NV", &w).unwrap();
        assert!(!nv.partial);
    }

    #[test]
    fn composite_missing_everywhere() {
        let reg = health_food();
        let w = weights(&reg, &[("food", 1.0), ("health", 0.0)]);
        let s = session(
            reg,
            &[
                ("MT", &[("health", Some(10.0)), ("food", None)]),
                ("WY", &[("health", Some(5.0)), ("food", Some(2.0))]),
            ],
        );
        let mt = s.composite_score("MT", &w).unwrap();
        assert_eq!(mt.score, None);
        assert!(!mt.partial);
        // A valid state without data has no score either.
        assert_eq!(s.composite_score("ND", &w).unwrap().score, None);
        // Neither is ranked as a priority.
        assert_eq!(codes(&s.priority_states(&w, 10).unwrap()), vec!["WY"]);
    }

    #[test]
    fn priority_order_and_top_n() {
        let reg = health_food();
        let w = Weights::uniform(&reg);
        let s = session(
            reg,
            &[
                ("MS", &[("health", Some(40.0)), ("food", Some(20.0))]),
                ("WV", &[("health", Some(39.0)), ("food", Some(18.0))]),
                ("LA", &[("health", Some(38.0)), ("food", Some(19.0))]),
                ("CO", &[("health", Some(25.0)), ("food", Some(10.0))]),
            ],
        );
        let top = s.priority_ranking(&w, 3).unwrap();
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].0.as_str(), "MS");
        assert_close(Some(top[0].1), 1.0);
        assert!(top.windows(2).all(|p| p[0].1 >= p[1].1));
        assert!(s.priority_states(&w, 0).unwrap().is_empty());
        assert_eq!(s.priority_states(&w, 100).unwrap().len(), 4);
    }

    #[test]
    fn breakdown_and_dimensions() {
        init_logger();
        let mut b = SessionBuilder::new(health_food());
        b.add_row(&ParsedRow {
            source: "food.csv".to_string(),
            line: 2,
            state: "AL".to_string(),
            values: vec![("food".to_string(), Some(12.0))],
            breakdowns: vec![
                ("population".to_string(), "Seniors".to_string(), Some(2.5)),
                ("population".to_string(), "Low income".to_string(), Some(7.0)),
            ],
        })
        .unwrap();
        b.add_row(&ParsedRow {
            source: "food.csv".to_string(),
            line: 3,
            state: "DE".to_string(),
            values: vec![("food".to_string(), Some(9.0))],
            breakdowns: vec![
                ("population".to_string(), "Seniors".to_string(), Some(3.5)),
                ("population".to_string(), "Low income".to_string(), None),
            ],
        })
        .unwrap();
        let (s, _) = b.build();
        assert_eq!(s.dimensions(), vec!["population".to_string()]);

        let al = s.breakdown("AL", "population").unwrap();
        assert_eq!(al.len(), 2);
        assert_eq!(al.get("Seniors"), Some(&MetricValue::Present(2.5)));
        assert!(s.breakdown("AL", "race").unwrap().is_empty());
        // A valid state without any data.
        assert!(s.breakdown("HI", "population").unwrap().is_empty());

        let states = s.states();
        let avg = s.breakdown_average(&states, "population");
        assert_eq!(avg.len(), 2);
        assert_eq!(avg[0].name, "Low income");
        assert_eq!(avg[0].mean, Some(7.0));
        assert_eq!(avg[0].contributors, 1);
        assert_eq!(avg[1].name, "Seniors");
        assert_eq!(avg[1].mean, Some(3.0));
    }

    #[test]
    fn summary_and_group_average() {
        let s = session(
            health_food(),
            &[
                ("AL", &[("health", Some(4.0))]),
                ("AK", &[("health", Some(1.0))]),
                ("AZ", &[("health", Some(3.0))]),
                ("AR", &[("health", Some(2.0))]),
                ("CA", &[("health", None)]),
            ],
        );
        let sum = s.metric_summary("health").unwrap();
        assert_eq!(sum.count, 4);
        assert_eq!(sum.missing, 1);
        assert_eq!(sum.mean, Some(2.5));
        assert_eq!(sum.median, Some(2.5));
        assert_eq!(sum.min, Some(1.0));
        assert_eq!(sum.max, Some(4.0));

        let empty = s.metric_summary("food").unwrap();
        assert_eq!(empty.count, 0);
        assert_eq!(empty.mean, None);

        let group = vec![
            StateCode::parse("AL").unwrap(),
            StateCode::parse("CA").unwrap(),
            StateCode::parse("AK").unwrap(),
        ];
        let avg = s.group_average(&group, "health").unwrap();
        assert_eq!(avg.mean, Some(2.5));
        assert_eq!(avg.contributors, 2);
    }

    #[test]
    fn session_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Session>();

        let reg = health_food();
        let w = Weights::uniform(&reg);
        let s = session(
            reg,
            &[
                ("MS", &[("health", Some(40.0)), ("food", Some(20.0))]),
                ("CO", &[("health", Some(25.0)), ("food", Some(10.0))]),
            ],
        );
        let expected = s.priority_states(&w, 2).unwrap();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| s.priority_states(&w, 2).unwrap()))
                .collect();
            for h in handles {
                assert_eq!(h.join().unwrap(), expected);
            }
        });
    }
}
