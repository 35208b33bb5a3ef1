// Text rendering of the dashboard.

use std::fmt;

use state_metrics::*;

#[derive(PartialEq, Debug, Clone)]
pub struct PriorityEntry {
    pub state: StateCode,
    pub score: f64,
    /// Some weighted metrics were missing for this state.
    pub partial: bool,
}

/// All the panels of the dashboard, computed for one selection.
#[derive(PartialEq, Debug, Clone)]
pub struct DashboardView {
    pub title: String,
    pub metric: MetricDefinition,
    /// The worst states for the selected metric.
    pub top: Vec<(StateCode, f64)>,
    pub no_data: Vec<StateCode>,
    pub summary: MetricSummary,
    pub weights: Vec<(String, f64)>,
    pub priority: Vec<PriorityEntry>,
    pub flat_metrics: Vec<String>,
    pub food_impact: Vec<(MetricDefinition, GroupAverage)>,
    pub health_impact: Vec<(MetricDefinition, GroupAverage)>,
    pub dimension: Option<String>,
    pub demographics: Vec<GroupAverage>,
    pub warnings: Vec<String>,
    pub failed_sources: Vec<(String, String)>,
}

fn fmt_value(x: Option<f64>, unit: &str) -> String {
    match x {
        Some(v) => format!("{:.1}{}", v, unit),
        None => "no data".to_string(),
    }
}

fn write_averages(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    avgs: &[(MetricDefinition, GroupAverage)],
) -> fmt::Result {
    if avgs.is_empty() {
        return Ok(());
    }
    writeln!(f, "  {}:", title)?;
    for (def, avg) in avgs.iter() {
        writeln!(
            f,
            "    {:<40} {:>10}",
            def.label,
            fmt_value(avg.mean, &def.unit)
        )?;
    }
    Ok(())
}

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.metric.unit.as_str();
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", "=".repeat(self.title.chars().count()))?;
        writeln!(f)?;

        writeln!(f, "{} ({} states shown)", self.metric.label, self.top.len())?;
        for (idx, (state, v)) in self.top.iter().enumerate() {
            writeln!(
                f,
                "{:>3}. {} {:<22} {:>10}",
                idx + 1,
                state,
                state.name(),
                fmt_value(Some(*v), unit)
            )?;
        }
        if !self.no_data.is_empty() {
            let names: Vec<&str> = self.no_data.iter().map(|s| s.as_str()).collect();
            writeln!(f, "     no data: {}", names.join(", "))?;
        }
        let s = &self.summary;
        writeln!(
            f,
            "  mean {}  median {}  min {}  max {}  ({} states, {} missing)",
            fmt_value(s.mean, unit),
            fmt_value(s.median, unit),
            fmt_value(s.min, unit),
            fmt_value(s.max, unit),
            s.count,
            s.missing
        )?;
        writeln!(f)?;

        let weights: Vec<String> = self
            .weights
            .iter()
            .map(|(m, w)| format!("{}={}", m, w))
            .collect();
        writeln!(f, "Priority states (weights: {})", weights.join(", "))?;
        if self.priority.is_empty() {
            writeln!(f, "  no data")?;
        }
        for (idx, p) in self.priority.iter().enumerate() {
            writeln!(
                f,
                "{:>3}. {} {:<22} {:>6.1}%{}",
                idx + 1,
                p.state,
                p.state.name(),
                p.score * 100.0,
                if p.partial { " (partial)" } else { "" }
            )?;
        }
        if !self.flat_metrics.is_empty() {
            writeln!(
                f,
                "  same value in all states, ignored: {}",
                self.flat_metrics.join(", ")
            )?;
        }
        writeln!(f)?;

        writeln!(f, "Averages over the priority states")?;
        write_averages(f, "Food access", &self.food_impact)?;
        write_averages(f, "Health", &self.health_impact)?;
        if let Some(dim) = &self.dimension {
            writeln!(f, "  By {}:", dim)?;
            if self.demographics.is_empty() {
                writeln!(f, "    no data")?;
            }
            // Breakdown columns carry no unit.
            for avg in self.demographics.iter() {
                writeln!(f, "    {:<40} {:>10}", avg.name, fmt_value(avg.mean, ""))?;
            }
        }

        if !self.warnings.is_empty() || !self.failed_sources.is_empty() {
            writeln!(f)?;
            writeln!(f, "Data quality")?;
            for (path, err) in self.failed_sources.iter() {
                writeln!(f, "  not loaded: {}: {}", path, err)?;
            }
            for w in self.warnings.iter() {
                writeln!(f, "  {}", w)?;
            }
        }
        Ok(())
    }
}
