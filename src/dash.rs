use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use state_metrics::builder::{ParsedRow, SessionBuilder};
use state_metrics::*;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::dash::config_reader::*;
use crate::dash::report::*;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;
pub mod report;

/// Structural problems with a source file. They abort the loading of this
/// file only.
#[derive(Debug, Snafu)]
pub enum LoadError {
    #[snafu(display("Error opening file {path}"))]
    OpenCsv { source: csv::Error, path: String },
    #[snafu(display("{path}:{lineno}: malformed line"))]
    CsvRecord {
        source: csv::Error,
        path: String,
        lineno: u64,
    },
    #[snafu(display("{path}: invalid delimiter {delimiter:?}, expected a single character"))]
    InvalidDelimiter { path: String, delimiter: String },
    #[snafu(display("{path}: the file is empty"))]
    EmptyFile { path: String },
    #[snafu(display("{path}:{lineno}: column {column:?} not found in the header (wrong delimiter?)"))]
    MissingColumn {
        path: String,
        lineno: u64,
        column: String,
    },
    #[snafu(display("{path}:{lineno}: column {column:?}: cannot read {content:?} as a number"))]
    UnparseableNumber {
        path: String,
        lineno: u64,
        column: String,
        content: String,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("{path}: worksheet {name:?} not found"))]
    MissingWorksheet { path: String, name: String },
    #[snafu(display("{path}:{lineno}: unexpected cell {content}"))]
    ExcelWrongCellType {
        path: String,
        lineno: u64,
        content: String,
    },
    #[snafu(display("{path}: unknown provider {provider:?}"))]
    UnknownProvider { path: String, provider: String },
    #[snafu(display("{path}: {source}"))]
    Builder { source: ConfigError, path: String },
}

type LoadResult<T> = Result<T, LoadError>;

#[derive(Debug, Snafu)]
pub enum DashError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson { source: std::io::Error, path: String },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Invalid configuration: {source}"))]
    InvalidConfig { source: ConfigError },
    #[snafu(display("{source}"))]
    Query { source: QueryError },
    #[snafu(display("None of the sources could be loaded"))]
    NoSourceLoaded {},
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Error writing summary to {path}"))]
    WritingSummary { source: std::io::Error, path: String },
    #[snafu(display("Difference detected between the summary and the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type DashResult<T> = Result<T, DashError>;

/// The outcome of loading all the sources of a dashboard.
#[derive(Debug)]
pub struct LoadedDashboard {
    pub session: Session,
    pub warnings: Vec<ValidationWarning>,
    /// (file path, error message) for the sources that could not be read.
    pub failed_sources: Vec<(String, String)>,
}

fn read_source(path: &str, cfs: &FileSource) -> LoadResult<Vec<ParsedRow>> {
    info!("Attempting to read source file {:?}", path);
    match cfs.provider.as_str() {
        "csv" => io_csv::read_csv_source(path, cfs),
        "xlsx" => io_excel::read_excel_source(path, cfs),
        x => UnknownProviderSnafu { path, provider: x }.fail(),
    }
}

// Metric names are checked before reading so that a source is either fully
// loaded or not at all.
fn check_source_metrics(path: &str, cfs: &FileSource, registry: &MetricRegistry) -> LoadResult<()> {
    for mc in cfs.metrics.iter() {
        if registry.get(&mc.metric).is_none() {
            return Err(ConfigError::UnknownMetric(mc.metric.clone())).context(BuilderSnafu { path });
        }
    }
    Ok(())
}

/// Loads all the sources of a configuration. Paths are relative to `root`.
///
/// A source that fails is reported in [`LoadedDashboard::failed_sources`]
/// and the others are still loaded.
pub fn load_sources(config: &DashConfig, root: &Path) -> DashResult<LoadedDashboard> {
    let registry = config.registry()?;
    let mut builder = SessionBuilder::new(registry).states_only(config.states_only.unwrap_or(false));
    let mut failed_sources: Vec<(String, String)> = Vec::new();
    let mut loaded = 0;

    for cfs in config.sources.iter() {
        let p: PathBuf = root.join(&cfs.file_path);
        let path = p.as_path().display().to_string();
        let res = check_source_metrics(&path, cfs, builder.registry())
            .and_then(|_| read_source(&path, cfs))
            .and_then(|rows| builder.add_rows(&rows).context(BuilderSnafu { path: &path }));
        match res {
            Ok(()) => loaded += 1,
            Err(e) => {
                warn!("Skipping source {}: {}", path, e);
                failed_sources.push((path, e.to_string()));
            }
        }
    }
    ensure!(loaded > 0, NoSourceLoadedSnafu {});

    let (session, warnings) = builder.build();
    let dropped = warnings.iter().filter(|w| w.drops_row()).count();
    info!(
        "Loaded {} sources: {} states, {} warnings, {} rows dropped",
        loaded,
        session.states().len(),
        warnings.len(),
        dropped
    );
    Ok(LoadedDashboard {
        session,
        warnings,
        failed_sources,
    })
}

pub fn load_dashboard(config_path: &str) -> DashResult<(DashConfig, LoadedDashboard)> {
    let config = read_config(config_path)?;
    let root = Path::new(config_path)
        .parent()
        .context(MissingParentDirSnafu {})?;
    let loaded = load_sources(&config, root)?;
    Ok((config, loaded))
}

/// Parses weights given as `NAME=VALUE`.
fn parse_weight_overrides(overrides: &[String]) -> DashResult<Vec<(String, f64)>> {
    let mut res = Vec::new();
    for o in overrides.iter() {
        let (name, value) = match o.split_once('=') {
            Some(p) => p,
            None => whatever!("Invalid weight {:?}: expected NAME=VALUE", o),
        };
        let w = match value.trim().parse::<f64>() {
            Ok(w) => w,
            Err(_) => whatever!("Invalid weight {:?}: {:?} is not a number", o, value),
        };
        res.push((name.trim().to_string(), w));
    }
    Ok(res)
}

/// The weights given on the command line, then the ones of the
/// configuration, then the same weight for every metric.
pub fn resolve_weights(
    config: &DashConfig,
    registry: &MetricRegistry,
    overrides: &[String],
) -> DashResult<Weights> {
    let pairs: Vec<(String, f64)> = if !overrides.is_empty() {
        parse_weight_overrides(overrides)?
    } else if let Some(ws) = &config.weights {
        ws.iter().map(|(k, v)| (k.clone(), *v)).collect()
    } else {
        return Ok(Weights::uniform(registry));
    };
    Weights::new(registry, &pairs).context(InvalidConfigSnafu {})
}

/// What the user selected for this run.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Selection {
    pub metric: Option<String>,
    pub top_n: Option<usize>,
    pub priority_n: Option<usize>,
    pub weights: Vec<String>,
    pub dimension: Option<String>,
}

impl Selection {
    pub fn from_args(args: &Args) -> Selection {
        Selection {
            metric: args.metric.clone(),
            top_n: args.top,
            priority_n: args.priority,
            weights: args.weight.clone(),
            dimension: args.dimension.clone(),
        }
    }
}

fn lookup_metric(registry: &MetricRegistry, name: &str) -> DashResult<MetricDefinition> {
    registry
        .get(name)
        .cloned()
        .ok_or_else(|| QueryError::UnknownMetric(name.to_string()))
        .context(QuerySnafu {})
}

/// Computes all the panels of the dashboard.
pub fn build_view(
    config: &DashConfig,
    loaded: &LoadedDashboard,
    selection: &Selection,
) -> DashResult<DashboardView> {
    let session = &loaded.session;
    let registry = session.registry();

    let metric = selection
        .metric
        .clone()
        .or_else(|| config.dashboard.default_metric.clone())
        .or_else(|| registry.definitions().first().map(|d| d.name.clone()))
        .ok_or(ConfigError::EmptyRegistry)
        .context(InvalidConfigSnafu {})?;
    let definition = lookup_metric(registry, &metric)?;
    let top_n = selection.top_n.unwrap_or_else(|| config.top_n());
    let priority_n = selection.priority_n.unwrap_or_else(|| config.priority_n());
    let weights = resolve_weights(config, registry, &selection.weights)?;
    debug!("build_view: metric {}, weights {:?}", metric, weights.to_named());

    let ranking = session.metric_ranking(&metric).context(QuerySnafu {})?;
    let summary = session.metric_summary(&metric).context(QuerySnafu {})?;

    let scores = session.composite_scores(&weights).context(QuerySnafu {})?;
    let priority_ranking = session
        .priority_ranking(&weights, priority_n)
        .context(QuerySnafu {})?;
    let priority: Vec<PriorityEntry> = priority_ranking
        .iter()
        .map(|(state, score)| {
            let partial = scores
                .iter()
                .any(|cs| cs.state == *state && cs.partial);
            PriorityEntry {
                state: *state,
                score: *score,
                partial,
            }
        })
        .collect();
    let flat_metrics = scores
        .first()
        .map(|cs| cs.flat_metrics.clone())
        .unwrap_or_default();
    let priority_states: Vec<StateCode> = priority.iter().map(|p| p.state).collect();

    let impact_metrics: Vec<String> = match &config.impact_metrics {
        Some(ms) => ms.clone(),
        None => registry.definitions().iter().map(|d| d.name.clone()).collect(),
    };
    let mut food_impact = Vec::new();
    let mut health_impact = Vec::new();
    for m in impact_metrics.iter() {
        let def = lookup_metric(registry, m)?;
        let avg = session
            .group_average(&priority_states, m)
            .context(QuerySnafu {})?;
        match def.source {
            MetricSource::FoodAccess => food_impact.push((def, avg)),
            MetricSource::Health => health_impact.push((def, avg)),
        }
    }
    let dimension = selection
        .dimension
        .clone()
        .or_else(|| config.impact_dimension.clone())
        .or_else(|| session.dimensions().first().cloned());
    let demographics = match &dimension {
        Some(d) => session.breakdown_average(&priority_states, d),
        None => Vec::new(),
    };

    Ok(DashboardView {
        title: config.dashboard.title.clone(),
        metric: definition,
        top: ranking.entries.iter().take(top_n).cloned().collect(),
        no_data: ranking.excluded.clone(),
        summary,
        weights: weights.to_named(),
        priority,
        flat_metrics,
        food_impact,
        health_impact,
        dimension,
        demographics,
        warnings: loaded.warnings.iter().map(|w| w.to_string()).collect(),
        failed_sources: loaded.failed_sources.clone(),
    })
}

fn opt_js(x: Option<f64>) -> JSValue {
    match x {
        Some(v) => json!(v),
        None => JSValue::Null,
    }
}

fn averages_to_json(avgs: &[(MetricDefinition, GroupAverage)]) -> JSValue {
    let mut m: JSMap<String, JSValue> = JSMap::new();
    for (def, avg) in avgs.iter() {
        m.insert(def.name.clone(), opt_js(avg.mean));
    }
    JSValue::Object(m)
}

pub fn build_summary_js(view: &DashboardView) -> JSValue {
    let ranking: Vec<JSValue> = view
        .top
        .iter()
        .map(|(state, v)| json!({"state": state.as_str(), "value": v}))
        .collect();
    let priority: Vec<JSValue> = view
        .priority
        .iter()
        .map(|p| json!({"state": p.state.as_str(), "score": p.score, "partial": p.partial}))
        .collect();
    let mut demographics: JSMap<String, JSValue> = JSMap::new();
    for avg in view.demographics.iter() {
        demographics.insert(avg.name.clone(), opt_js(avg.mean));
    }
    let weights: JSMap<String, JSValue> = view
        .weights
        .iter()
        .map(|(k, v)| (k.clone(), json!(v)))
        .collect();
    json!({
        "config": {
            "title": view.title,
            "metric": view.metric.name,
            "weights": weights,
        },
        "ranking": {
            "top": ranking,
            "noData": view.no_data.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        },
        "summary": {
            "count": view.summary.count,
            "missing": view.summary.missing,
            "mean": opt_js(view.summary.mean),
            "median": opt_js(view.summary.median),
            "min": opt_js(view.summary.min),
            "max": opt_js(view.summary.max),
        },
        "priority": {
            "states": priority,
            "flatMetrics": view.flat_metrics,
        },
        "impact": {
            "foodAccess": averages_to_json(&view.food_impact),
            "health": averages_to_json(&view.health_impact),
            "dimension": view.dimension,
            "demographics": demographics,
        },
        "warnings": view.warnings,
        "failedSources": view
            .failed_sources
            .iter()
            .map(|(p, e)| json!({"path": p, "error": e}))
            .collect::<Vec<_>>(),
    })
}

fn write_summary(out: &str, pretty_js: &str) -> DashResult<()> {
    if out == "stdout" {
        println!("{}", pretty_js);
    } else {
        fs::write(out, pretty_js).context(WritingSummarySnafu { path: out })?;
        info!("Summary written to {}", out);
    }
    Ok(())
}

fn check_reference(reference_path: &str, pretty_js: &str) -> DashResult<()> {
    let summary_ref = read_summary(reference_path)?;
    let pretty_js_ref = whatever!(
        serde_json::to_string_pretty(&summary_ref),
        "Error serializing the reference summary"
    );
    if pretty_js_ref != pretty_js {
        warn!("Found differences with the reference summary");
        print_diff(pretty_js_ref.as_str(), pretty_js, "\n");
        return ReferenceMismatchSnafu {
            path: reference_path,
        }
        .fail();
    }
    info!("The summary matches the reference {}", reference_path);
    Ok(())
}

pub fn run_dashboard(args: &Args) -> DashResult<()> {
    let (config, loaded) = load_dashboard(&args.config)?;
    let view = build_view(&config, &loaded, &Selection::from_args(args))?;

    print!("{}", view);

    let summary_js = build_summary_js(&view);
    let pretty_js = whatever!(
        serde_json::to_string_pretty(&summary_js),
        "Error serializing the summary"
    );
    if let Some(out) = &args.out {
        write_summary(out, &pretty_js)?;
    }
    if let Some(reference) = &args.reference {
        check_reference(reference, &pretty_js)?;
    }
    Ok(())
}
