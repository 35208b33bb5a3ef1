use clap::Parser;

/// Ranks US states by health and food access indicators and selects the
/// priority states for food access programs.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON file describing the metrics and the data sources. The paths of the
    /// sources are relative to the directory of this file.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (metric name, optional) The metric to rank the states by. Defaults to the `defaultMetric`
    /// of the configuration, or to the first metric.
    #[clap(short, long, value_parser)]
    pub metric: Option<String>,

    /// (number, optional) How many states to show in the ranking.
    #[clap(short, long, value_parser)]
    pub top: Option<usize>,

    /// (number, optional) How many priority states to select.
    #[clap(short, long, value_parser)]
    pub priority: Option<usize>,

    /// (NAME=VALUE, repeatable) The weight of a metric in the composite score. When given, these
    /// weights replace all the weights of the configuration.
    #[clap(short, long, value_parser)]
    pub weight: Vec<String>,

    /// (name, optional) The demographic dimension averaged over the priority states.
    #[clap(short, long, value_parser)]
    pub dimension: Option<String>,

    /// (file path or 'stdout') If specified, the summary of the dashboard will be written in JSON
    /// format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, fadash will check that the
    /// summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// If passed as an argument, will turn on verbose logging.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
