use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use gaugevecset::GaugeVecSetOpts;

use crate::stress::StressConfig;
use crate::validators::parse_duration;

#[derive(clap::ValueEnum, Debug, Clone, Default)]
pub(crate) enum LoggingLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

#[derive(Parser, Debug)]
pub(crate) struct CliArgs {
    /// Set gaugevecset's logging level
    #[arg(long, default_value_t, value_enum)]
    pub(crate) logging: LoggingLevel,
    #[arg(long, help = "enable parking_lot's deadlock detector")]
    pub(crate) enable_deadlock_detector: bool,
    #[command(subcommand)]
    pub(crate) command: Commands,
}

/// Metric definition of the set to build.
#[derive(clap::Args, Debug, Clone)]
pub(crate) struct MetricArgs {
    #[arg(long)]
    pub(crate) namespace: Option<String>,
    #[arg(long)]
    pub(crate) subsystem: Option<String>,
    #[arg(long)]
    pub(crate) name: String,
    /// Help text of the metric
    #[arg(long, default_value = "Series replayed by gaugevecset")]
    pub(crate) help_text: String,
    /// Comma separated label names identifying the bulk deletion scope
    #[arg(long, value_delimiter = ',', required = true)]
    pub(crate) outer_labels: Vec<String>,
    /// Comma separated label names of the mutually exclusive group
    #[arg(long, value_delimiter = ',')]
    pub(crate) sub_labels: Vec<String>,
    /// Comma separated label names of the variants within a group
    #[arg(long, value_delimiter = ',')]
    pub(crate) extra_labels: Vec<String>,
}

impl MetricArgs {
    pub(crate) fn opts(&self) -> GaugeVecSetOpts {
        GaugeVecSetOpts::new(self.name.clone(), self.help_text.clone())
            .namespace(self.namespace.clone().unwrap_or_default())
            .subsystem(self.subsystem.clone().unwrap_or_default())
            .outer_labels(&self.outer_labels)
            .sub_labels(&self.sub_labels)
            .extra_labels(&self.extra_labels)
    }
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Commands {
    /// Apply the operations in a file and print the resulting series
    Replay {
        #[command(flatten)]
        metric: MetricArgs,
        /// One operation per line, e.g. `set-group 1 prod;nginx;Running`
        #[arg(long)]
        path: PathBuf,
    },
    /// Hammer a condition-shaped set with concurrent writers and deleters
    Stress {
        /// How long to run in seconds
        #[arg(short = 'D', long, default_value = StressConfig::default().duration.as_secs().to_string(),
            value_parser = parse_duration)]
        duration: Duration,
        #[arg(long, default_value_t = StressConfig::default().writers)]
        writers: usize,
        #[arg(long, default_value_t = StressConfig::default().group_deleters)]
        group_deleters: usize,
        #[arg(long, default_value_t = StressConfig::default().index_deleters)]
        index_deleters: usize,
    },
}
