//! Campaign Analytics: turns per-row campaign performance records into
//! validated, aggregated and ranked campaign summaries.
//!
//! Reads a JSON array of row objects (or newline-delimited JSON) and writes
//! the performance report as JSON.

use anyhow::Context;
use campaign_core::config::AnalyticsConfig;
use campaign_core::types::{RawDataset, RawRecord};
use campaign_reporting::AnalyticsPipeline;
use clap::Parser;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "campaign-analytics")]
#[command(about = "Validate, aggregate and rank campaign performance data")]
#[command(version)]
struct Cli {
    /// Input rows as JSON array or NDJSON (default: stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file for the JSON report (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, env = "CAMPAIGN_ANALYTICS_CONFIG")]
    config: Option<PathBuf>,

    /// Ranking metric: roas, ctr, cpc, cpa or a total such as total_revenue (overrides config)
    #[arg(long)]
    rank_by: Option<String>,

    /// Ranking direction: higher or lower (overrides config)
    #[arg(long)]
    direction: Option<String>,

    /// Campaign order: first_seen, campaign_id, total_spend, total_revenue (overrides config)
    #[arg(long)]
    sort: Option<String>,

    /// Number of top campaigns referenced in the overall summary (overrides config)
    #[arg(long)]
    top: Option<usize>,

    /// Pretty-print the JSON report
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays a clean report
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campaign_analytics=info,campaign_reporting=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config =
        AnalyticsConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    // Apply CLI overrides
    if let Some(metric) = &cli.rank_by {
        config.ranking.metric = metric.parse()?;
    }
    if let Some(direction) = &cli.direction {
        config.ranking.direction = direction.parse()?;
    }
    if let Some(order) = &cli.sort {
        config.output.order = order.parse()?;
    }
    if let Some(top) = cli.top {
        config.ranking.top_n = top;
    }

    info!(
        metric = %config.ranking.metric,
        direction = ?config.ranking.direction,
        order = ?config.output.order,
        top_n = config.ranking.top_n,
        "Configuration loaded"
    );

    let raw = match &cli.input {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };
    let dataset = RawDataset::from_rows(parse_rows(&raw)?);
    info!(rows = dataset.len(), columns = dataset.columns.len(), "Rows loaded");

    let report = AnalyticsPipeline::new(&config).run(&dataset)?;

    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    match &cli.output {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }

    Ok(())
}

/// Parse a JSON array of objects, or one object per line.
fn parse_rows(raw: &str) -> anyhow::Result<Vec<RawRecord>> {
    let trimmed = raw.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("input is not an array of row objects");
    }

    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("line {} is not a row object", n + 1))
        })
        .collect()
}
