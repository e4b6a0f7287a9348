//! api-monitor
//!
//! Probes HTTP endpoints and reports each request that fails, times out,
//! returns an unexpected status or takes longer than the slow threshold.
//!
//! # Architecture Overview
//!
//! ```text
//!   CLI args + config.toml
//!          │
//!          ▼
//!   ┌─────────────┐  create / tag / time   ┌──────────────────┐
//!   │   Prober    │───────────────────────▶│ RequestRegistry  │
//!   │  (reqwest)  │                        └────────┬─────────┘
//!   └──────┬──────┘                                 │ set_response_info
//!          │ timing entries                         ▼
//!          ▼                               ┌──────────────────┐
//!   ┌─────────────┐      lookup by URL     │    Classifier    │
//!   │  Timeline   │◀───────────────────────│                  │
//!   └─────────────┘                        └────────┬─────────┘
//!                                                   │ ApiEvent
//!                                                   ▼
//!                                          ┌──────────────────┐
//!                                          │     Reporter     │
//!                                          └──────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use api_monitor::config::{load_config, validate_config, MonitorConfig};
use api_monitor::observability::init_logging;
use api_monitor::probe::{parse_header, ProbeTarget, Prober};
use api_monitor::reporter::{JsonLinesReporter, Reporter, TracingReporter};

#[derive(Parser)]
#[command(name = "api-monitor")]
#[command(about = "Probe HTTP endpoints and report errors, timeouts and slow responses", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Slow-request threshold in milliseconds
    #[arg(short = 't', long)]
    threshold_ms: Option<u64>,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Extra request header, NAME:VALUE (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Send each URL this many times, concurrently
    #[arg(short = 'n', long, default_value_t = 1)]
    repeat: usize,

    /// Accepted status range, e.g. 200-299
    #[arg(long)]
    accept_status: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Classify by wall clock only, without timing entries or URL tags
    #[arg(long)]
    no_timeline: bool,

    /// Print events as JSON lines on stdout instead of logging them
    #[arg(long)]
    json: bool,

    /// URLs to probe
    #[arg(required = true)]
    urls: Vec<String>,
}

impl Cli {
    fn apply(&self, config: &mut MonitorConfig) {
        if let Some(ms) = self.threshold_ms {
            config.tracker.default_slow_threshold_ms = ms;
        }
        if let Some(range) = &self.accept_status {
            config.probe.accept_status = range.clone();
        }
        if let Some(ms) = self.timeout_ms {
            config.probe.timeout_ms = ms;
        }
    }

    fn targets(&self) -> Vec<ProbeTarget> {
        self.urls
            .iter()
            .flat_map(|url| std::iter::repeat(url).take(self.repeat.max(1)))
            .map(|url| {
                self.headers
                    .iter()
                    .fold(ProbeTarget::new(self.method.as_str(), url.as_str()), |t, (k, v)| {
                        t.header(k.as_str(), v.as_str())
                    })
            })
            .collect()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => MonitorConfig::default(),
    };
    cli.apply(&mut config);
    if let Err(errors) = validate_config(&config) {
        for e in &errors {
            eprintln!("config error: {e}");
        }
        std::process::exit(2);
    }

    init_logging(&config.observability)?;

    tracing::info!(
        default_slow_threshold_ms = config.tracker.default_slow_threshold_ms,
        accept_status = %config.probe.accept_status,
        timeout_ms = config.probe.timeout_ms,
        timeline = !cli.no_timeline,
        "Configuration loaded"
    );

    let reporter: Arc<dyn Reporter> = if cli.json {
        Arc::new(JsonLinesReporter)
    } else {
        Arc::new(TracingReporter)
    };
    let prober = Prober::new(&config, reporter, !cli.no_timeline)?;

    let targets = cli.targets();
    let results = prober.probe_all(&targets).await;

    let mut flagged = 0;
    for (target, result) in targets.iter().zip(results) {
        match result {
            Ok(outcome) => {
                if outcome.event.is_some() {
                    flagged += 1;
                }
                if !cli.json {
                    println!(
                        "{:>4} {:<6} {:<60} {:>9.1}ms  {}",
                        outcome.status.code(),
                        outcome.method,
                        outcome.url,
                        outcome.elapsed_ms,
                        outcome.event.map(|k| k.as_str()).unwrap_or("ok"),
                    );
                }
            }
            Err(e) => {
                flagged += 1;
                tracing::error!(url = %target.url, error = %e, "Probe failed");
            }
        }
    }

    tracing::info!(total = targets.len(), flagged, "Probe run complete");
    Ok(())
}
