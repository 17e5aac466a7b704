//! revcal CLI: simulate a continuous active learning review for one topic.

mod progress;

use clap::Parser;
use progress::ProgressPrinter;
use revcal_core::{ReviewLoop, RunConfig, Transport};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Simulate a CAL review of a test collection topic
#[derive(Parser, Debug)]
#[command(name = "revcal", version, about, long_about = None)]
struct Cli {
    /// Topic id
    topic: String,

    /// Pool file (`topic docid rank run` per line)
    pool: PathBuf,

    /// Relevance judgments (`topic iter docid relevance` per line)
    qrels: PathBuf,

    /// Maximum pool rank used for the seed training set
    #[arg(short = 't', long)]
    train_rank: Option<u32>,

    /// Documents reviewed per round
    #[arg(short = 'n', long)]
    num_docs: Option<usize>,

    /// Maximum number of rounds (default: number of judged documents)
    #[arg(short = 's', long)]
    max_steps: Option<usize>,

    /// Stop after this many consecutive rounds without a relevant document
    #[arg(short = 'z', long)]
    zero_steps: Option<usize>,

    /// Apply the yield-based cutoffs
    #[arg(short = 'f', long)]
    fail_out: bool,

    /// Keep going after every relevant document has been found
    #[arg(short = 'r', long)]
    no_relstop: bool,

    /// Lock file shared by runs on the same collection
    #[arg(short = 'l', long)]
    lockfile: Option<PathBuf>,

    /// Do not lock around training
    #[arg(short = 'L', long)]
    disable_locking: bool,

    /// Collection id passed to the ranking programs
    #[arg(short = 'd', long)]
    docdb: Option<String>,

    /// Ranking backend transport: process or http
    #[arg(long)]
    transport: Option<Transport>,

    /// Ranking service host (http transport)
    #[arg(long)]
    host: Option<String>,

    /// Ranking service port (http transport)
    #[arg(long)]
    port: Option<u16>,

    /// Training program (process transport)
    #[arg(long)]
    train_program: Option<PathBuf>,

    /// Scoring program (process transport)
    #[arg(long)]
    score_program: Option<PathBuf>,

    /// Directory for training sets, models and logs
    #[arg(short, long)]
    work_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Directory searched for `revcal.toml` and holding the log files.
    fn run_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Flags win over every configuration layer.
    fn apply_overrides(&self, config: &mut RunConfig) {
        config.topic = self.topic.clone();
        config.pool = self.pool.clone();
        config.qrels = self.qrels.clone();
        if let Some(dir) = &self.work_dir {
            config.work_dir = dir.clone();
        }
        if let Some(rank) = self.train_rank {
            config.train_rank = rank;
        }
        if let Some(n) = self.num_docs {
            config.num_docs = n;
        }
        if self.max_steps.is_some() {
            config.max_steps = self.max_steps;
        }
        if self.zero_steps.is_some() {
            config.zero_steps = self.zero_steps;
        }
        if self.fail_out {
            config.fail_out = true;
        }
        if self.no_relstop {
            config.relstop = false;
        }
        if let Some(path) = &self.lockfile {
            config.lock.path = path.clone();
        }
        if self.disable_locking {
            config.lock.enabled = false;
        }
        if let Some(docdb) = &self.docdb {
            config.backend.collection = docdb.clone();
        }
        if let Some(transport) = self.transport {
            config.backend.transport = transport;
        }
        if let Some(host) = &self.host {
            config.backend.host = host.clone();
        }
        if let Some(port) = self.port {
            config.backend.port = port;
        }
        if let Some(program) = &self.train_program {
            config.backend.train_program = program.clone();
        }
        if let Some(program) = &self.score_program {
            config.backend.score_program = program.clone();
        }
        if self.report.is_some() {
            config.report = self.report.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(&cli);
    run_logged(&cli).await
}

/// Human-readable stderr plus a per-topic JSON log under the run directory.
fn init_tracing(cli: &Cli) -> WorkerGuard {
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = cli.run_dir().join("logs");
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender =
        tracing_appender::rolling::never(&log_dir, format!("revcal.{}.log", cli.topic));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();
    guard
}

/// Run the review and log any fault before it reaches the exit status.
async fn run_logged(cli: &Cli) -> anyhow::Result<()> {
    let result = run(cli).await;
    if let Err(e) = &result {
        error!(topic = %cli.topic, error = %format!("{e:#}"), "revcal failed");
    }
    result
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = revcal_core::load_config(Some(&cli.run_dir()), cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    cli.apply_overrides(&mut config);
    config.validate()?;
    std::fs::create_dir_all(&config.work_dir)?;

    info!(
        topic = %config.topic,
        work_dir = %config.work_dir.display(),
        transport = %config.backend.transport,
        "Starting review"
    );

    let review = ReviewLoop::from_config(&config)?;
    let mut printer = ProgressPrinter::new(std::io::stdout());
    let report = review.run(&mut printer).await?;

    if let Some(path) = &config.report {
        report.save(path)?;
        info!(path = %path.display(), "Run report written");
    }

    info!(
        topic = %report.topic,
        reason = %report.stop_reason,
        rounds = report.rounds,
        recall = report.recall(),
        effectiveness = report.effectiveness,
        "Review finished"
    );
    Ok(())
}
