use std::io::Stdout;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use recon_core::config::DEFAULT_MAX_CONCURRENT_DECODES;
use recon_core::{BlockPipeline, PipelineConfig};
use recon_data::source::JsonLinesSource;
use recon_data::store::{JsonLinesSink, Sink, Store};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "recon")]
#[command(about = "Reconstruct Ethereum blocks from source-chain invocations")]
#[command(version)]
struct Cli {
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[arg(long, global = true, env = "RECON_DB_PATH", default_value = "data/recon.sqlite")]
    db_path: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stream blocks from a JSON-lines file through the pipeline into a sink.
    Run(RunArgs),
    /// Show stored item counts for one block.
    Status(StatusArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// One source block per line.
    #[arg(long, env = "RECON_INPUT")]
    input: PathBuf,

    #[arg(long, env = "RECON_STARTING_BLOCK", default_value_t = 0)]
    starting_block: u64,

    #[arg(long, env = "RECON_SINK", value_enum, default_value_t = SinkKind::Sqlite)]
    sink: SinkKind,

    /// Abort a block if any invocation lacks a transaction index.
    #[arg(long)]
    require_index: bool,

    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_DECODES)]
    max_concurrent_decodes: usize,
}

#[derive(Args, Debug)]
struct StatusArgs {
    #[arg(long)]
    block: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SinkKind {
    /// SQLite database at `--db-path`.
    Sqlite,
    /// JSON lines on standard output.
    Stdout,
}

/// Resolved settings for one `run`.
#[derive(Debug, Clone)]
struct IndexerConfig {
    input: PathBuf,
    starting_block: u64,
    sink: SinkKind,
    db_path: String,
    pipeline: PipelineConfig,
}

impl IndexerConfig {
    fn from_args(db_path: String, args: RunArgs) -> Self {
        Self {
            input: args.input,
            starting_block: args.starting_block,
            sink: args.sink,
            db_path,
            pipeline: PipelineConfig::default()
                .with_require_transaction_index(args.require_index)
                .with_max_concurrent_decodes(args.max_concurrent_decodes),
        }
    }
}

enum SinkTarget {
    Sqlite(Store),
    Stdout(JsonLinesSink<Stdout>),
}

impl SinkTarget {
    fn open(config: &IndexerConfig) -> Result<Self> {
        match config.sink {
            SinkKind::Sqlite => Ok(Self::Sqlite(
                Store::new(&config.db_path).wrap_err("failed to open SQLite store")?,
            )),
            SinkKind::Stdout => Ok(Self::Stdout(JsonLinesSink::new(std::io::stdout()))),
        }
    }

    fn sink(&self) -> &dyn Sink {
        match self {
            Self::Sqlite(store) => store,
            Self::Stdout(out) => out,
        }
    }

    fn already_stored(&self, block_number: u64) -> Result<bool> {
        match self {
            Self::Sqlite(store) => store.block_exists(block_number),
            Self::Stdout(_) => Ok(false),
        }
    }
}

#[derive(Debug, Default)]
struct RunSummary {
    processed: u64,
    skipped: u64,
    failed: u64,
    items_written: usize,
    dropped_invocations: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    match cli.command {
        Commands::Run(args) => handle_run(IndexerConfig::from_args(cli.db_path, args)).await,
        Commands::Status(args) => handle_status(&cli.db_path, args),
    }
}

fn init_tracing(verbose: u8, quiet: bool) -> Result<()> {
    let level = if quiet {
        Level::WARN
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .wrap_err("failed to initialize tracing filter")?;

    // stdout may carry the JSON-lines sink
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn handle_run(config: IndexerConfig) -> Result<()> {
    let target = SinkTarget::open(&config)?;
    let mut source = JsonLinesSource::open(&config.input, config.starting_block).await?;
    let pipeline = BlockPipeline::new(config.pipeline.clone());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .wrap_err("failed to create progress style")?,
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let mut summary = RunSummary::default();
    while let Some(block) = source.next_block().await? {
        let Some(block_number) = block.header.number else {
            tracing::error!("source block without a number, skipping");
            summary.failed += 1;
            continue;
        };
        pb.set_message(format!("block {block_number}"));

        if target.already_stored(block_number)? {
            tracing::debug!(block_number, "block already stored, skipping");
            summary.skipped += 1;
            continue;
        }

        let output = match pipeline.process_block(block).await {
            Ok(output) => output,
            Err(e) => {
                tracing::error!(block_number, error = %e, "block reconstruction failed");
                summary.failed += 1;
                continue;
            }
        };

        let written = target
            .sink()
            .write_items(block_number, &output.items)
            .wrap_err_with(|| format!("failed to write block {block_number}"))?;
        summary.processed += 1;
        summary.items_written += written;
        summary.dropped_invocations += output.dropped.len();
    }

    pb.finish_with_message("run completed");
    print_summary(&config, &summary);
    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        failed = summary.failed,
        items = summary.items_written,
        input = %config.input.display(),
        "run command finished"
    );

    Ok(())
}

fn print_summary(config: &IndexerConfig, summary: &RunSummary) {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Metric", "Value"]);

    table.add_row(vec!["Input", &config.input.display().to_string()]);
    table.add_row(vec!["Blocks Processed", &summary.processed.to_string()]);
    table.add_row(vec!["Blocks Skipped", &summary.skipped.to_string()]);
    table.add_row(vec!["Blocks Failed", &summary.failed.to_string()]);
    table.add_row(vec!["Items Written", &summary.items_written.to_string()]);
    table.add_row(vec![
        "Dropped Invocations",
        &summary.dropped_invocations.to_string(),
    ]);

    // summary goes to stderr so stdout stays machine-readable
    eprintln!("\n{}\n", table);
}

fn handle_status(db_path: &str, args: StatusArgs) -> Result<()> {
    let store = Store::new(db_path).wrap_err("failed to open SQLite store")?;
    let counts = store
        .collection_counts(args.block)
        .wrap_err("failed to query collection counts")?;

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Collection", "Items"]);

    table.add_row(vec!["Database Path", db_path]);
    table.add_row(vec!["Block", &args.block.to_string()]);
    table.add_row(vec!["header", &counts.headers.to_string()]);
    table.add_row(vec!["transactions", &counts.transactions.to_string()]);
    table.add_row(vec!["receipts", &counts.receipts.to_string()]);
    table.add_row(vec!["logs", &counts.logs.to_string()]);

    println!("\n{}\n", table);

    info!(
        block = args.block,
        stored = counts.headers > 0,
        transactions = counts.transactions,
        logs = counts.logs,
        "status command finished"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_args_build_pipeline_config() {
        let cli = Cli::try_parse_from([
            "recon",
            "--db-path",
            "/tmp/recon-test.sqlite",
            "run",
            "--input",
            "blocks.jsonl",
            "--sink",
            "stdout",
            "--require-index",
            "--max-concurrent-decodes",
            "0",
        ])
        .expect("arguments should parse");

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        let config = IndexerConfig::from_args(cli.db_path, args);

        assert_eq!(config.sink, SinkKind::Stdout);
        assert_eq!(config.input, PathBuf::from("blocks.jsonl"));
        assert!(config.pipeline.require_transaction_index);
        // zero is raised to one
        assert_eq!(config.pipeline.max_concurrent_decodes, 1);
    }

    #[test]
    fn status_requires_block() {
        assert!(Cli::try_parse_from(["recon", "status"]).is_err());
    }

    #[test]
    fn sqlite_target_reports_stored_blocks() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let db_path = dir.path().join("recon.sqlite");
        let config = IndexerConfig {
            input: PathBuf::from("unused.jsonl"),
            starting_block: 0,
            sink: SinkKind::Sqlite,
            db_path: db_path.to_string_lossy().into_owned(),
            pipeline: PipelineConfig::default(),
        };

        let target = SinkTarget::open(&config).expect("store should open");
        assert!(!target.already_stored(1).expect("query should succeed"));
    }
}
