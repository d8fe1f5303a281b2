use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use eco_graph::{
    load_records_from_paths, write_artifacts, BuildReport, ExportConfig, ExportedArtifacts,
    GraphBuilder, OpeningBook, OpeningMatch,
};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    print_stdout(&serde_json::to_string_pretty(value)?)
}

#[derive(Parser)]
#[command(name = "eco-theory")]
#[command(about = "Build and query a transposition-merged ECO opening graph", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build eco_theory.json and eco_index.json from ECO TSV files
    Build(BuildArgs),

    /// Identify the named opening for a position
    Identify(LookupArgs),

    /// List theory moves from a position
    Moves(LookupArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// ECO dataset files (tab-separated: eco, name, pgn), read in order
    #[arg(short, long = "input", required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,

    /// Output directory for the artifacts
    #[arg(long, default_value = "public/data")]
    out_dir: PathBuf,

    /// File name of the full graph artifact
    #[arg(long, default_value = "eco_theory.json")]
    graph_file: String,

    /// File name of the per-code index artifact
    #[arg(long, default_value = "eco_index.json")]
    index_file: String,
}

#[derive(Args)]
struct LookupArgs {
    /// Full graph artifact produced by `build`
    #[arg(long, default_value = "public/data/eco_theory.json")]
    db: PathBuf,

    /// Position to look up
    #[arg(long)]
    fen: String,
}

#[derive(Serialize)]
struct BuildSummary {
    records: usize,
    malformed_rows: usize,
    processed: usize,
    skipped: usize,
    parse_failures: usize,
    illegal_mid_line: usize,
    unique_positions: usize,
    artifacts: ExportedArtifacts,
}

impl BuildSummary {
    fn new(
        records: usize,
        malformed_rows: usize,
        report: &BuildReport,
        artifacts: ExportedArtifacts,
    ) -> Self {
        Self {
            records,
            malformed_rows,
            processed: report.processed,
            skipped: report.skipped,
            parse_failures: report.parse_failures,
            illegal_mid_line: report.illegal_mid_line,
            unique_positions: report.unique_positions,
            artifacts,
        }
    }
}

#[derive(Serialize)]
struct IdentifyOutput {
    fen: String,
    opening: Option<OpeningMatch>,
}

#[derive(Serialize)]
struct MovesOutput {
    fen: String,
    moves: Vec<String>,
}

pub fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Build(args) => run_build(args)?,
        Commands::Identify(args) => run_identify(args)?,
        Commands::Moves(args) => run_moves(args)?,
    }

    Ok(())
}

fn run_build(args: BuildArgs) -> Result<()> {
    let loaded = load_records_from_paths(args.inputs.as_slice())
        .context("Failed to load ECO datasets")?;

    let (graph, report) = GraphBuilder::standard()
        .build(&loaded.records)
        .context("Failed to build move graph")?;

    let config = ExportConfig {
        out_dir: args.out_dir,
        graph_file: args.graph_file,
        index_file: args.index_file,
    };
    let artifacts = write_artifacts(&graph, &config).context("Failed to export artifacts")?;

    log::info!(
        "Processed {} records ({} skipped), {} unique positions",
        report.processed,
        report.skipped,
        report.unique_positions
    );

    print_json(&BuildSummary::new(
        loaded.records.len(),
        loaded.malformed.len(),
        &report,
        artifacts,
    ))
}

fn load_book(path: &Path) -> Result<OpeningBook> {
    OpeningBook::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn run_identify(args: LookupArgs) -> Result<()> {
    let book = load_book(&args.db)?;
    let opening = book.identify(&args.fen);
    if opening.is_none() {
        log::info!("No named opening leads to {}", args.fen);
    }
    print_json(&IdentifyOutput {
        fen: args.fen,
        opening,
    })
}

fn run_moves(args: LookupArgs) -> Result<()> {
    let book = load_book(&args.db)?;
    let moves = book.theory_moves(&args.fen);
    print_json(&MovesOutput {
        fen: args.fen,
        moves,
    })
}
