use anyhow::Result;
use biograph::adapters;
use biograph::config::{AdapterOptions, PipelineConfig};
use biograph::pipeline::Pipeline;
use biograph::schema::SchemaMap;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "biograph")]
#[command(about = "Build Neo4j bulk-import CSVs from biological data sources")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run selected adapters and write a timestamped output directory
    Run(RunArgs),
    /// List registered adapters and their group tags
    List,
}

#[derive(Args)]
struct RunArgs {
    /// Adapter names, group tags, or "all"
    #[arg(required = true)]
    adapters: Vec<String>,

    /// Root directory for timestamped run output
    #[arg(short, long, default_value = biograph::config::DEFAULT_OUTPUT_ROOT)]
    output: PathBuf,

    /// Schema mapping file (source labels to output types)
    #[arg(long, default_value = biograph::config::DEFAULT_SCHEMA_PATH)]
    schema: PathBuf,

    /// Directory for cached source snapshots
    #[arg(long, default_value = biograph::config::DEFAULT_CACHE_DIR)]
    cache_dir: PathBuf,

    /// Cap every adapter at 100 records (deterministic, for testing)
    #[arg(long)]
    test_mode: bool,

    /// Skip network strategies; only cached snapshots are used
    #[arg(long)]
    offline: bool,

    /// Re-download sources even when a cached snapshot exists
    #[arg(long)]
    no_cache: bool,

    /// NCBI taxonomy id filter for organism-scoped sources
    #[arg(long, default_value = biograph::config::DEFAULT_ORGANISM)]
    organism: String,

    /// Normalized confidence threshold for interaction sources
    #[arg(long, default_value_t = biograph::config::DEFAULT_SCORE_THRESHOLD)]
    score_threshold: f64,

    /// Entities buffered per output type before a part file is flushed
    #[arg(long, default_value_t = biograph::config::BATCH_SIZE)]
    batch_size: usize,
}

fn run_pipeline(args: RunArgs) -> Result<()> {
    let mut config = PipelineConfig {
        output_root: args.output,
        cache_dir: args.cache_dir,
        schema_path: args.schema,
        test_mode: args.test_mode,
        offline: args.offline,
        batch_size: args.batch_size,
        ..Default::default()
    };

    let schema = SchemaMap::load(&config.schema_path)?;
    info!(
        entries = schema.len(),
        schema = %config.schema_path.display(),
        "Schema mapping loaded"
    );
    // CLI-level organism/threshold apply to every adapter; adapters that a
    // given option does not concern validate and ignore it.
    for descriptor in adapters::registry() {
        config.adapter_options.insert(
            descriptor.name.to_string(),
            AdapterOptions {
                organism: Some(args.organism.clone()),
                score_threshold: Some(args.score_threshold),
                use_cache: !args.no_cache,
                ..Default::default()
            },
        );
    }

    let mut pipeline = Pipeline::new(config, schema);
    let report = pipeline.run(&args.adapters)?;
    report.print_summary();

    if report.failed_count() > 0 {
        anyhow::bail!("{} adapter(s) failed; see report above", report.failed_count());
    }
    Ok(())
}

fn run_list() -> Result<()> {
    println!("Registered adapters:");
    for descriptor in adapters::registry() {
        println!(
            "  {:<10} [{}]  {}",
            descriptor.name,
            descriptor.groups.join(", "),
            descriptor.description
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let result = match cli.command {
        Commands::Run(args) => run_pipeline(args),
        Commands::List => run_list(),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
