use clap::{Parser, Subcommand};
use docfit::batch::{self, WriteOptions};
use docfit::bounds::BoundsTable;
use docfit::imaging::RustBackend;
use docfit::normalize::{Normalizer, Report};
use docfit::{config, logging, output};
use std::path::PathBuf;
use std::process::ExitCode;

/// Shared flags for commands that read images.
#[derive(clap::Args, Clone)]
struct InputArgs {
    /// Image files, or directories to search for images
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Document category: portrait-photo, signature or company-logo
    /// (the Dutch pasfoto, handtekening and bedrijfslogo also work)
    #[arg(long, short)]
    category: String,

    /// Print results as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
#[command(name = "docfit")]
#[command(about = "Resize document photos, signatures and logos to the required pixel bounds")]
#[command(long_about = "\
Resize document photos, signatures and logos to the required pixel bounds

Each category has a minimum and a maximum size. Images are scaled up until
both sides reach the minimum, then down until neither exceeds the maximum.
The aspect ratio is always preserved and the result is saved as PNG.

Categories:

  portrait-photo   min 276 x 355   max 551 x 709
  signature        min 354 x 108   max 945 x 287
  company-logo     min 315 x 127   max 945 x 382

Run 'docfit gen-config' to generate a documented docfit.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = defaults)
    #[arg(long, default_value = "docfit.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resize images and write resized_<name>.png files
    Normalize {
        #[command(flatten)]
        input: InputArgs,

        /// Write outputs here instead of next to each input
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Report what normalize would do, without writing anything
    Check(InputArgs),
    /// Print the bounds for every category
    Categories,
    /// Print a stock docfit.toml with all options documented
    GenConfig,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let reports = match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(ExitCode::SUCCESS);
        }
        Command::Categories => {
            output::print_bounds_table(&BoundsTable::standard()?);
            return Ok(ExitCode::SUCCESS);
        }
        Command::Normalize { input, out_dir } => {
            let app_config = config::load_config(&cli.config)?;
            let write = WriteOptions {
                filename_prefix: app_config.output.filename_prefix.clone(),
                directory: out_dir.or_else(|| app_config.output.directory.clone()),
            };
            let reports = run(&app_config, &input, Some(&write))?;
            emit(&reports, input.json)?;
            reports
        }
        Command::Check(input) => {
            let app_config = config::load_config(&cli.config)?;
            let reports = run(&app_config, &input, None)?;
            emit(&reports, input.json)?;
            reports
        }
    };

    if reports.iter().all(|r| r.success) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Build the normalizer from config and process every input.
fn run(
    app_config: &config::AppConfig,
    input: &InputArgs,
    write: Option<&WriteOptions>,
) -> Result<Vec<Report>, Box<dyn std::error::Error>> {
    let log = logging::build(&app_config.logging)?;
    init_thread_pool(&app_config.processing);

    let backend = RustBackend::with_max_decode_bytes(app_config.processing.max_decode_bytes());
    let normalizer = Normalizer::with_backend(backend, BoundsTable::standard()?, log.dispatch.clone());

    let inputs = batch::collect_inputs(&input.paths)?;
    tracing::dispatcher::with_default(&log.dispatch, || {
        tracing::info!(
            files = inputs.len(),
            category = %input.category,
            log_file = ?log.file,
            "docfit {} starting",
            env!("CARGO_PKG_VERSION")
        );
    });

    Ok(batch::run(&normalizer, &inputs, &input.category, write))
}

fn emit(reports: &[Report], json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(reports)?);
    } else {
        output::print_reports(reports);
    }
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
