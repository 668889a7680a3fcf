use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing_subscriber::EnvFilter;
use webpify::imaging::RustBackend;
use webpify::process::{self, Pipeline};
use webpify::transcode::Transcoder;
use webpify::{config, markup, output};

/// Exit status after Ctrl-C, matching the shell convention for SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser)]
#[command(name = "webpify")]
#[command(about = "Convert PNG and JPEG images to WebP, skipping ones already converted")]
#[command(long_about = "\
Convert PNG and JPEG images to WebP, skipping ones already converted

Every .png, .jpg and .jpeg directly inside each directory is converted to a
.webp file with the same stem, next to the original. Subdirectories are not
visited. A .webp that is at least as new as its source is left alone.

  images/pages/
  ├── 001-cover.png      → 001-cover.webp
  ├── 002-spread.jpg     → 002-spread.webp
  └── 002-spread.webp    (up to date, skipped)

Images with transparency keep their alpha channel. Originals are never
modified.

Run 'webpify gen-config' to generate a documented webpify.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert images to WebP
    Convert {
        /// Directories or files to convert (default: configured directories)
        paths: Vec<PathBuf>,
        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show what convert would do without writing anything
    Check {
        /// Directories or files to check (default: configured directories)
        paths: Vec<PathBuf>,
    },
    /// Point <img> tags in a document at the .webp files
    Rewrite {
        /// HTML document to update in place
        document: PathBuf,
        /// Report counts without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Print a stock webpify.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Convert { paths, json } => {
            let config = config::load_config(&cli.config)?;
            init_thread_pool(&config.processing);
            let targets = targets_or_configured(paths, &config);

            let transcoder = Transcoder::with_backend(RustBackend::new(), config.transcode_settings());
            let pipeline = Pipeline::new(transcoder);
            let cancel = pipeline.cancel_flag();
            ctrlc::set_handler(move || {
                cancel.store(true, Ordering::SeqCst);
            })?;

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    if !json {
                        output::print_event(&event);
                    }
                }
            });
            let result = pipeline.run(&targets, Some(tx));
            printer.join().map_err(|_| "progress printer panicked")?;
            let summary = result?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary.report())?);
            } else {
                output::print_summary(&summary);
            }
            if summary.interrupted() {
                std::process::exit(EXIT_INTERRUPTED);
            }
        }
        Command::Check { paths } => {
            let config = config::load_config(&cli.config)?;
            let targets = targets_or_configured(paths, &config);
            let planned = process::plan(&targets)?;
            output::print_plan(&planned);
        }
        Command::Rewrite { document, dry_run } => {
            let stats = markup::rewrite_file(&document, dry_run)?;
            output::print_rewrite(&document, &stats, dry_run);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr so stdout carries only the report.
///
/// `RUST_LOG` wins when set; otherwise `-v` flags pick the level.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores — user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Command-line paths replace the configured directories for this run.
fn targets_or_configured(paths: Vec<PathBuf>, config: &config::Config) -> Vec<PathBuf> {
    if paths.is_empty() {
        config.directories.clone()
    } else {
        paths
    }
}
