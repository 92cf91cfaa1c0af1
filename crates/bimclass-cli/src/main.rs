mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use bimclass_core::Category;
use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bimclass")]
#[command(about = "Extract element features from a building model and apply classification codes")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the feature records as JSON, with a CSV copy beside it
    #[command(after_help = "\
Examples:
  bimclass export --model tower.json -o features.json
  bimclass export --model tower.json -o walls.json --category walls --category floors")]
    Export {
        #[command(flatten)]
        model: ModelArgs,

        /// Destination JSON file; the CSV is written with the same stem
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Run the external classifier and write its codes back into the model
    #[command(after_help = "\
Examples:
  bimclass classify --model tower.json --classifier python \\
      --classifier-arg classify.py --work-dir /tmp/bimclass
  BIMCLASS_CLASSIFIER=./classifier bimclass classify --model tower.json --timeout-secs 0")]
    Classify {
        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        classifier: ClassifierArgs,

        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Print tool name, version, and description
    Info,
}

#[derive(Args)]
pub struct ModelArgs {
    /// Model snapshot file
    #[arg(long, short = 'm', env = "BIMCLASS_MODEL")]
    pub model: PathBuf,

    /// Category to scan (repeatable); defaults to every supported category
    #[arg(long = "category", value_name = "NAME")]
    pub categories: Vec<Category>,
}

#[derive(Args)]
pub struct ClassifierArgs {
    /// Classifier executable
    #[arg(long, env = "BIMCLASS_CLASSIFIER")]
    pub classifier: PathBuf,

    /// Argument placed before the input paths (repeatable)
    #[arg(long = "classifier-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub classifier_args: Vec<String>,

    /// Directory for the interchange and result files [default: <tmp>/bimclass]
    #[arg(long, env = "BIMCLASS_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Trained model directory passed to the classifier [default: work dir]
    #[arg(long, env = "BIMCLASS_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Seconds to wait for the classifier; 0 waits indefinitely
    #[arg(long, env = "BIMCLASS_TIMEOUT_SECS", default_value_t = 900)]
    pub timeout_secs: u64,
}

#[derive(Args)]
pub struct PolicyArgs {
    /// Parameter receiving the classification code
    #[arg(long, default_value = "Classification.Uniclass.Ss.Number")]
    pub primary_parameter: String,

    /// Text parameter used when the primary one is missing or read-only
    #[arg(long, default_value = "Comments")]
    pub fallback_parameter: String,

    /// Label prefixed to codes written to the fallback parameter
    #[arg(long, default_value = "Uniclass")]
    pub fallback_label: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
    tracing::info!("bimclass v{}", env!("CARGO_PKG_VERSION"));

    let outcome = match cli.command {
        Commands::Export { model, output } => commands::export(&model, output.as_deref())?,
        Commands::Classify {
            model,
            classifier,
            policy,
        } => commands::classify(&model, &classifier, &policy).await?,
        Commands::Info => {
            commands::info();
            return Ok(ExitCode::SUCCESS);
        }
    };

    commands::report(&outcome);
    Ok(ExitCode::from(outcome.exit_code() as u8))
}
