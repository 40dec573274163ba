use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use tierline::auth::Signer;
use tierline::cli::{retry_policy, startup_error, CliOutcome, EXIT_FAILURE};
use tierline::client::PipelineClient;
use tierline::config::{env, PipelineConfig, SignatureScheme};
use tierline::http::shutdown_on_ctrl_c;
use tierline::observability::logging;
use tierline::pipeline::ProgressReport;
use tierline::resilience::CancelToken;

#[derive(Parser)]
#[command(name = "tierline-cli")]
#[command(about = "Command-line client for the tierline pipeline", long_about = None)]
struct Cli {
    #[arg(short, long, env = "TIERLINE_URL", default_value = "http://localhost:8080")]
    url: String,

    /// Key identifying this caller to the pipeline
    #[arg(long, env = "TIERLINE_CALLER_KEY")]
    caller_key: Option<String>,

    /// Shared signing secret
    #[arg(long, env = "TIERLINE_SIGNING_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Bearer key for the admin routes
    #[arg(long, env = "TIERLINE_ADMIN_KEY", hide_env_values = true)]
    admin_key: Option<String>,

    /// Attempts per command, including the first
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Sign the body only (legacy servers)
    #[arg(long)]
    body_only: bool,

    /// Debug logging and per-tier failure trail
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve a settings value
    Settings { key: String },
    /// Report task progress
    Progress {
        task_id: String,
        #[arg(long)]
        percent: u8,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        message: Option<String>,
    },
    /// List the tier table (admin)
    Tiers,
    /// Show server status (admin)
    Status,
    /// Re-submit queued progress reports (admin)
    Flush,
}

#[tokio::main]
async fn main() -> ExitCode {
    env::load_dotenv();
    let cli = Cli::parse();
    logging::init_cli_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprint!("{}", startup_error(e.as_ref()));
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    // TIERLINE_RETRY_* tuning is shared with the server.
    let mut config = PipelineConfig::default();
    env::apply_env_overrides(&mut config, std::env::vars())?;

    let policy = retry_policy(&config.retries, cli.max_attempts)?;

    if cli.secret.is_some() {
        config.signing.secret = cli.secret;
    }
    if cli.body_only {
        config.signing.scheme = SignatureScheme::BodyOnly;
    }
    let signer = Signer::from_config(&config.signing)?;
    let caller_key = cli.caller_key.unwrap_or(config.signing.caller_key);

    let client = PipelineClient::new(&cli.url, caller_key, signer)?
        .with_policy(policy)
        .with_admin_key(cli.admin_key);

    let cancel = CancelToken::new();
    tokio::spawn(shutdown_on_ctrl_c(cancel.clone()));

    let outcome = match cli.command {
        Commands::Settings { key } => CliOutcome::from_fetched(client.retrieve_settings(&key, &cancel).await),
        Commands::Progress {
            task_id,
            percent,
            status,
            message,
        } => {
            let mut report = ProgressReport::new(task_id, percent);
            if let Some(status) = status {
                report.status = status;
            }
            report.message = message;
            CliOutcome::from_fetched(client.report_progress(&report, &cancel).await)
        }
        Commands::Tiers => CliOutcome::from_value(client.admin_tiers().await),
        Commands::Status => CliOutcome::from_value(client.admin_status().await),
        Commands::Flush => CliOutcome::from_value(client.admin_flush().await),
    };

    if let Some(text) = outcome.stdout() {
        print!("{text}");
        std::io::stdout().flush()?;
    }
    if let Some(text) = outcome.stderr(cli.verbose) {
        eprint!("{text}");
    }

    Ok(ExitCode::from(outcome.exit_code()))
}
