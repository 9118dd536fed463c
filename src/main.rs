use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use inti::cli::{company, output};
use inti::config::env::ENV_LOG_LEVEL;
use inti::oauth::SystemBrowser;
use inti::{Client, IntiError, Settings};

#[derive(Parser)]
#[command(name = "inti", version, about = "Command line client for the Intigriti company API")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log level or filter directive (e.g. debug, inti=trace)
    #[arg(long, global = true, env = ENV_LOG_LEVEL)]
    log: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Company API commands
    Company {
        #[command(subcommand)]
        action: CompanyAction,
    },
}

#[derive(Subcommand)]
enum CompanyAction {
    /// List the company's programs
    #[command(visible_alias = "ls", alias = "list-programs")]
    List,

    /// List submissions, optionally for a single program
    #[command(visible_alias = "sub", alias = "list-submissions")]
    Submissions {
        /// Program id; `*` or omitted means all programs
        program_id: Option<String>,

        /// Only show submissions that still need work
        #[arg(long)]
        active: bool,
    },

    /// Check whether an IP address is known to the platform
    #[command(alias = "check-ip")]
    Ip {
        /// IPv4 or IPv6 address
        address: String,
    },

    /// Authenticate and report the result
    Auth,
}

fn init_tracing(directive: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(directive)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = inti::config::load_settings(cli.config.as_deref());
    let directive = cli
        .log
        .clone()
        .or_else(|| {
            loaded
                .as_ref()
                .ok()
                .and_then(|(settings, _)| settings.log.level.clone())
        })
        .unwrap_or_else(|| "warn".to_string());
    init_tracing(&directive);

    let json = cli.json;
    let result = match loaded {
        Ok((settings, path)) => run(cli.command, settings, &path, json).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        output::print_error(&e, json);
        std::process::exit(1);
    }
}

async fn run(command: Commands, settings: Settings, config_path: &Path, json: bool) -> Result<(), IntiError> {
    let Commands::Company { action } = command;

    let ip = match &action {
        CompanyAction::Ip { address } => Some(company::parse_ip_argument(address)?),
        _ => None,
    };

    let cached = settings.cache.to_token();
    let client = Client::new(settings.client_options(Some(Arc::new(SystemBrowser)))?)?;

    match action {
        CompanyAction::List => company::run_list(&client, json).await?,
        CompanyAction::Submissions { program_id, active } => {
            company::run_submissions(&client, program_id.as_deref(), active, json).await?
        }
        CompanyAction::Ip { .. } => {
            if let Some(ip) = ip {
                company::run_ip(&client, ip, json).await?;
            }
        }
        CompanyAction::Auth => company::run_auth(&client, json).await?,
    }

    if let Some(token) = client.token().await {
        if cached.as_ref() != Some(&token) {
            if let Err(e) = inti::config::cache_token(config_path, &token) {
                tracing::warn!(error = %e, config = %config_path.display(), "could not cache token");
            }
        }
    }
    Ok(())
}
