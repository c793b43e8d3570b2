use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Verdict;

#[derive(Parser)]
#[command(
    name = "cloudlift",
    about = "On-premise Active Directory to Microsoft Entra ID migration",
    version
)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "cloudlift.toml")]
    config: String,

    /// Target environment (dev, staging, prod, or a configured name)
    #[arg(long, default_value = "dev")]
    env: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Destination tenant domain used for new principal names
        #[arg(long)]
        domain: String,
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
    /// Classify the source export against the destination directory
    Analyze,
    /// Create the planned accounts and group memberships
    Migrate {
        /// Only check existence; create nothing
        #[arg(long)]
        dry_run: bool,
        /// Print temporary passwords of created accounts as CSV
        #[arg(long)]
        export_passwords: bool,
    },
    /// Render the final text report from stored artifacts
    Report,
    /// Analyze, migrate and report in one pass
    Run {
        /// Only check existence; create nothing
        #[arg(long)]
        dry_run: bool,
        /// Print temporary passwords of created accounts as CSV
        #[arg(long)]
        export_passwords: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let verdict = match cli.command {
        Commands::Init { domain, force } => {
            commands::init::run(&cli.config, &domain, force).await?;
            Verdict::success()
        }
        Commands::Analyze => {
            commands::analyze::run(&cli.config, &cli.env).await?;
            Verdict::success()
        }
        Commands::Migrate {
            dry_run,
            export_passwords,
        } => commands::migrate::run(&cli.config, &cli.env, dry_run, export_passwords).await?,
        Commands::Report => {
            commands::report::run(&cli.config, &cli.env).await?;
            Verdict::success()
        }
        Commands::Run {
            dry_run,
            export_passwords,
        } => commands::run::run(&cli.config, &cli.env, dry_run, export_passwords).await?,
    };

    if verdict.fatal {
        error!(
            failed = verdict.failed,
            environment = %cli.env,
            "production run has failed accounts"
        );
        std::process::exit(1);
    }

    Ok(())
}
