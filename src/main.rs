use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use sharefolio::cli::login::resolve_credentials;
use sharefolio::core::HistoricalPeriod;
use sharefolio::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Username to log in with; prompted for when missing
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Password to log in with; prompted for when missing
    #[arg(short, long, global = true, env = "SHAREFOLIO_PASSWORD")]
    password: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for sharefolio::AppCommand {
    fn from(cmd: Commands) -> sharefolio::AppCommand {
        match cmd {
            Commands::Summary => sharefolio::AppCommand::Summary,
            Commands::Holdings => sharefolio::AppCommand::Holdings,
            Commands::Allocation => sharefolio::AppCommand::Allocation,
            Commands::Returns { period } => sharefolio::AppCommand::Returns(period),
            Commands::Dashboard => sharefolio::AppCommand::Dashboard,
            Commands::Setup | Commands::HashPassword { .. } => {
                unreachable!("Local commands should be handled separately")
            }
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Print an argon2 hash for a password to paste into the configuration
    HashPassword {
        /// Password to hash; prompted for when missing
        password: Option<String>,
    },
    /// Display your portfolio summary
    Summary,
    /// Display your share of every holding
    Holdings,
    /// Display your allocation by industry
    Allocation,
    /// Display per-position returns over a period
    Returns {
        /// Period to compare against: 1D, 1W, 1M or 1Y
        #[arg(default_value = "1Y")]
        period: HistoricalPeriod,
    },
    /// Interactive view with on-demand refresh
    Dashboard,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => sharefolio::cli::setup::setup(),
        Some(Commands::HashPassword { password }) => hash_password(password),
        Some(cmd) => match resolve_credentials(cli.user, cli.password) {
            Ok(credentials) => {
                sharefolio::run_command(cmd.into(), cli.config_path.as_deref(), &credentials)
                    .await
            }
            Err(e) => Err(e),
        },
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn hash_password(password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => {
            let term = console::Term::stderr();
            term.write_str("Password: ")?;
            term.read_secure_line()?
        }
    };
    println!("{}", sharefolio::core::auth::hash_password(&password)?);
    Ok(())
}
