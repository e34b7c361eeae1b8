mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;

#[derive(Parser)]
#[command(name = "capp")]
#[command(
    about = "Create or update an Azure container app and everything it needs, in one command",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update a container app with its environment, registry and pipeline
    Up(Box<commands::up::UpCommand>),
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // ログは stderr に出力 (stdout はサマリー用)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), err);
        if let Some(hint) = err
            .downcast_ref::<capp_up::UpError>()
            .and_then(capp_up::UpError::hint)
        {
            eprintln!("{} {}", "Hint:".yellow().bold(), hint);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Version => {
            println!("capp {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Up(cmd) => commands::up::handle(*cmd).await,
    }
}
