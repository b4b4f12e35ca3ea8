use crate::server;
use crate::sync::{run_sync, SyncArgs};
use clap::{Args, Parser, Subcommand};
use workforce_sync::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Workforce Sync",
    about = "Serve or run HRIS employee synchronization from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Sync an employee export file once and print the result as JSON
    Sync(SyncArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Sync(args) => run_sync(args),
    }
}
