mod cli;
mod infra;
mod routes;
mod server;
mod sync;

use workforce_sync::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
