use crate::infra::build_sync_service;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use workforce_sync::config::AppConfig;
use workforce_sync::error::AppError;
use workforce_sync::telemetry;
use workforce_sync::workforce::{
    AccountToken, InMemoryEmployeeRepository, InMemoryPersonRepository, OrganizationId,
    StaticProvider, SyncResult, UserId,
};

#[derive(Args, Debug)]
pub(crate) struct SyncArgs {
    /// Employee export to sync (JSON array, `{"results": [...]}` pages, or CSV)
    #[arg(long)]
    pub(crate) export: PathBuf,
    /// Organization the synced employees belong to
    #[arg(long)]
    pub(crate) organization: String,
    /// User recorded as creator and last editor of projected persons
    #[arg(long, default_value = "cli")]
    pub(crate) actor: String,
}

pub(crate) fn run_sync(args: SyncArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let result = sync_export(args, &config.hris.source_system)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn sync_export(args: SyncArgs, source_system: &str) -> Result<SyncResult, AppError> {
    let SyncArgs {
        export,
        organization,
        actor,
    } = args;

    let provider = Arc::new(StaticProvider::from_path(&export)?);
    let service = build_sync_service(
        provider,
        Arc::new(InMemoryEmployeeRepository::default()),
        Arc::new(InMemoryPersonRepository::default()),
        source_system,
    );

    let result = service.sync_employees(
        &AccountToken(export.display().to_string()),
        &OrganizationId(organization),
        &UserId(actor),
    )?;
    Ok(result)
}
