use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use workforce_sync::workforce::{
    EmployeeRepository, EmployeeSyncService, HrisProvider, PersonProjector, PersonRepository,
    TracingNotifier,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wires a sync service with person projection and log-only completion events.
pub(crate) fn build_sync_service(
    provider: Arc<dyn HrisProvider>,
    employees: Arc<dyn EmployeeRepository>,
    persons: Arc<dyn PersonRepository>,
    source_system: &str,
) -> EmployeeSyncService {
    EmployeeSyncService::new(
        provider,
        employees,
        Arc::new(PersonProjector::new(persons)),
        Arc::new(TracingNotifier),
        source_system,
    )
}
