//! Employee reconciliation pipeline: provider fetch, manager-first ordering,
//! Employee find-or-create, Person projection, and completion notification.

pub mod domain;
pub mod memory;
pub mod person;
pub mod provider;
pub mod reconciler;
pub mod repository;
pub mod router;
pub mod service;
pub mod sorter;

#[cfg(test)]
mod tests;

pub use domain::{
    AccountToken, Employee, EmployeeId, EmploymentStatus, ExternalEmployee, ExternalEmployeeId,
    OrganizationId, Person, PersonField, PersonId, SyncRecordError, SyncResult, UserId,
};
pub use memory::{InMemoryEmployeeRepository, InMemoryPersonRepository, RecordingNotifier};
pub use person::{PersonEdit, PersonProjection, PersonProjector, ProjectionError};
pub use provider::{
    ExportDirectoryProvider, HrisProvider, ProviderError, StaticProvider,
};
pub use reconciler::{EmployeeReconciler, ReconcileAction, RunLedger};
pub use repository::{
    EmployeeRepository, EmployeeSyncCompleted, NotifyError, PersonRepository, RepositoryError,
    SyncNotifier, TracingNotifier, EMPLOYEE_SYNC_COMPLETED,
};
pub use router::{sync_router, SyncRequest, SyncRunGuard};
pub use service::{EmployeeSyncService, RecordError, SyncCancellation, SyncError};
pub use sorter::{sort_by_manager, SortedBatch};
