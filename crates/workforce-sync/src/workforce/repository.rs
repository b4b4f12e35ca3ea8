use serde::{Deserialize, Serialize};

use super::domain::{
    Employee, EmployeeId, ExternalEmployeeId, OrganizationId, Person, PersonId, SyncResult,
    UserId,
};

/// Storage for tenant Employee rows.
///
/// Implementations keep Employees unique per (organization, remote id) and per
/// (organization, email) and answer `Conflict` when a write would break either.
pub trait EmployeeRepository: Send + Sync {
    /// First Employee in the organization whose remote id or email (case-insensitive) matches.
    fn find_by_remote_id_or_email(
        &self,
        organization_id: &OrganizationId,
        remote_id: &str,
        email: &str,
    ) -> Result<Option<Employee>, RepositoryError>;

    fn find_by_external_id(
        &self,
        organization_id: &OrganizationId,
        external_id: &ExternalEmployeeId,
    ) -> Result<Option<Employee>, RepositoryError>;

    fn insert(&self, employee: Employee) -> Result<Employee, RepositoryError>;

    fn update(&self, employee: Employee) -> Result<Employee, RepositoryError>;
}

/// Storage for Person rows. The projector owns the merge rules on top of it.
pub trait PersonRepository: Send + Sync {
    fn find_by_employee(
        &self,
        employee_id: &EmployeeId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Person>, RepositoryError>;

    fn fetch(
        &self,
        person_id: &PersonId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Person>, RepositoryError>;

    fn insert(&self, person: Person) -> Result<Person, RepositoryError>;

    fn update(&self, person: Person) -> Result<Person, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

pub const EMPLOYEE_SYNC_COMPLETED: &str = "hris.employees.synced";

/// Completion event. Carries counts only; the detailed error list stays with the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSyncCompleted {
    pub organization_id: OrganizationId,
    pub user_id: UserId,
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub error_count: u32,
    pub duration_ms: u64,
}

impl EmployeeSyncCompleted {
    pub fn from_result(
        organization_id: &OrganizationId,
        user_id: &UserId,
        result: &SyncResult,
    ) -> Self {
        Self {
            organization_id: organization_id.clone(),
            user_id: user_id.clone(),
            created: result.created,
            updated: result.updated,
            skipped: result.skipped,
            error_count: result.error_count(),
            duration_ms: result.duration_ms,
        }
    }

    pub const fn name(&self) -> &'static str {
        EMPLOYEE_SYNC_COMPLETED
    }
}

/// Outbound hook for sync completion events (message bus, webhooks, ...).
pub trait SyncNotifier: Send + Sync {
    fn publish(&self, event: EmployeeSyncCompleted) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Logs completion events instead of shipping them anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl SyncNotifier for TracingNotifier {
    fn publish(&self, event: EmployeeSyncCompleted) -> Result<(), NotifyError> {
        tracing::info!(
            event = event.name(),
            organization_id = %event.organization_id,
            user_id = %event.user_id,
            created = event.created,
            updated = event.updated,
            skipped = event.skipped,
            error_count = event.error_count,
            duration_ms = event.duration_ms,
            "employee sync completed"
        );
        Ok(())
    }
}
