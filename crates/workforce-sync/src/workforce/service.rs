use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::domain::{
    AccountToken, ExternalEmployee, OrganizationId, SyncRecordError, SyncResult, UserId,
};
use super::person::{PersonProjection, ProjectionError};
use super::provider::{HrisProvider, ProviderError};
use super::reconciler::{EmployeeReconciler, ReconcileAction, RunLedger};
use super::repository::{
    EmployeeRepository, EmployeeSyncCompleted, RepositoryError, SyncNotifier,
};
use super::sorter::sort_by_manager;

/// Cooperative stop signal for a running sync. Checked before each record.
#[derive(Debug, Clone, Default)]
pub struct SyncCancellation {
    flag: Arc<AtomicBool>,
}

impl SyncCancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// What happened to a single record.
enum RecordOutcome {
    Created,
    Updated,
}

/// Drives a full sync run for one organization and linked account.
///
/// Records are processed one at a time in manager-first order; the reconciler's
/// manager lookup depends on earlier records of the same run having been written.
/// Runs for the same organization must be serialized by the caller.
pub struct EmployeeSyncService {
    provider: Arc<dyn HrisProvider>,
    reconciler: EmployeeReconciler,
    persons: Arc<dyn PersonProjection>,
    notifier: Arc<dyn SyncNotifier>,
}

impl EmployeeSyncService {
    pub fn new(
        provider: Arc<dyn HrisProvider>,
        employees: Arc<dyn EmployeeRepository>,
        persons: Arc<dyn PersonProjection>,
        notifier: Arc<dyn SyncNotifier>,
        source_system: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            reconciler: EmployeeReconciler::new(employees, source_system),
            persons,
            notifier,
        }
    }

    pub fn sync_employees(
        &self,
        token: &AccountToken,
        organization_id: &OrganizationId,
        actor: &UserId,
    ) -> Result<SyncResult, SyncError> {
        self.sync_employees_with(token, organization_id, actor, &SyncCancellation::new())
    }

    /// Like `sync_employees`, stopping before the next record once `cancellation` fires.
    /// A cancelled run still returns and announces its partial result.
    pub fn sync_employees_with(
        &self,
        token: &AccountToken,
        organization_id: &OrganizationId,
        actor: &UserId,
        cancellation: &SyncCancellation,
    ) -> Result<SyncResult, SyncError> {
        let started = Instant::now();
        let batch = self.provider.get_employees(token)?;
        tracing::info!(
            organization_id = %organization_id,
            batch_size = batch.len(),
            "employee sync started"
        );

        let sorted = sort_by_manager(batch);
        for cycle in &sorted.cycles {
            tracing::warn!(
                organization_id = %organization_id,
                members = ?cycle,
                "manager cycle in provider batch; cut at first-seen member"
            );
        }

        let mut result = SyncResult {
            manager_cycles: sorted.cycles,
            ..SyncResult::default()
        };
        for duplicate in &sorted.duplicates {
            tracing::warn!(
                organization_id = %organization_id,
                employee = %duplicate.id,
                "duplicate provider record skipped"
            );
            result.skipped += 1;
        }

        let mut ledger = RunLedger::new();
        for (position, external) in sorted.records.iter().enumerate() {
            if cancellation.is_cancelled() {
                tracing::warn!(
                    organization_id = %organization_id,
                    remaining = sorted.records.len() - position,
                    "employee sync cancelled"
                );
                result.cancelled = true;
                break;
            }

            match self.sync_record(external, organization_id, actor, &mut ledger) {
                Ok(RecordOutcome::Created) => result.created += 1,
                Ok(RecordOutcome::Updated) => result.updated += 1,
                Err(error) => {
                    tracing::warn!(
                        organization_id = %organization_id,
                        employee = %external.id,
                        error = %error,
                        "employee sync record failed"
                    );
                    result.errors.push(SyncRecordError {
                        employee_id: external.id.clone(),
                        error: error.to_string(),
                    });
                }
            }
        }

        result.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.announce(organization_id, actor, &result);

        tracing::info!(
            organization_id = %organization_id,
            processed = result.processed(),
            created = result.created,
            updated = result.updated,
            skipped = result.skipped,
            errors = result.errors.len(),
            duration_ms = result.duration_ms,
            cancelled = result.cancelled,
            "employee sync finished"
        );
        Ok(result)
    }

    fn sync_record(
        &self,
        external: &ExternalEmployee,
        organization_id: &OrganizationId,
        actor: &UserId,
        ledger: &mut RunLedger,
    ) -> Result<RecordOutcome, RecordError> {
        let reconciled = self.reconciler.reconcile(external, organization_id, ledger)?;
        ledger.record(external.id.clone(), &reconciled.employee);
        tracing::debug!(
            organization_id = %organization_id,
            employee = %external.id,
            employee_id = %reconciled.employee.id,
            inserted = reconciled.action == ReconcileAction::Created,
            "employee reconciled"
        );
        let employee = reconciled.employee;

        match self.persons.find_by_employee(&employee.id, organization_id)? {
            Some(person) => {
                self.persons
                    .sync_from_employee(&person.id, &employee, actor, organization_id)?;
                Ok(RecordOutcome::Updated)
            }
            None => {
                self.persons
                    .create_from_employee(&employee, actor, organization_id)?;
                Ok(RecordOutcome::Created)
            }
        }
    }

    /// Publishing failures, panics included, are logged and never reach the caller.
    fn announce(&self, organization_id: &OrganizationId, actor: &UserId, result: &SyncResult) {
        let event = EmployeeSyncCompleted::from_result(organization_id, actor, result);
        match catch_unwind(AssertUnwindSafe(|| self.notifier.publish(event))) {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                tracing::warn!(
                    organization_id = %organization_id,
                    error = %error,
                    "failed to publish employee sync completion"
                );
            }
            Err(_) => {
                tracing::error!(
                    organization_id = %organization_id,
                    "employee sync notifier panicked"
                );
            }
        }
    }
}

/// Run-aborting failure. Nothing was synced.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to fetch employees from provider: {0}")]
    Provider(#[from] ProviderError),
}

/// Failure of a single record; recorded in the result and skipped past.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("employee reconciliation failed: {0}")]
    Reconcile(#[from] RepositoryError),
    #[error("person projection failed: {0}")]
    Projection(#[from] ProjectionError),
}
