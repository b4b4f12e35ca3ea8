use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use super::domain::{
    Employee, EmployeeId, EmploymentStatus, ExternalEmployee, ExternalEmployeeId, OrganizationId,
};
use super::repository::{EmployeeRepository, RepositoryError};

/// Employees written earlier in the current run, keyed by provider id.
///
/// Built fresh for each sync invocation and dropped when it returns.
#[derive(Debug, Default)]
pub struct RunLedger {
    entries: HashMap<ExternalEmployeeId, LedgerEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub employee_id: EmployeeId,
    pub display_name: String,
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, external_id: ExternalEmployeeId, employee: &Employee) {
        self.entries.insert(
            external_id,
            LedgerEntry {
                employee_id: employee.id.clone(),
                display_name: employee.display_name(),
            },
        );
    }

    pub fn get(&self, external_id: &ExternalEmployeeId) -> Option<&LedgerEntry> {
        self.entries.get(external_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    Created,
    Updated,
}

#[derive(Debug, Clone)]
pub struct Reconciled {
    pub employee: Employee,
    pub action: ReconcileAction,
}

/// Maps provider records onto tenant Employee rows.
pub struct EmployeeReconciler {
    repository: Arc<dyn EmployeeRepository>,
    source_system: String,
}

impl EmployeeReconciler {
    pub fn new(repository: Arc<dyn EmployeeRepository>, source_system: impl Into<String>) -> Self {
        Self {
            repository,
            source_system: source_system.into(),
        }
    }

    /// Find-or-create the Employee for `external`, overwriting every provider-sourced field.
    ///
    /// The ledger is consulted for the manager and does not record `external`; the
    /// orchestrator does that once the whole record has gone through.
    pub fn reconcile(
        &self,
        external: &ExternalEmployee,
        organization_id: &OrganizationId,
        ledger: &RunLedger,
    ) -> Result<Reconciled, RepositoryError> {
        let existing = self.repository.find_by_remote_id_or_email(
            organization_id,
            &external.remote_id,
            &external.work_email,
        )?;
        let (manager_id, manager_name) = self.resolve_manager(external, organization_id, ledger)?;

        let employee = Employee {
            id: existing
                .as_ref()
                .map(|employee| employee.id.clone())
                .unwrap_or_else(EmployeeId::generate),
            organization_id: organization_id.clone(),
            external_id: external.id.clone(),
            remote_id: external.remote_id.clone(),
            first_name: external.first_name.clone(),
            last_name: external.last_name.clone(),
            email: external.work_email.clone(),
            phone: external.mobile_phone_number.clone(),
            job_title: external.job_title.clone(),
            department: external.team.clone(),
            location: external.work_location.clone(),
            manager_id,
            manager_name,
            employment_status: EmploymentStatus::from_provider(
                external.employment_status.as_deref(),
            ),
            source_system: self.source_system.clone(),
            synced_at: Utc::now(),
            raw_payload: external.raw.clone(),
        };

        match existing {
            Some(_) => Ok(Reconciled {
                employee: self.repository.update(employee)?,
                action: ReconcileAction::Updated,
            }),
            None => Ok(Reconciled {
                employee: self.repository.insert(employee)?,
                action: ReconcileAction::Created,
            }),
        }
    }

    /// Ledger first, then storage; an unresolvable manager is left unset.
    fn resolve_manager(
        &self,
        external: &ExternalEmployee,
        organization_id: &OrganizationId,
        ledger: &RunLedger,
    ) -> Result<(Option<EmployeeId>, Option<String>), RepositoryError> {
        let Some(manager_ref) = external.manager_ref() else {
            return Ok((None, None));
        };

        if let Some(entry) = ledger.get(&manager_ref) {
            return Ok((
                Some(entry.employee_id.clone()),
                Some(entry.display_name.clone()),
            ));
        }

        match self
            .repository
            .find_by_external_id(organization_id, &manager_ref)?
        {
            Some(manager) => Ok((Some(manager.id.clone()), Some(manager.display_name()))),
            None => {
                tracing::debug!(
                    organization_id = %organization_id,
                    employee = %external.id,
                    manager = %manager_ref,
                    "manager not found; leaving unset"
                );
                Ok((None, None))
            }
        }
    }
}
