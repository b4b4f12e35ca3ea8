use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::{json, Value};

use crate::workforce::domain::{
    AccountToken, Employee, EmployeeId, ExternalEmployee, ExternalEmployeeId, OrganizationId,
    Person, PersonId, UserId,
};
use crate::workforce::memory::{
    InMemoryEmployeeRepository, InMemoryPersonRepository, RecordingNotifier,
};
use crate::workforce::person::{PersonProjection, PersonProjector, ProjectionError};
use crate::workforce::provider::{HrisProvider, ProviderError};
use crate::workforce::repository::{
    EmployeeRepository, EmployeeSyncCompleted, NotifyError, RepositoryError, SyncNotifier,
};
use crate::workforce::service::{EmployeeSyncService, SyncCancellation};

pub(super) fn org() -> OrganizationId {
    OrganizationId::from("org-acme")
}

pub(super) fn actor() -> UserId {
    UserId::from("admin-1")
}

pub(super) fn token() -> AccountToken {
    AccountToken("acct-token-1".to_string())
}

pub(super) fn external(
    id: &str,
    remote_id: &str,
    email: &str,
    name: (&str, &str),
    manager: Option<&str>,
) -> ExternalEmployee {
    let raw = json!({
        "id": id,
        "remote_id": remote_id,
        "work_email": email,
        "first_name": name.0,
        "last_name": name.1,
        "manager": manager,
    });
    ExternalEmployee {
        id: ExternalEmployeeId::from(id),
        remote_id: remote_id.to_string(),
        first_name: name.0.to_string(),
        last_name: name.1.to_string(),
        work_email: email.to_string(),
        personal_email: None,
        mobile_phone_number: None,
        manager: manager.map(str::to_string),
        job_title: Some("Associate".to_string()),
        employment_status: Some("ACTIVE".to_string()),
        team: Some("Compliance".to_string()),
        work_location: None,
        raw,
    }
}

/// The two-person batch with the report listed before its manager.
pub(super) fn scenario_batch() -> Vec<ExternalEmployee> {
    vec![
        external("e2", "R2", "b@x.com", ("Bea", "Lee"), Some("e1")),
        external("e1", "R1", "a@x.com", ("Ann", "Kay"), None),
    ]
}

pub(super) fn flat_batch() -> Vec<ExternalEmployee> {
    vec![
        external("e1", "R1", "a@x.com", ("Ann", "Kay"), None),
        external("e2", "R2", "b@x.com", ("Bea", "Lee"), None),
        external("e3", "R3", "c@x.com", ("Cy", "Ng"), None),
    ]
}

/// Provider whose batch can be swapped between runs.
#[derive(Default)]
pub(super) struct SwappableProvider {
    batch: Mutex<Vec<ExternalEmployee>>,
}

impl SwappableProvider {
    pub(super) fn new(batch: Vec<ExternalEmployee>) -> Self {
        Self {
            batch: Mutex::new(batch),
        }
    }

    pub(super) fn replace(&self, batch: Vec<ExternalEmployee>) {
        *self.batch.lock().expect("provider mutex poisoned") = batch;
    }
}

impl HrisProvider for SwappableProvider {
    fn get_employees(&self, _token: &AccountToken) -> Result<Vec<ExternalEmployee>, ProviderError> {
        Ok(self.batch.lock().expect("provider mutex poisoned").clone())
    }
}

pub(super) struct UnreachableProvider;

impl HrisProvider for UnreachableProvider {
    fn get_employees(&self, _token: &AccountToken) -> Result<Vec<ExternalEmployee>, ProviderError> {
        Err(ProviderError::Transport("connection reset by peer".to_string()))
    }
}

/// Employee storage that refuses writes for one remote id.
#[derive(Default)]
pub(super) struct FailingEmployeeRepository {
    pub(super) inner: InMemoryEmployeeRepository,
    pub(super) failing_remote_id: String,
}

impl FailingEmployeeRepository {
    pub(super) fn failing_on(remote_id: &str) -> Self {
        Self {
            inner: InMemoryEmployeeRepository::default(),
            failing_remote_id: remote_id.to_string(),
        }
    }

    fn check(&self, employee: &Employee) -> Result<(), RepositoryError> {
        if employee.remote_id == self.failing_remote_id {
            return Err(RepositoryError::Unavailable("write timed out".to_string()));
        }
        Ok(())
    }
}

impl EmployeeRepository for FailingEmployeeRepository {
    fn find_by_remote_id_or_email(
        &self,
        organization_id: &OrganizationId,
        remote_id: &str,
        email: &str,
    ) -> Result<Option<Employee>, RepositoryError> {
        self.inner
            .find_by_remote_id_or_email(organization_id, remote_id, email)
    }

    fn find_by_external_id(
        &self,
        organization_id: &OrganizationId,
        external_id: &ExternalEmployeeId,
    ) -> Result<Option<Employee>, RepositoryError> {
        self.inner.find_by_external_id(organization_id, external_id)
    }

    fn insert(&self, employee: Employee) -> Result<Employee, RepositoryError> {
        self.check(&employee)?;
        self.inner.insert(employee)
    }

    fn update(&self, employee: Employee) -> Result<Employee, RepositoryError> {
        self.check(&employee)?;
        self.inner.update(employee)
    }
}

pub(super) struct FailingNotifier;

impl SyncNotifier for FailingNotifier {
    fn publish(&self, _event: EmployeeSyncCompleted) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("broker offline".to_string()))
    }
}

pub(super) struct PanickingNotifier;

impl SyncNotifier for PanickingNotifier {
    fn publish(&self, _event: EmployeeSyncCompleted) -> Result<(), NotifyError> {
        panic!("notifier crashed");
    }
}

/// Wraps a projector and fires the cancellation once `after` Persons were created.
pub(super) struct CancellingProjection {
    pub(super) inner: PersonProjector,
    pub(super) cancellation: SyncCancellation,
    pub(super) after: usize,
    pub(super) created: AtomicUsize,
}

impl PersonProjection for CancellingProjection {
    fn find_by_employee(
        &self,
        employee_id: &EmployeeId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Person>, ProjectionError> {
        self.inner.find_by_employee(employee_id, organization_id)
    }

    fn create_from_employee(
        &self,
        employee: &Employee,
        actor: &UserId,
        organization_id: &OrganizationId,
    ) -> Result<Person, ProjectionError> {
        let person = self
            .inner
            .create_from_employee(employee, actor, organization_id)?;
        if self.created.fetch_add(1, Ordering::SeqCst) + 1 >= self.after {
            self.cancellation.cancel();
        }
        Ok(person)
    }

    fn sync_from_employee(
        &self,
        person_id: &PersonId,
        employee: &Employee,
        actor: &UserId,
        organization_id: &OrganizationId,
    ) -> Result<Person, ProjectionError> {
        self.inner
            .sync_from_employee(person_id, employee, actor, organization_id)
    }
}

pub(super) struct Harness {
    pub(super) service: EmployeeSyncService,
    pub(super) provider: Arc<SwappableProvider>,
    pub(super) employees: Arc<InMemoryEmployeeRepository>,
    pub(super) persons: Arc<InMemoryPersonRepository>,
    pub(super) projector: Arc<PersonProjector>,
    pub(super) notifier: Arc<RecordingNotifier>,
}

pub(super) fn harness(batch: Vec<ExternalEmployee>) -> Harness {
    let provider = Arc::new(SwappableProvider::new(batch));
    let employees = Arc::new(InMemoryEmployeeRepository::default());
    let persons = Arc::new(InMemoryPersonRepository::default());
    let projector = Arc::new(PersonProjector::new(persons.clone()));
    let notifier = Arc::new(RecordingNotifier::default());
    let service = EmployeeSyncService::new(
        provider.clone(),
        employees.clone(),
        projector.clone(),
        notifier.clone(),
        "merge",
    );

    Harness {
        service,
        provider,
        employees,
        persons,
        projector,
        notifier,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
