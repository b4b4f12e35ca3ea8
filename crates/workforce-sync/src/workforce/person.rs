use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::domain::{
    Employee, EmployeeId, EmploymentStatus, OrganizationId, Person, PersonField, PersonId, UserId,
};
use super::repository::{PersonRepository, RepositoryError};

/// The Person operations the sync orchestrator relies on.
pub trait PersonProjection: Send + Sync {
    fn find_by_employee(
        &self,
        employee_id: &EmployeeId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Person>, ProjectionError>;

    fn create_from_employee(
        &self,
        employee: &Employee,
        actor: &UserId,
        organization_id: &OrganizationId,
    ) -> Result<Person, ProjectionError>;

    /// Merge the Employee into the Person, skipping every manually edited field.
    fn sync_from_employee(
        &self,
        person_id: &PersonId,
        employee: &Employee,
        actor: &UserId,
        organization_id: &OrganizationId,
    ) -> Result<Person, ProjectionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("person {0} not found")]
    PersonNotFound(PersonId),
    #[error("person {person_id} belongs to employee {linked}, not {requested}")]
    EmployeeMismatch {
        person_id: PersonId,
        linked: EmployeeId,
        requested: EmployeeId,
    },
}

/// A staff-initiated change. `Some` fields are written and flagged as manually edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonEdit {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub manager_name: Option<String>,
    pub employment_status: Option<EmploymentStatus>,
    pub notes: Option<String>,
}

/// Person projection backed by a `PersonRepository`.
pub struct PersonProjector {
    repository: Arc<dyn PersonRepository>,
}

impl PersonProjector {
    pub fn new(repository: Arc<dyn PersonRepository>) -> Self {
        Self { repository }
    }

    /// Apply a human edit and flag every touched field so later syncs keep it.
    pub fn apply_manual_edit(
        &self,
        person_id: &PersonId,
        edit: PersonEdit,
        actor: &UserId,
        organization_id: &OrganizationId,
    ) -> Result<Person, ProjectionError> {
        let mut person = self.load(person_id, organization_id)?;
        let PersonEdit {
            first_name,
            last_name,
            email,
            phone,
            job_title,
            department,
            location,
            manager_name,
            employment_status,
            notes,
        } = edit;
        let edited = &mut person.manually_edited;

        if let Some(value) = first_name {
            person.first_name = value;
            edited.insert(PersonField::FirstName);
        }
        if let Some(value) = last_name {
            person.last_name = value;
            edited.insert(PersonField::LastName);
        }
        if let Some(value) = email {
            person.email = value;
            edited.insert(PersonField::Email);
        }
        if let Some(value) = phone {
            person.phone = Some(value);
            edited.insert(PersonField::Phone);
        }
        if let Some(value) = job_title {
            person.job_title = Some(value);
            edited.insert(PersonField::JobTitle);
        }
        if let Some(value) = department {
            person.department = Some(value);
            edited.insert(PersonField::Department);
        }
        if let Some(value) = location {
            person.location = Some(value);
            edited.insert(PersonField::Location);
        }
        if let Some(value) = manager_name {
            person.manager_name = Some(value);
            edited.insert(PersonField::ManagerName);
        }
        if let Some(value) = employment_status {
            person.employment_status = value;
            edited.insert(PersonField::EmploymentStatus);
        }
        if let Some(value) = notes {
            person.notes = Some(value);
        }

        person.updated_by = actor.clone();
        person.updated_at = Utc::now();
        Ok(self.repository.update(person)?)
    }

    /// Hand a field back to the sync path. The value is refreshed on the next sync.
    pub fn clear_manual_edit(
        &self,
        person_id: &PersonId,
        field: PersonField,
        actor: &UserId,
        organization_id: &OrganizationId,
    ) -> Result<Person, ProjectionError> {
        let mut person = self.load(person_id, organization_id)?;
        if person.manually_edited.remove(&field) {
            person.updated_by = actor.clone();
            person.updated_at = Utc::now();
            return Ok(self.repository.update(person)?);
        }
        Ok(person)
    }

    fn load(
        &self,
        person_id: &PersonId,
        organization_id: &OrganizationId,
    ) -> Result<Person, ProjectionError> {
        self.repository
            .fetch(person_id, organization_id)?
            .ok_or_else(|| ProjectionError::PersonNotFound(person_id.clone()))
    }
}

impl PersonProjection for PersonProjector {
    fn find_by_employee(
        &self,
        employee_id: &EmployeeId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Person>, ProjectionError> {
        Ok(self
            .repository
            .find_by_employee(employee_id, organization_id)?)
    }

    fn create_from_employee(
        &self,
        employee: &Employee,
        actor: &UserId,
        organization_id: &OrganizationId,
    ) -> Result<Person, ProjectionError> {
        let now = Utc::now();
        let person = Person {
            id: PersonId::generate(),
            organization_id: organization_id.clone(),
            employee_id: employee.id.clone(),
            first_name: employee.first_name.clone(),
            last_name: employee.last_name.clone(),
            email: employee.email.clone(),
            phone: employee.phone.clone(),
            job_title: employee.job_title.clone(),
            department: employee.department.clone(),
            location: employee.location.clone(),
            manager_name: employee.manager_name.clone(),
            employment_status: employee.employment_status,
            notes: None,
            manually_edited: BTreeSet::new(),
            created_by: actor.clone(),
            updated_by: actor.clone(),
            created_at: now,
            updated_at: now,
        };
        Ok(self.repository.insert(person)?)
    }

    fn sync_from_employee(
        &self,
        person_id: &PersonId,
        employee: &Employee,
        actor: &UserId,
        organization_id: &OrganizationId,
    ) -> Result<Person, ProjectionError> {
        let mut person = self.load(person_id, organization_id)?;
        if person.employee_id != employee.id {
            return Err(ProjectionError::EmployeeMismatch {
                person_id: person.id,
                linked: person.employee_id,
                requested: employee.id.clone(),
            });
        }

        let edited = person.manually_edited.clone();
        let open = |field: PersonField| !edited.contains(&field);

        if open(PersonField::FirstName) {
            person.first_name = employee.first_name.clone();
        }
        if open(PersonField::LastName) {
            person.last_name = employee.last_name.clone();
        }
        if open(PersonField::Email) {
            person.email = employee.email.clone();
        }
        if open(PersonField::Phone) {
            person.phone = employee.phone.clone();
        }
        if open(PersonField::JobTitle) {
            person.job_title = employee.job_title.clone();
        }
        if open(PersonField::Department) {
            person.department = employee.department.clone();
        }
        if open(PersonField::Location) {
            person.location = employee.location.clone();
        }
        if open(PersonField::ManagerName) {
            person.manager_name = employee.manager_name.clone();
        }
        if open(PersonField::EmploymentStatus) {
            person.employment_status = employee.employment_status;
        }

        person.updated_by = actor.clone();
        person.updated_at = Utc::now();
        Ok(self.repository.update(person)?)
    }
}
