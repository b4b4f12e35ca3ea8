//! Process-local stores for the CLI, local serving, and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::domain::{
    Employee, EmployeeId, ExternalEmployeeId, OrganizationId, Person, PersonId,
};
use super::repository::{
    EmployeeRepository, EmployeeSyncCompleted, NotifyError, PersonRepository, RepositoryError,
    SyncNotifier,
};

#[derive(Default, Clone)]
pub struct InMemoryEmployeeRepository {
    records: Arc<Mutex<HashMap<EmployeeId, Employee>>>,
}

impl InMemoryEmployeeRepository {
    pub fn len(&self) -> usize {
        self.records.lock().expect("employee mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &EmployeeId) -> Option<Employee> {
        self.records
            .lock()
            .expect("employee mutex poisoned")
            .get(id)
            .cloned()
    }

    pub fn find_by_remote_id(
        &self,
        organization_id: &OrganizationId,
        remote_id: &str,
    ) -> Option<Employee> {
        self.records
            .lock()
            .expect("employee mutex poisoned")
            .values()
            .find(|employee| {
                &employee.organization_id == organization_id && employee.remote_id == remote_id
            })
            .cloned()
    }
}

/// Blank emails identify nobody.
fn same_email(stored: &str, candidate: &str) -> bool {
    let candidate = candidate.trim();
    !candidate.is_empty() && stored.trim().eq_ignore_ascii_case(candidate)
}

fn collides(existing: &Employee, candidate: &Employee) -> bool {
    existing.id != candidate.id
        && existing.organization_id == candidate.organization_id
        && (existing.remote_id == candidate.remote_id
            || same_email(&existing.email, &candidate.email))
}

impl EmployeeRepository for InMemoryEmployeeRepository {
    fn find_by_remote_id_or_email(
        &self,
        organization_id: &OrganizationId,
        remote_id: &str,
        email: &str,
    ) -> Result<Option<Employee>, RepositoryError> {
        let guard = self.records.lock().expect("employee mutex poisoned");
        let in_org = |employee: &&Employee| &employee.organization_id == organization_id;
        let found = guard
            .values()
            .filter(in_org)
            .find(|employee| employee.remote_id == remote_id)
            .or_else(|| {
                guard
                    .values()
                    .filter(in_org)
                    .find(|employee| same_email(&employee.email, email))
            });
        Ok(found.cloned())
    }

    fn find_by_external_id(
        &self,
        organization_id: &OrganizationId,
        external_id: &ExternalEmployeeId,
    ) -> Result<Option<Employee>, RepositoryError> {
        let guard = self.records.lock().expect("employee mutex poisoned");
        Ok(guard
            .values()
            .find(|employee| {
                &employee.organization_id == organization_id && &employee.external_id == external_id
            })
            .cloned())
    }

    fn insert(&self, employee: Employee) -> Result<Employee, RepositoryError> {
        let mut guard = self.records.lock().expect("employee mutex poisoned");
        if guard.contains_key(&employee.id)
            || guard.values().any(|existing| collides(existing, &employee))
        {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(employee.id.clone(), employee.clone());
        Ok(employee)
    }

    fn update(&self, employee: Employee) -> Result<Employee, RepositoryError> {
        let mut guard = self.records.lock().expect("employee mutex poisoned");
        if !guard.contains_key(&employee.id) {
            return Err(RepositoryError::NotFound);
        }
        if guard.values().any(|existing| collides(existing, &employee)) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(employee.id.clone(), employee.clone());
        Ok(employee)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryPersonRepository {
    records: Arc<Mutex<HashMap<PersonId, Person>>>,
}

impl InMemoryPersonRepository {
    pub fn len(&self) -> usize {
        self.records.lock().expect("person mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all(&self) -> Vec<Person> {
        self.records
            .lock()
            .expect("person mutex poisoned")
            .values()
            .cloned()
            .collect()
    }
}

impl PersonRepository for InMemoryPersonRepository {
    fn find_by_employee(
        &self,
        employee_id: &EmployeeId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Person>, RepositoryError> {
        let guard = self.records.lock().expect("person mutex poisoned");
        Ok(guard
            .values()
            .find(|person| {
                &person.employee_id == employee_id && &person.organization_id == organization_id
            })
            .cloned())
    }

    fn fetch(
        &self,
        person_id: &PersonId,
        organization_id: &OrganizationId,
    ) -> Result<Option<Person>, RepositoryError> {
        let guard = self.records.lock().expect("person mutex poisoned");
        Ok(guard
            .get(person_id)
            .filter(|person| &person.organization_id == organization_id)
            .cloned())
    }

    fn insert(&self, person: Person) -> Result<Person, RepositoryError> {
        let mut guard = self.records.lock().expect("person mutex poisoned");
        let duplicate_link = guard.values().any(|existing| {
            existing.employee_id == person.employee_id
                && existing.organization_id == person.organization_id
        });
        if guard.contains_key(&person.id) || duplicate_link {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(person.id.clone(), person.clone());
        Ok(person)
    }

    fn update(&self, person: Person) -> Result<Person, RepositoryError> {
        let mut guard = self.records.lock().expect("person mutex poisoned");
        if !guard.contains_key(&person.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(person.id.clone(), person.clone());
        Ok(person)
    }
}

/// Keeps every published completion event for later inspection.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<EmployeeSyncCompleted>>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<EmployeeSyncCompleted> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl SyncNotifier for RecordingNotifier {
    fn publish(&self, event: EmployeeSyncCompleted) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workforce::domain::EmploymentStatus;
    use chrono::Utc;
    use serde_json::Value;

    fn employee(id: &str, remote_id: &str, email: &str) -> Employee {
        Employee {
            id: EmployeeId::from(id),
            organization_id: OrganizationId::from("org-1"),
            external_id: ExternalEmployeeId::from(format!("x-{id}").as_str()),
            remote_id: remote_id.to_string(),
            first_name: "Ann".to_string(),
            last_name: "Kay".to_string(),
            email: email.to_string(),
            phone: None,
            job_title: None,
            department: None,
            location: None,
            manager_id: None,
            manager_name: None,
            employment_status: EmploymentStatus::Active,
            source_system: "merge".to_string(),
            synced_at: Utc::now(),
            raw_payload: Value::Null,
        }
    }

    #[test]
    fn blank_emails_neither_match_nor_collide() {
        let repository = InMemoryEmployeeRepository::default();
        repository
            .insert(employee("1", "R1", ""))
            .expect("first insert");

        let found = repository
            .find_by_remote_id_or_email(&OrganizationId::from("org-1"), "R2", "  ")
            .expect("lookup");
        assert!(found.is_none());

        repository
            .insert(employee("2", "R2", ""))
            .expect("second blank email inserts");
        assert_eq!(repository.len(), 2);
    }

    #[test]
    fn insert_rejects_duplicate_remote_id_or_email() {
        let repository = InMemoryEmployeeRepository::default();
        repository
            .insert(employee("1", "R1", "a@x.com"))
            .expect("first insert");

        assert!(matches!(
            repository.insert(employee("2", "R1", "other@x.com")),
            Err(RepositoryError::Conflict)
        ));
        assert!(matches!(
            repository.insert(employee("3", "R3", "A@x.com")),
            Err(RepositoryError::Conflict)
        ));
        assert_eq!(repository.len(), 1);
    }

    #[test]
    fn remote_id_match_wins_over_email_match() {
        let repository = InMemoryEmployeeRepository::default();
        repository
            .insert(employee("1", "R1", "a@x.com"))
            .expect("insert");
        repository
            .insert(employee("2", "R2", "b@x.com"))
            .expect("insert");

        let found = repository
            .find_by_remote_id_or_email(&OrganizationId::from("org-1"), "R2", "a@x.com")
            .expect("lookup")
            .expect("found");
        assert_eq!(found.id, EmployeeId::from("2"));
    }

    #[test]
    fn update_requires_existing_row() {
        let repository = InMemoryEmployeeRepository::default();
        assert!(matches!(
            repository.update(employee("1", "R1", "a@x.com")),
            Err(RepositoryError::NotFound)
        ));
    }

    #[test]
    fn lookups_are_scoped_to_organization() {
        let repository = InMemoryEmployeeRepository::default();
        repository
            .insert(employee("1", "R1", "a@x.com"))
            .expect("insert");

        let other = OrganizationId::from("org-2");
        assert!(repository
            .find_by_remote_id_or_email(&other, "R1", "a@x.com")
            .expect("lookup")
            .is_none());
        assert!(repository
            .find_by_external_id(&other, &ExternalEmployeeId::from("x-1"))
            .expect("lookup")
            .is_none());
        assert!(repository.find_by_remote_id(&other, "R1").is_none());
    }
}
