use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Tenant organization identifier. Every Employee and Person is scoped to one.
    OrganizationId
);
string_id!(
    /// Internal user who triggered a sync or edited a Person.
    UserId
);
string_id!(
    /// Internal Employee identifier.
    EmployeeId
);
string_id!(
    /// Internal Person identifier.
    PersonId
);
string_id!(
    /// The provider's own identifier for an employee record. Manager references use it.
    ExternalEmployeeId
);

impl EmployeeId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl PersonId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Credential for the tenant's linked provider account. Never logged.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountToken(pub String);

impl AccountToken {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccountToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccountToken(<redacted>)")
    }
}

/// Snapshot of one employee as returned by the HRIS provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalEmployee {
    pub id: ExternalEmployeeId,
    pub remote_id: String,
    pub first_name: String,
    pub last_name: String,
    pub work_email: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub personal_email: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub mobile_phone_number: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub manager: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub job_title: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub employment_status: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub team: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub work_location: Option<String>,
    /// Untouched provider payload, kept on the Employee for audit and debugging.
    #[serde(default, skip_serializing)]
    pub raw: Value,
}

impl ExternalEmployee {
    /// Manager reference, ignoring references a record makes to itself.
    pub fn manager_ref(&self) -> Option<ExternalEmployeeId> {
        self.manager
            .as_deref()
            .filter(|manager| *manager != self.id.as_str())
            .map(ExternalEmployeeId::from)
    }

    pub fn display_name(&self) -> String {
        display_name(&self.first_name, &self.last_name)
    }
}

pub(crate) fn display_name(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}

pub(crate) fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmploymentStatus {
    Active,
    Inactive,
    OnLeave,
    Terminated,
}

impl EmploymentStatus {
    /// Maps the provider's status code. Unknown or missing codes provision as active.
    pub fn from_provider(code: Option<&str>) -> Self {
        match code.map(|value| value.trim().to_ascii_uppercase()).as_deref() {
            Some("ACTIVE") => Self::Active,
            Some("INACTIVE") => Self::Inactive,
            Some("PENDING") => Self::OnLeave,
            _ => Self::Active,
        }
    }
}

/// Tenant-scoped mirror of a provider employee. Provider-authoritative on every sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub organization_id: OrganizationId,
    pub external_id: ExternalEmployeeId,
    pub remote_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub manager_id: Option<EmployeeId>,
    pub manager_name: Option<String>,
    pub employment_status: EmploymentStatus,
    pub source_system: String,
    pub synced_at: DateTime<Utc>,
    pub raw_payload: Value,
}

impl Employee {
    pub fn display_name(&self) -> String {
        display_name(&self.first_name, &self.last_name)
    }
}

/// Person fields that staff may edit by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonField {
    FirstName,
    LastName,
    Email,
    Phone,
    JobTitle,
    Department,
    Location,
    ManagerName,
    EmploymentStatus,
}

/// Derived record consumed by pattern detection. Mirrors its Employee except where
/// staff have edited a field, which the sync path then leaves alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub organization_id: OrganizationId,
    pub employee_id: EmployeeId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub manager_name: Option<String>,
    pub employment_status: EmploymentStatus,
    /// Staff-only; never touched by sync.
    pub notes: Option<String>,
    pub manually_edited: BTreeSet<PersonField>,
    pub created_by: UserId,
    pub updated_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Person {
    pub fn is_manually_edited(&self, field: PersonField) -> bool {
        self.manually_edited.contains(&field)
    }
}

/// One failed record in a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecordError {
    pub employee_id: ExternalEmployeeId,
    pub error: String,
}

/// Outcome of one sync run. Returned to the caller, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub errors: Vec<SyncRecordError>,
    pub duration_ms: u64,
    /// Set when a cancellation stopped the run before every record was processed.
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manager_cycles: Vec<Vec<ExternalEmployeeId>>,
}

impl SyncResult {
    pub fn processed(&self) -> u32 {
        self.created + self.updated
    }

    pub fn error_count(&self) -> u32 {
        u32::try_from(self.errors.len()).unwrap_or(u32::MAX)
    }
}
