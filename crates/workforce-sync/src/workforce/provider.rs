use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use super::domain::{blank_as_none, AccountToken, ExternalEmployee, ExternalEmployeeId};

/// Source of provider employee batches for a linked account.
///
/// Implementations return the complete set; any pagination happens behind this call.
pub trait HrisProvider: Send + Sync {
    fn get_employees(&self, token: &AccountToken) -> Result<Vec<ExternalEmployee>, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("linked account rejected the credentials")]
    Unauthorized,
    #[error("no employee export for the linked account")]
    AccountNotFound,
    #[error("provider request failed: {0}")]
    Transport(String),
    #[error("failed to read employee export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid employee JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid employee CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Serves one fixed batch regardless of the token.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    employees: Vec<ExternalEmployee>,
}

impl StaticProvider {
    pub fn new(employees: Vec<ExternalEmployee>) -> Self {
        Self { employees }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ProviderError> {
        read_export(path.as_ref()).map(Self::new)
    }
}

impl HrisProvider for StaticProvider {
    fn get_employees(&self, _token: &AccountToken) -> Result<Vec<ExternalEmployee>, ProviderError> {
        Ok(self.employees.clone())
    }
}

/// Reads `<token>.json` or `<token>.csv` from a directory of provider exports.
#[derive(Debug, Clone)]
pub struct ExportDirectoryProvider {
    root: PathBuf,
}

impl ExportDirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, token: &AccountToken) -> Result<PathBuf, ProviderError> {
        let raw = token.expose().trim();
        let safe = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(ProviderError::Unauthorized);
        }

        ["json", "csv"]
            .iter()
            .map(|extension| self.root.join(format!("{raw}.{extension}")))
            .find(|candidate| candidate.is_file())
            .ok_or(ProviderError::AccountNotFound)
    }
}

impl HrisProvider for ExportDirectoryProvider {
    fn get_employees(&self, token: &AccountToken) -> Result<Vec<ExternalEmployee>, ProviderError> {
        let path = self.resolve(token)?;
        read_export(&path)
    }
}

fn read_export(path: &Path) -> Result<Vec<ExternalEmployee>, ProviderError> {
    let file = std::fs::File::open(path)?;
    let is_csv = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("csv"));

    if is_csv {
        parse_csv_export(file)
    } else {
        parse_json_export(file)
    }
}

/// Accepts a bare array, a single `{"results": [...]}` page, or an array of such pages.
pub fn parse_json_export<R: Read>(reader: R) -> Result<Vec<ExternalEmployee>, ProviderError> {
    let document: Value = serde_json::from_reader(reader)?;
    let mut raw_records = Vec::new();
    collect_records(document, &mut raw_records);

    raw_records
        .into_iter()
        .map(|raw| -> Result<ExternalEmployee, ProviderError> {
            let mut employee: ExternalEmployee = serde_json::from_value(raw.clone())?;
            employee.raw = raw;
            Ok(employee)
        })
        .collect()
}

fn collect_records(document: Value, out: &mut Vec<Value>) {
    match document {
        Value::Array(items) => {
            for item in items {
                let is_page = matches!(&item, Value::Object(map) if map.contains_key("results"));
                if is_page {
                    collect_records(item, out);
                } else {
                    out.push(item);
                }
            }
        }
        Value::Object(mut map) => match map.remove("results") {
            Some(results) => collect_records(results, out),
            None => out.push(Value::Object(map)),
        },
        other => out.push(other),
    }
}

/// CSV exports use the provider's field names as headers.
pub fn parse_csv_export<R: Read>(reader: R) -> Result<Vec<ExternalEmployee>, ProviderError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut employees = Vec::new();

    for record in csv_reader.deserialize::<CsvEmployeeRow>() {
        employees.push(record?.into_external());
    }

    Ok(employees)
}

#[derive(Debug, Deserialize)]
struct CsvEmployeeRow {
    id: String,
    remote_id: String,
    first_name: String,
    last_name: String,
    work_email: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    personal_email: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    mobile_phone_number: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    manager: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    job_title: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    employment_status: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    team: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    work_location: Option<String>,
}

impl CsvEmployeeRow {
    fn into_external(self) -> ExternalEmployee {
        let mut raw = Map::new();
        raw.insert("id".to_string(), Value::from(self.id.as_str()));
        raw.insert("remote_id".to_string(), Value::from(self.remote_id.as_str()));
        raw.insert("first_name".to_string(), Value::from(self.first_name.as_str()));
        raw.insert("last_name".to_string(), Value::from(self.last_name.as_str()));
        raw.insert("work_email".to_string(), Value::from(self.work_email.as_str()));
        for (key, value) in [
            ("personal_email", &self.personal_email),
            ("mobile_phone_number", &self.mobile_phone_number),
            ("manager", &self.manager),
            ("job_title", &self.job_title),
            ("employment_status", &self.employment_status),
            ("team", &self.team),
            ("work_location", &self.work_location),
        ] {
            raw.insert(
                key.to_string(),
                value.as_deref().map(Value::from).unwrap_or(Value::Null),
            );
        }

        ExternalEmployee {
            id: ExternalEmployeeId(self.id),
            remote_id: self.remote_id,
            first_name: self.first_name,
            last_name: self.last_name,
            work_email: self.work_email,
            personal_email: self.personal_email,
            mobile_phone_number: self.mobile_phone_number,
            manager: self.manager,
            job_title: self.job_title,
            employment_status: self.employment_status,
            team: self.team,
            work_location: self.work_location,
            raw: Value::Object(raw),
        }
    }
}
