use std::fmt;
use std::str::FromStr;

use serde_json::Value;

pub type Record = serde_json::Map<String, Value>;

pub const ACCOUNTS_TABLE: &str = "accounts";
pub const REGISTRATIONS_TABLE: &str = "registrations";
pub const SUBSCRIPTIONS_TABLE: &str = "subscriptions";

const ACCOUNT_FIELDS: &[&str] = &[
    "id",
    "username",
    "is_admin",
    "endpoint",
    "api_key",
    "secret_key",
    "epoch",
];

const REGISTRATION_FIELDS: &[&str] = &[
    "id",
    "account_id",
    "event",
    "description",
    "event_data",
    "epoch",
];

const SUBSCRIPTION_FIELDS: &[&str] = &["id", "account_id", "registration_id", "epoch"];

/// Fields whose values identify records and therefore must be strings.
const KEY_FIELDS: &[&str] = &["id", "account_id", "registration_id", "username"];

/// Fields that an update may never rewrite.
const IMMUTABLE_FIELDS: &[&str] = &["id", "account_id"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Accounts,
    Registrations,
    Subscriptions,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Accounts, Table::Registrations, Table::Subscriptions];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Accounts => ACCOUNTS_TABLE,
            Table::Registrations => REGISTRATIONS_TABLE,
            Table::Subscriptions => SUBSCRIPTIONS_TABLE,
        }
    }

    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Table::Accounts => ACCOUNT_FIELDS,
            Table::Registrations => REGISTRATION_FIELDS,
            Table::Subscriptions => SUBSCRIPTION_FIELDS,
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields().contains(&field)
    }

    /// Checks every field of `record` against this table's field set.
    pub fn validate_record(&self, record: &Record) -> Result<(), FieldError> {
        for (field, value) in record {
            self.validate_field(field, value)?;
        }
        Ok(())
    }

    /// Like [`Table::validate_record`], but also rejects identity and
    /// ownership fields, which never change after insert.
    pub fn validate_updates(&self, updates: &Record) -> Result<(), FieldError> {
        for (field, value) in updates {
            if IMMUTABLE_FIELDS.contains(&field.as_str()) {
                return Err(FieldError::Immutable {
                    field: field.clone(),
                });
            }
            self.validate_field(field, value)?;
        }
        Ok(())
    }

    fn validate_field(&self, field: &str, value: &Value) -> Result<(), FieldError> {
        if !self.has_field(field) {
            return Err(FieldError::UnknownField {
                table: *self,
                field: field.to_string(),
            });
        }
        if KEY_FIELDS.contains(&field) && !value.is_string() {
            return Err(FieldError::ExpectedString {
                field: field.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ACCOUNTS_TABLE => Ok(Table::Accounts),
            REGISTRATIONS_TABLE => Ok(Table::Registrations),
            SUBSCRIPTIONS_TABLE => Ok(Table::Subscriptions),
            other => Err(FieldError::UnknownTable(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("field '{field}' is not defined on {table}")]
    UnknownField { table: Table, field: String },

    #[error("field '{field}' must be a string")]
    ExpectedString { field: String },

    #[error("field '{field}' cannot be changed once set")]
    Immutable { field: String },

    #[error("filter on '{field}' must compare a scalar value")]
    NonScalarFilter { field: String },
}

/// Equality conditions on record fields, kept in insertion order.
///
/// An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().with("id", id.into())
    }

    /// Adds `field == value`. A second condition on the same field replaces
    /// the first.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        let value = value.into();
        match self.conditions.iter_mut().find(|(f, _)| *f == field) {
            Some(existing) => existing.1 = value,
            None => self.conditions.push((field, value)),
        }
        self
    }

    pub fn conditions(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.conditions.iter().map(|(f, v)| (f.as_str(), v))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.conditions
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Checks fields against `table`. Values must be scalars: nested objects
    /// and arrays have no backend-independent equality.
    pub fn validate(&self, table: Table) -> Result<(), FieldError> {
        for (field, value) in &self.conditions {
            table.validate_field(field, value)?;
            if value.is_object() || value.is_array() {
                return Err(FieldError::NonScalarFilter {
                    field: field.clone(),
                });
            }
        }
        Ok(())
    }

    /// A missing field compares equal to `null`.
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| record.get(field).unwrap_or(&Value::Null) == expected)
    }

    pub fn to_document(&self) -> Value {
        Value::Object(self.conditions.iter().cloned().collect())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (field, value)) in self.conditions.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field}={value}")?;
        }
        write!(f, "}}")
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Filter::new(), |filter, (k, v)| filter.with(k, v))
    }
}

/// Reads a string-valued field from a record.
pub fn string_field<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}
