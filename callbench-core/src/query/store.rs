use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),

    #[error("insert into `{0}` has no fields")]
    EmptyRecord(String),

    #[error("{0}")]
    Backend(String),

    #[cfg(feature = "sqlite")]
    #[error("sqlite: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Scalar value a filter compares against or an insert writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
pub enum CmpOp {
    #[strum(to_string = "=")]
    Eq,
    #[strum(to_string = "<>")]
    Ne,
    #[strum(to_string = ">")]
    Gt,
    #[strum(to_string = ">=")]
    Gte,
    #[strum(to_string = "<")]
    Lt,
    #[strum(to_string = "<=")]
    Lte,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: CmpOp,
    pub value: FieldValue,
}

/// Conjunction of conditions. An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub conditions: Vec<Condition>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, field: &str, op: CmpOp, value: impl Into<FieldValue>) -> Self {
        self.conditions.push(Condition {
            field: field.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn eq(self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.with(field, CmpOp::Eq, value)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountQuery {
    pub collection: String,
    #[serde(default)]
    pub filter: Filter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindQuery {
    pub collection: String,
    #[serde(default)]
    pub filter: Filter,
    #[serde(default)]
    pub sort: Option<Sort>,
    #[serde(default)]
    pub skip: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupQuery {
    pub collection: String,
    #[serde(default)]
    pub filter: Filter,
    pub group_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertQuery {
    pub collection: String,
    pub record: BTreeMap<String, FieldValue>,
}

/// Data store the query benchmark and the dependent-count sampler run against.
pub trait RecordStore: Send + Sync {
    fn count(&self, query: &CountQuery) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Returns the number of records fetched.
    fn find(&self, query: &FindQuery) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Returns the number of groups.
    fn group_count(
        &self,
        query: &GroupQuery,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    fn insert(&self, query: &InsertQuery) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Whether filtering `collection` by `filter` is served by an index.
    ///
    /// `None` when the store cannot tell.
    fn explain(
        &self,
        _collection: &str,
        _filter: &Filter,
    ) -> impl Future<Output = Result<Option<bool>, StoreError>> + Send {
        async { Ok(None) }
    }
}

/// Accepts `[A-Za-z_][A-Za-z0-9_]*`, the only shape allowed to reach a query string.
pub fn validate_identifier(ident: &str) -> Result<&str, StoreError> {
    let mut chars = ident.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(ident)
    } else {
        Err(StoreError::InvalidIdentifier(ident.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn identifiers_are_validated() {
        assert!(validate_identifier("calls").is_ok());
        assert!(validate_identifier("_created_at2").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1calls").is_err());
        assert!(validate_identifier("calls; DROP TABLE calls").is_err());
        assert!(validate_identifier("calls.status").is_err());
    }

    #[test]
    fn filter_builder_keeps_order() {
        let f = Filter::all()
            .eq("status", "completed")
            .with("created_at", CmpOp::Gte, "2024-01-01");
        assert_eq!(f.conditions.len(), 2);
        assert_eq!(f.conditions[0].field, "status");
        assert_eq!(f.conditions[1].op.to_string(), ">=");
        assert!(Filter::all().is_empty());
    }

    #[test]
    fn field_values_deserialize_untagged() {
        let v: Vec<FieldValue> = serde_json::from_str(r#"[true, 3, 1.5, "x"]"#).unwrap();
        assert_eq!(
            v,
            vec![
                FieldValue::Bool(true),
                FieldValue::Int(3),
                FieldValue::Float(1.5),
                FieldValue::Text("x".to_string()),
            ]
        );
    }
}
