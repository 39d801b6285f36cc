//! Tool input schemas and validation
//!
//! A schema is a flat set of named, typed fields. It renders to the JSON
//! Schema object the provider expects and validates raw model arguments
//! before anything reaches an executor.

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::fmt;
use thiserror::Error;

/// Field name reported when the input is not an object at all
pub const ROOT_FIELD: &str = "$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl FieldKind {
    fn json_type(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolSchema {
    fields: Vec<FieldSpec>,
}

impl ToolSchema {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn required(
        self,
        name: impl Into<String>,
        kind: FieldKind,
        description: impl Into<String>,
    ) -> Self {
        self.field(name.into(), kind, description.into(), true)
    }

    #[must_use]
    #[allow(dead_code)] // Used in tests
    pub fn optional(
        self,
        name: impl Into<String>,
        kind: FieldKind,
        description: impl Into<String>,
    ) -> Self {
        self.field(name.into(), kind, description.into(), false)
    }

    fn field(mut self, name: String, kind: FieldKind, description: String, required: bool) -> Self {
        // Later declarations replace earlier ones with the same name
        self.fields.retain(|f| f.name != name);
        self.fields.push(FieldSpec {
            name,
            kind,
            description,
            required,
        });
        self
    }

    #[allow(dead_code)] // Used in tests
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// JSON Schema object sent to the provider
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| {
                (
                    f.name.clone(),
                    json!({ "type": f.kind.json_type(), "description": f.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Check raw arguments against the schema, collecting every offending field.
    pub fn validate(&self, input: &Value) -> Result<ValidatedInput, ValidationError> {
        let Some(object) = input.as_object() else {
            return Err(ValidationError::new(vec![FieldIssue {
                field: ROOT_FIELD.to_string(),
                reason: IssueReason::NotAnObject,
            }]));
        };

        let mut issues = Vec::new();

        for spec in &self.fields {
            match object.get(&spec.name) {
                None | Some(Value::Null) if spec.required => issues.push(FieldIssue {
                    field: spec.name.clone(),
                    reason: IssueReason::Missing,
                }),
                None | Some(Value::Null) => {}
                Some(value) if !spec.kind.accepts(value) => issues.push(FieldIssue {
                    field: spec.name.clone(),
                    reason: IssueReason::WrongType {
                        expected: spec.kind.json_type(),
                    },
                }),
                Some(_) => {}
            }
        }

        for name in object.keys() {
            if !self.fields.iter().any(|f| &f.name == name) {
                issues.push(FieldIssue {
                    field: name.clone(),
                    reason: IssueReason::Unexpected,
                });
            }
        }

        if issues.is_empty() {
            Ok(ValidatedInput {
                fields: object.clone(),
            })
        } else {
            Err(ValidationError::new(issues))
        }
    }
}

/// Arguments that passed schema validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInput {
    fields: Map<String, Value>,
}

impl ValidatedInput {
    #[allow(dead_code)] // Used in tests
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    #[allow(dead_code)] // Used in tests
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Deserialize into a typed input struct
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueReason {
    NotAnObject,
    Missing,
    WrongType { expected: &'static str },
    Unexpected,
}

impl fmt::Display for IssueReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueReason::NotAnObject => write!(f, "input must be a JSON object"),
            IssueReason::Missing => write!(f, "missing required field"),
            IssueReason::WrongType { expected } => write!(f, "expected {expected}"),
            IssueReason::Unexpected => write!(f, "unexpected field"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub reason: IssueReason,
}

/// Tool input did not match the declared schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid tool input: {}", describe(.issues))]
pub struct ValidationError {
    issues: Vec<FieldIssue>,
}

impl ValidationError {
    fn new(mut issues: Vec<FieldIssue>) -> Self {
        issues.sort_by(|a, b| a.field.cmp(&b.field));
        issues.dedup_by(|a, b| a.field == b.field);
        Self { issues }
    }

    #[allow(dead_code)] // Used in tests
    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    /// Names of the offending fields, sorted
    #[allow(dead_code)] // Used in tests
    pub fn fields(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.field.as_str()).collect()
    }
}

fn describe(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{} ({})", i.field, i.reason))
        .collect::<Vec<_>>()
        .join(", ")
}
