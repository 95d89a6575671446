//! Schema validation of author-supplied configuration documents
//!
//! The schema is derived from a Rust type with `schemars`; documents are
//! checked with `jsonschema` and only then deserialized. Violations are
//! reported with canonical dotted paths (`a.b.0.c`) whatever the schema's
//! internal nesting.

use std::marker::PhantomData;

use jsonschema::error::ValidationErrorKind;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{CollaboratorError, ConfigIssue};

/// Validates documents against the JSON schema of `T`
pub struct SchemaValidator<T> {
    schema: JsonValue,
    validator: jsonschema::Validator,
    _marker: PhantomData<T>,
}

impl<T: JsonSchema + DeserializeOwned> SchemaValidator<T> {
    pub fn new() -> Result<Self, CollaboratorError> {
        let schema = serde_json::to_value(schemars::schema_for!(T))
            .map_err(|e| CollaboratorError::InvalidSchema(e.to_string()))?;
        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| CollaboratorError::InvalidSchema(e.to_string()))?;
        Ok(Self {
            schema,
            validator,
            _marker: PhantomData,
        })
    }

    /// The generated schema document
    pub fn schema(&self) -> &JsonValue {
        &self.schema
    }

    /// Every violation, sorted by path, without duplicates
    pub fn issues(&self, document: &JsonValue) -> Vec<ConfigIssue> {
        let mut issues: Vec<ConfigIssue> = self
            .validator
            .iter_errors(document)
            .map(|e| {
                let mut path = pointer_to_dotted(&e.instance_path.to_string());
                // Missing properties are reported on the parent object
                if let ValidationErrorKind::Required { property } = &e.kind {
                    if let Some(name) = property.as_str() {
                        if !path.is_empty() {
                            path.push('.');
                        }
                        path.push_str(name);
                    }
                }
                ConfigIssue {
                    path,
                    message: e.to_string(),
                }
            })
            .collect();
        issues.sort_by(|a, b| (&a.path, &a.message).cmp(&(&b.path, &b.message)));
        issues.dedup();
        issues
    }

    /// Check `document` and deserialize it into `T`
    pub fn validate(&self, document: &JsonValue) -> Result<T, CollaboratorError> {
        let issues = self.issues(document);
        if !issues.is_empty() {
            tracing::debug!(issues = issues.len(), "document failed schema validation");
            return Err(CollaboratorError::InvalidConfig(issues));
        }
        serde_json::from_value(document.clone()).map_err(|e| {
            CollaboratorError::InvalidConfig(vec![ConfigIssue {
                path: String::new(),
                message: e.to_string(),
            }])
        })
    }
}

/// One-shot validation against the schema of `T`
pub fn validate_document<T: JsonSchema + DeserializeOwned>(
    document: &JsonValue,
) -> Result<T, CollaboratorError> {
    SchemaValidator::<T>::new()?.validate(document)
}

/// `/a/b~1c/0` → `a.b/c.0`
pub fn pointer_to_dotted(pointer: &str) -> String {
    pointer
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct Cluster {
        endpoint: String,
        #[serde(default)]
        nodes: Vec<Node>,
    }

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct Node {
        port: u16,
    }

    #[test]
    fn test_valid_document_deserializes() {
        let cluster: Cluster =
            validate_document(&json!({ "endpoint": "https://src:9200", "nodes": [{ "port": 9200 }] }))
                .unwrap();
        assert_eq!(cluster.nodes, vec![Node { port: 9200 }]);
    }

    #[test]
    fn test_issues_use_dotted_paths() {
        let validator = SchemaValidator::<Cluster>::new().unwrap();
        let issues = validator.issues(&json!({ "nodes": [{ "port": 1 }, { "port": "x" }] }));
        let paths: Vec<_> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["endpoint", "nodes.1.port"]);
    }

    #[test]
    fn test_invalid_document_is_rejected() {
        let err = validate_document::<Cluster>(&json!({ "endpoint": 5 })).unwrap_err();
        match err {
            CollaboratorError::InvalidConfig(issues) => {
                assert_eq!(issues.len(), 1);
                assert!(issues[0].to_string().starts_with("endpoint: "));
            }
            other => panic!("expected invalid config, got {other:?}"),
        }
    }

    #[test]
    fn test_pointer_conversion() {
        assert_eq!(pointer_to_dotted(""), "");
        assert_eq!(pointer_to_dotted("/a/b/0"), "a.b.0");
        assert_eq!(pointer_to_dotted("/labels/app~1name"), "labels.app/name");
    }
}
