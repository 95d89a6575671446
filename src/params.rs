//! Declared parameters: template inputs, template outputs, workflow parameters

use crate::expression::Expr;
use crate::types::ValueType;

/// A declared input (or workflow parameter).
///
/// A required parameter has no default; a parameter with a default is optional.
/// The constructors are the only way to build one, so the two cannot be mixed.
#[derive(Debug, Clone, PartialEq)]
pub struct InputParamDef {
    ty: ValueType,
    default: Option<Expr>,
    description: Option<String>,
}

impl InputParamDef {
    pub fn required(ty: ValueType) -> Self {
        Self {
            ty,
            default: None,
            description: None,
        }
    }

    /// Optional parameter typed by its default value
    pub fn optional(default: Expr) -> Self {
        Self {
            ty: default.ty(),
            default: Some(default),
            description: None,
        }
    }

    /// Optional parameter with an explicit, wider type than its default
    pub fn optional_as(ty: ValueType, default: Expr) -> Self {
        Self {
            ty,
            default: Some(default),
            description: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn ty(&self) -> &ValueType {
        &self.ty
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    pub fn default_value(&self) -> Option<&Expr> {
        self.default.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Where a declared output takes its value from
#[derive(Debug, Clone, PartialEq)]
pub enum OutputSource {
    /// An expression over the template's inputs and its steps/tasks
    Expression(Expr),
    /// A file written by the container
    Path(String),
    /// A JSON path into the resource the template acted on
    JsonPath(String),
}

impl OutputSource {
    pub fn kind(&self) -> &'static str {
        match self {
            OutputSource::Expression(_) => "expression",
            OutputSource::Path(_) => "path",
            OutputSource::JsonPath(_) => "jsonPath",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputParamDef {
    pub ty: ValueType,
    pub source: OutputSource,
    pub description: Option<String>,
}

impl OutputParamDef {
    pub fn new(ty: ValueType, source: OutputSource) -> Self {
        Self {
            ty,
            source,
            description: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_has_no_default() {
        let def = InputParamDef::required(ValueType::String).describe("endpoint");
        assert!(def.is_required());
        assert!(def.default_value().is_none());
        assert_eq!(def.description(), Some("endpoint"));
    }

    #[test]
    fn test_default_makes_optional() {
        let def = InputParamDef::optional(Expr::string("str"));
        assert!(!def.is_required());
        assert_eq!(def.ty(), &ValueType::String);
    }
}
