//! Deferred expressions
//!
//! An [`Expr`] describes a value whose textual form is only known when the
//! workflow is rendered: a literal, a reference to a workflow/template/step/task
//! parameter, a config-map key, or a combination of those. Every node carries
//! the [`ValueType`] it produces.
//!
//! Combinators check their operands when they are built, so an ill-typed
//! expression never exists:
//!
//! ```ignore
//! let five = Expr::literal(5);
//! let ten = Expr::literal(10);
//! let cmp = five.clone().greater_than(ten)?;          // ok
//! let bad = five.greater_than(Expr::literal(json!({})));  // Err(OperandMismatch)
//! ```
//!
//! Parameter references cannot be built directly; they are handed out by the
//! scope accessors of the builders, which know what is declared.

mod path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::ExprError;
use crate::types::ValueType;

pub use path::PathSegment;
pub(crate) use path::is_identifier;

#[cfg(test)]
mod tests;

/// Where a parameter reference points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum ParamSource {
    /// `workflow.parameters.NAME`
    Workflow { name: String },
    /// `inputs.parameters.NAME` of the enclosing template
    Input { name: String },
    /// `steps.STEP.outputs.parameters.NAME`
    StepOutput { step: String, name: String },
    /// `tasks.TASK.outputs.parameters.NAME`
    TaskOutput { task: String, name: String },
}

impl ParamSource {
    /// Dotted form used in error messages
    pub fn describe(&self) -> String {
        match self {
            ParamSource::Workflow { name } => format!("workflow.parameters.{}", name),
            ParamSource::Input { name } => format!("inputs.parameters.{}", name),
            ParamSource::StepOutput { step, name } => {
                format!("steps.{}.outputs.parameters.{}", step, name)
            }
            ParamSource::TaskOutput { task, name } => {
                format!("tasks.{}.outputs.parameters.{}", task, name)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithmeticOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
            ArithmeticOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "==",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
        }
    }

    fn needs_ordering(&self) -> bool {
        !matches!(self, ComparisonOp::Eq | ComparisonOp::Ne)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
        }
    }
}

/// Expression AST node.
///
/// Serialized nodes carry a `$expr` tag; the renderer uses it to find
/// expressions embedded in free-form documents such as resource manifests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$expr", rename_all = "snake_case")]
pub enum Expr {
    Literal {
        value: JsonValue,
        ty: ValueType,
    },
    Parameter {
        source: ParamSource,
        ty: ValueType,
    },
    ConfigMap {
        map: String,
        key: String,
        ty: ValueType,
    },
    Path {
        source: Box<Expr>,
        segments: Vec<PathSegment>,
        ty: ValueType,
    },
    JsonPath {
        source: Box<Expr>,
        segments: Vec<PathSegment>,
        ty: ValueType,
    },
    Dig {
        source: Box<Expr>,
        segments: Vec<PathSegment>,
        fallback: Box<Expr>,
        ty: ValueType,
    },
    Concat {
        parts: Vec<Expr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        separator: Option<String>,
    },
    Ternary {
        condition: Box<Expr>,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
        ty: ValueType,
    },
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Expr>,
        right: Box<Expr>,
        ty: ValueType,
    },
    Comparison {
        op: ComparisonOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not {
        operand: Box<Expr>,
    },
    ArrayLength {
        source: Box<Expr>,
    },
    ArrayIndex {
        source: Box<Expr>,
        index: Box<Expr>,
        ty: ValueType,
    },
    AsString {
        source: Box<Expr>,
    },
    /// Re-type an expression without changing its rendering
    Cast {
        source: Box<Expr>,
        ty: ValueType,
    },
    /// The current element of a looped step or task
    Item {
        ty: ValueType,
    },
}

impl Expr {
    /* ===================== Leaves ===================== */

    /// A constant; its type is inferred from the JSON value
    pub fn literal(value: impl Into<JsonValue>) -> Self {
        let value = value.into();
        let ty = ValueType::of(&value);
        Expr::Literal { value, ty }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::literal(JsonValue::String(value.into()))
    }

    /// A key of an externally supplied config map
    pub fn config_map(map: impl Into<String>, key: impl Into<String>, ty: ValueType) -> Self {
        Expr::ConfigMap {
            map: map.into(),
            key: key.into(),
            ty,
        }
    }

    pub(crate) fn parameter(source: ParamSource, ty: ValueType) -> Self {
        Expr::Parameter { source, ty }
    }

    pub(crate) fn item(ty: ValueType) -> Self {
        Expr::Item { ty }
    }

    /* ===================== Introspection ===================== */

    /// The type of the value this expression produces
    pub fn ty(&self) -> ValueType {
        match self {
            Expr::Literal { ty, .. }
            | Expr::Parameter { ty, .. }
            | Expr::ConfigMap { ty, .. }
            | Expr::Path { ty, .. }
            | Expr::JsonPath { ty, .. }
            | Expr::Dig { ty, .. }
            | Expr::Ternary { ty, .. }
            | Expr::Arithmetic { ty, .. }
            | Expr::ArrayIndex { ty, .. }
            | Expr::Cast { ty, .. }
            | Expr::Item { ty } => ty.clone(),
            Expr::Concat { .. } | Expr::AsString { .. } => ValueType::String,
            Expr::Comparison { .. } | Expr::Logical { .. } | Expr::Not { .. } => {
                ValueType::Boolean
            }
            Expr::ArrayLength { .. } => ValueType::Integer,
        }
    }

    /// Short name of the node kind
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Literal { .. } => "literal",
            Expr::Parameter { .. } => "parameter",
            Expr::ConfigMap { .. } => "configmap",
            Expr::Path { .. } => "path",
            Expr::JsonPath { .. } => "json_path",
            Expr::Dig { .. } => "dig",
            Expr::Concat { .. } => "concat",
            Expr::Ternary { .. } => "ternary",
            Expr::Arithmetic { .. } => "arithmetic",
            Expr::Comparison { .. } => "comparison",
            Expr::Logical { .. } => "logical",
            Expr::Not { .. } => "not",
            Expr::ArrayLength { .. } => "array_length",
            Expr::ArrayIndex { .. } => "array_index",
            Expr::AsString { .. } => "as_string",
            Expr::Cast { .. } => "cast",
            Expr::Item { .. } => "item",
        }
    }

    /// Direct sub-expressions
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal { .. }
            | Expr::Parameter { .. }
            | Expr::ConfigMap { .. }
            | Expr::Item { .. } => vec![],
            Expr::Path { source, .. }
            | Expr::JsonPath { source, .. }
            | Expr::ArrayLength { source }
            | Expr::AsString { source }
            | Expr::Cast { source, .. } => vec![&**source],
            Expr::Not { operand } => vec![&**operand],
            Expr::Dig {
                source, fallback, ..
            } => vec![&**source, &**fallback],
            Expr::Concat { parts, .. } => parts.iter().collect(),
            Expr::Ternary {
                condition,
                when_true,
                when_false,
                ..
            } => vec![&**condition, &**when_true, &**when_false],
            Expr::Arithmetic { left, right, .. }
            | Expr::Comparison { left, right, .. }
            | Expr::Logical { left, right, .. } => vec![&**left, &**right],
            Expr::ArrayIndex { source, index, .. } => vec![&**source, &**index],
        }
    }

    /// Every parameter this expression reads, in depth-first order
    pub fn references(&self) -> Vec<&ParamSource> {
        let mut out = Vec::new();
        self.walk(&mut |node| {
            if let Expr::Parameter { source, .. } = node {
                out.push(source);
            }
        });
        out
    }

    /// Whether the loop item appears anywhere in this expression
    pub fn uses_item(&self) -> bool {
        let mut found = false;
        self.walk(&mut |node| {
            if matches!(node, Expr::Item { .. }) {
                found = true;
            }
        });
        found
    }

    fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Serialize into a plain-data node for embedding in free-form documents
    pub fn to_value(&self) -> JsonValue {
        // Every field is plain data, so serialization cannot fail
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    fn composable(self) -> Result<Self, ExprError> {
        match self {
            Expr::ConfigMap { map, key, .. } => Err(ExprError::ConfigMapNotComposable { map, key }),
            other => Ok(other),
        }
    }

    /* ===================== Projections ===================== */

    /// Project through property keys / indices of a structurally known value
    pub fn path<I, S>(self, segments: I) -> Result<Self, ExprError>
    where
        I: IntoIterator<Item = S>,
        S: Into<PathSegment>,
    {
        let source = self.composable()?;
        let segments: Vec<PathSegment> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(ExprError::InvalidPath {
                path: String::new(),
                reason: "path has no segments".to_string(),
            });
        }
        let ty = source.ty().project(&segments)?;
        Ok(Expr::Path {
            source: Box::new(source),
            segments,
            ty,
        })
    }

    /// Project through a JSON path string such as `$.status.phase`
    pub fn json_path(self, path: &str) -> Result<Self, ExprError> {
        let source = self.composable()?;
        let segments = PathSegment::parse_path(path)?;
        let ty = source.ty().project(&segments)?;
        Ok(Expr::JsonPath {
            source: Box::new(source),
            segments,
            ty,
        })
    }

    /// Project through property keys, yielding `fallback` when the path is absent
    pub fn dig<I, S>(self, keys: I, fallback: Expr) -> Result<Self, ExprError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let source = self.composable()?;
        let fallback = fallback.composable()?;
        let segments: Vec<PathSegment> = keys
            .into_iter()
            .map(|k| PathSegment::Key(k.into()))
            .collect();
        if segments.is_empty() {
            return Err(ExprError::InvalidPath {
                path: String::new(),
                reason: "dig needs at least one key".to_string(),
            });
        }
        let projected = source.ty().project(&segments)?;
        let ty = match projected {
            ValueType::Any => fallback.ty(),
            expected if fallback.ty().is_assignable_to(&expected) => expected,
            expected => {
                return Err(ExprError::FallbackMismatch {
                    expected,
                    fallback: fallback.ty(),
                })
            }
        };
        Ok(Expr::Dig {
            source: Box::new(source),
            segments,
            fallback: Box::new(fallback),
            ty,
        })
    }

    /* ===================== Arrays ===================== */

    pub fn length(self) -> Result<Self, ExprError> {
        let source = self.composable()?;
        match source.ty() {
            ValueType::Array { .. } | ValueType::Any => Ok(Expr::ArrayLength {
                source: Box::new(source),
            }),
            other => Err(ExprError::NotAnArray(other)),
        }
    }

    pub fn index(self, index: Expr) -> Result<Self, ExprError> {
        let source = self.composable()?;
        let index = index.composable()?;
        let ty = match source.ty() {
            ValueType::Array { items } => *items,
            ValueType::Any => ValueType::Any,
            other => return Err(ExprError::NotAnArray(other)),
        };
        if index.ty() != ValueType::Integer {
            return Err(ExprError::NonIntegerIndex(index.ty()));
        }
        Ok(Expr::ArrayIndex {
            source: Box::new(source),
            index: Box::new(index),
            ty,
        })
    }

    /* ===================== Coercions ===================== */

    /// Treat the value as its textual form
    pub fn as_string(self) -> Result<Self, ExprError> {
        let source = self.composable()?;
        Ok(Expr::AsString {
            source: Box::new(source),
        })
    }

    /// Assert a type the author knows but the declarations cannot express
    pub fn cast(self, ty: ValueType) -> Self {
        match self {
            // Keep config map values bindable after a cast
            Expr::ConfigMap { map, key, .. } => Expr::ConfigMap { map, key, ty },
            source => Expr::Cast {
                source: Box::new(source),
                ty,
            },
        }
    }

    /* ===================== Strings ===================== */

    /// Concatenate string expressions
    pub fn concat(parts: Vec<Expr>) -> Result<Self, ExprError> {
        Self::build_concat(parts, None)
    }

    /// Concatenate string expressions with a separator between elements
    pub fn concat_with(parts: Vec<Expr>, separator: impl Into<String>) -> Result<Self, ExprError> {
        Self::build_concat(parts, Some(separator.into()))
    }

    fn build_concat(parts: Vec<Expr>, separator: Option<String>) -> Result<Self, ExprError> {
        let parts = parts
            .into_iter()
            .enumerate()
            .map(|(index, part)| {
                let part = part.composable()?;
                match part.ty() {
                    ValueType::String => Ok(part),
                    ty => Err(ExprError::NonStringConcatPart { index, ty }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Expr::Concat { parts, separator })
    }

    /* ===================== Conditionals ===================== */

    pub fn ternary(condition: Expr, when_true: Expr, when_false: Expr) -> Result<Self, ExprError> {
        let condition = condition.composable()?;
        let when_true = when_true.composable()?;
        let when_false = when_false.composable()?;
        if condition.ty() != ValueType::Boolean {
            return Err(ExprError::NonBooleanCondition(condition.ty()));
        }
        let ty = when_true
            .ty()
            .unify(&when_false.ty())
            .ok_or_else(|| ExprError::BranchMismatch(when_true.ty(), when_false.ty()))?;
        Ok(Expr::Ternary {
            condition: Box::new(condition),
            when_true: Box::new(when_true),
            when_false: Box::new(when_false),
            ty,
        })
    }

    /* ===================== Arithmetic ===================== */

    pub fn arithmetic(op: ArithmeticOp, left: Expr, right: Expr) -> Result<Self, ExprError> {
        let left = left.composable()?;
        let right = right.composable()?;
        let (lt, rt) = (left.ty(), right.ty());
        for ty in [&lt, &rt] {
            if !ty.is_numeric() {
                return Err(ExprError::UnsupportedOperand {
                    op: op.symbol(),
                    ty: ty.clone(),
                });
            }
        }
        let ty = match (&lt, &rt, op) {
            (_, _, ArithmeticOp::Div) => ValueType::Number,
            (ValueType::Integer, ValueType::Integer, _) => ValueType::Integer,
            _ => ValueType::Number,
        };
        Ok(Expr::Arithmetic {
            op,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        })
    }

    pub fn plus(self, other: Expr) -> Result<Self, ExprError> {
        Self::arithmetic(ArithmeticOp::Add, self, other)
    }

    pub fn minus(self, other: Expr) -> Result<Self, ExprError> {
        Self::arithmetic(ArithmeticOp::Sub, self, other)
    }

    pub fn times(self, other: Expr) -> Result<Self, ExprError> {
        Self::arithmetic(ArithmeticOp::Mul, self, other)
    }

    pub fn divided_by(self, other: Expr) -> Result<Self, ExprError> {
        Self::arithmetic(ArithmeticOp::Div, self, other)
    }

    /* ===================== Comparison ===================== */

    /// Compare two operands of one identical scalar type
    pub fn comparison(op: ComparisonOp, left: Expr, right: Expr) -> Result<Self, ExprError> {
        let left = left.composable()?;
        let right = right.composable()?;
        let (lt, rt) = (left.ty(), right.ty());
        if lt != rt || !lt.is_scalar() {
            return Err(ExprError::OperandMismatch {
                op: op.symbol(),
                left: lt,
                right: rt,
            });
        }
        if op.needs_ordering() && !lt.is_ordered() {
            return Err(ExprError::UnsupportedOperand {
                op: op.symbol(),
                ty: lt,
            });
        }
        Ok(Expr::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn equals(self, other: Expr) -> Result<Self, ExprError> {
        Self::comparison(ComparisonOp::Eq, self, other)
    }

    pub fn not_equals(self, other: Expr) -> Result<Self, ExprError> {
        Self::comparison(ComparisonOp::Ne, self, other)
    }

    pub fn less_than(self, other: Expr) -> Result<Self, ExprError> {
        Self::comparison(ComparisonOp::Lt, self, other)
    }

    pub fn less_or_equal(self, other: Expr) -> Result<Self, ExprError> {
        Self::comparison(ComparisonOp::Le, self, other)
    }

    pub fn greater_than(self, other: Expr) -> Result<Self, ExprError> {
        Self::comparison(ComparisonOp::Gt, self, other)
    }

    pub fn greater_or_equal(self, other: Expr) -> Result<Self, ExprError> {
        Self::comparison(ComparisonOp::Ge, self, other)
    }

    /* ===================== Boolean logic ===================== */

    pub fn logical(op: LogicalOp, left: Expr, right: Expr) -> Result<Self, ExprError> {
        let left = left.composable()?;
        let right = right.composable()?;
        for ty in [left.ty(), right.ty()] {
            if ty != ValueType::Boolean {
                return Err(ExprError::UnsupportedOperand {
                    op: op.symbol(),
                    ty,
                });
            }
        }
        Ok(Expr::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn and(self, other: Expr) -> Result<Self, ExprError> {
        Self::logical(LogicalOp::And, self, other)
    }

    pub fn or(self, other: Expr) -> Result<Self, ExprError> {
        Self::logical(LogicalOp::Or, self, other)
    }

    pub fn negate(self) -> Result<Self, ExprError> {
        let operand = self.composable()?;
        if operand.ty() != ValueType::Boolean {
            return Err(ExprError::UnsupportedOperand {
                op: "!",
                ty: operand.ty(),
            });
        }
        Ok(Expr::Not {
            operand: Box::new(operand),
        })
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Expr::string(value)
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Expr::string(value)
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::literal(value)
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Expr::literal(value)
    }
}
