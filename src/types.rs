//! Semantic value types
//!
//! Every expression and every declared parameter carries a [`ValueType`]. The
//! target engine passes all parameters around as text, so these types exist
//! purely at declaration time: they decide which combinators are legal, which
//! arguments may be bound to which inputs, and what a path projection yields.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::ExprError;
use crate::expression::PathSegment;

/// A named field of a record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: ValueType,
}

/// Semantic type of a value produced at render time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueType {
    String,
    Number,
    Integer,
    Boolean,
    Array { items: Box<ValueType> },
    Record { fields: Vec<Field> },
    /// A document whose shape is not statically known
    Any,
}

impl ValueType {
    pub fn array(items: ValueType) -> Self {
        ValueType::Array {
            items: Box::new(items),
        }
    }

    /// Build a record type from `(name, type)` pairs, keeping their order
    pub fn record<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, ValueType)>,
        S: Into<String>,
    {
        ValueType::Record {
            fields: fields
                .into_iter()
                .map(|(name, ty)| Field {
                    name: name.into(),
                    ty,
                })
                .collect(),
        }
    }

    /// Infer the type of a literal JSON value
    pub fn of(value: &JsonValue) -> Self {
        match value {
            JsonValue::String(_) => ValueType::String,
            JsonValue::Bool(_) => ValueType::Boolean,
            JsonValue::Number(n) if n.is_i64() || n.is_u64() => ValueType::Integer,
            JsonValue::Number(_) => ValueType::Number,
            JsonValue::Null => ValueType::Any,
            JsonValue::Array(items) => {
                let mut iter = items.iter().map(ValueType::of);
                let first = match iter.next() {
                    Some(ty) => ty,
                    None => return ValueType::array(ValueType::Any),
                };
                let items = iter.fold(first, |acc, ty| acc.unify(&ty).unwrap_or(ValueType::Any));
                ValueType::array(items)
            }
            JsonValue::Object(map) => ValueType::Record {
                fields: map
                    .iter()
                    .map(|(k, v)| Field {
                        name: k.clone(),
                        ty: ValueType::of(v),
                    })
                    .collect(),
            },
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            ValueType::String | ValueType::Number | ValueType::Integer | ValueType::Boolean
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Number | ValueType::Integer)
    }

    /// Types that support `<`, `<=`, `>`, `>=`
    pub fn is_ordered(&self) -> bool {
        self.is_numeric() || matches!(self, ValueType::String)
    }

    /// Whether a value of this type may be bound where `target` is expected.
    ///
    /// Integers widen to numbers, everything is accepted by `any`, arrays are
    /// covariant and records accept any record that carries at least the
    /// target's fields. `any` itself is only accepted by `any`.
    pub fn is_assignable_to(&self, target: &ValueType) -> bool {
        match (self, target) {
            (_, ValueType::Any) => true,
            (a, b) if a == b => true,
            (ValueType::Integer, ValueType::Number) => true,
            (ValueType::Array { items: a }, ValueType::Array { items: b }) => {
                a.is_assignable_to(b)
            }
            (ValueType::Record { fields: have }, ValueType::Record { fields: want }) => {
                want.iter().all(|w| {
                    have.iter()
                        .any(|h| h.name == w.name && h.ty.is_assignable_to(&w.ty))
                })
            }
            _ => false,
        }
    }

    /// The narrowest type both sides can be assigned to, if any
    pub fn unify(&self, other: &ValueType) -> Option<ValueType> {
        if self == other {
            Some(self.clone())
        } else if self.is_assignable_to(other) && *other != ValueType::Any {
            Some(other.clone())
        } else if other.is_assignable_to(self) && *self != ValueType::Any {
            Some(self.clone())
        } else {
            None
        }
    }

    /// Follow a key/index sequence through this type.
    ///
    /// Known records and arrays are followed precisely; as soon as the shape
    /// stops being known the result degrades to [`ValueType::Any`]. A key that
    /// is provably absent from a known record is rejected.
    pub fn project(&self, segments: &[PathSegment]) -> Result<ValueType, ExprError> {
        let mut current = self.clone();
        for (i, segment) in segments.iter().enumerate() {
            current = match (&current, segment) {
                (ValueType::Any, _) => return Ok(ValueType::Any),
                // Strings may hold serialized documents
                (ValueType::String, _) => return Ok(ValueType::Any),
                (ValueType::Record { fields }, PathSegment::Key(key)) => fields
                    .iter()
                    .find(|f| &f.name == key)
                    .map(|f| f.ty.clone())
                    .ok_or_else(|| ExprError::InvalidPath {
                        path: render_segments(&segments[..=i]),
                        reason: format!("record {} has no field '{}'", current, key),
                    })?,
                (ValueType::Array { items }, PathSegment::Index(_)) => (**items).clone(),
                (other, segment) => {
                    return Err(ExprError::InvalidPath {
                        path: render_segments(&segments[..=i]),
                        reason: format!("cannot apply {} to a value of type {}", segment, other),
                    })
                }
            };
        }
        Ok(current)
    }
}

fn render_segments(segments: &[PathSegment]) -> String {
    segments.iter().map(|s| s.to_string()).collect::<Vec<_>>().join("")
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::String => write!(f, "string"),
            ValueType::Number => write!(f, "number"),
            ValueType::Integer => write!(f, "integer"),
            ValueType::Boolean => write!(f, "boolean"),
            ValueType::Array { items } => write!(f, "array<{}>", items),
            ValueType::Record { fields } => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.ty)?;
                }
                write!(f, "}}")
            }
            ValueType::Any => write!(f, "any"),
        }
    }
}
