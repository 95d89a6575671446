//! Expression → interpolation text
//!
//! Two textual forms exist:
//!
//! - **template** form, used wherever the engine expects a parameter value: a
//!   plain reference renders as `{{inputs.parameters.x}}`, a string literal as
//!   itself, and anything computed as an inline expression `{{=...}}`.
//! - **inline** form, the expression language inside `{{=...}}` and
//!   `valueFrom.expression`. The engine hands every parameter over as text, so
//!   structured parameters are decoded with `fromJSON` before use.

use serde_json::Value as JsonValue;

use crate::error::RenderError;
use crate::expression::{is_identifier, Expr, ParamSource, PathSegment};
use crate::types::ValueType;

/// Render `expr` for a parameter value position
pub fn render_template(expr: &Expr) -> Result<String, RenderError> {
    match expr {
        Expr::Literal { value, .. } => {
            let text = literal_text(value);
            if collides_with_delimiters(value, &text) {
                Ok(format!("{{{{={}}}}}", inline_literal(value)))
            } else {
                Ok(text)
            }
        }
        Expr::Parameter { source, .. } => Ok(format!("{{{{{}}}}}", reference(source))),
        Expr::Item { .. } => Ok("{{item}}".to_string()),
        Expr::ConfigMap { .. } => Err(unsupported(expr, "as a template value")),
        Expr::Cast { source, .. } => render_template(source),
        Expr::AsString { source } => match &**source {
            Expr::Literal { .. } | Expr::Parameter { .. } | Expr::Item { .. } => render_template(source),
            other => Ok(format!("{{{{={}}}}}", text(other)?)),
        },
        // Adjacent braces of neighbouring pieces could form a delimiter
        Expr::Concat { parts, separator } if has_brace_text(parts, separator.as_deref()) => {
            Ok(format!("{{{{={}}}}}", render_inline(expr)?))
        }
        Expr::Concat { parts, separator } => {
            let rendered = parts
                .iter()
                .map(render_template)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rendered.join(separator.as_deref().unwrap_or("")))
        }
        other => Ok(format!("{{{{={}}}}}", render_inline(other)?)),
    }
}

/// Render `expr` in the inline expression language, without delimiters
pub fn render_inline(expr: &Expr) -> Result<String, RenderError> {
    match expr {
        Expr::Literal { value, .. } => Ok(inline_literal(value)),
        Expr::Parameter { source, ty } => {
            let name = inline_reference(source);
            Ok(if is_textual(ty) {
                name
            } else {
                format!("fromJSON({})", name)
            })
        }
        Expr::Item { .. } => Ok("item".to_string()),
        Expr::ConfigMap { .. } => Err(unsupported(expr, "inside an expression")),

        Expr::Path {
            source, segments, ..
        }
        | Expr::JsonPath {
            source, segments, ..
        } => Ok(format!(
            "{} | jsonpath({})",
            operand(source, text(source)?),
            quote_string(&PathSegment::to_json_path(segments))
        )),
        Expr::Dig {
            source,
            segments,
            fallback,
            ..
        } => {
            let mut args: Vec<String> = segments
                .iter()
                .map(|segment| match segment {
                    PathSegment::Key(key) => quote_string(key),
                    PathSegment::Index(index) => quote_string(&index.to_string()),
                })
                .collect();
            args.push(render_inline(fallback)?);
            args.push(structured(source)?);
            Ok(format!("sprig.dig({})", args.join(", ")))
        }

        Expr::Concat { parts, separator } => {
            if parts.is_empty() {
                return Ok(quote_string(""));
            }
            let rendered = parts
                .iter()
                .map(|part| Ok(operand(part, render_inline(part)?)))
                .collect::<Result<Vec<_>, RenderError>>()?;
            let glue = match separator.as_deref() {
                Some(sep) if !sep.is_empty() => format!(" + {} + ", quote_string(sep)),
                _ => " + ".to_string(),
            };
            Ok(rendered.join(&glue))
        }
        Expr::Ternary {
            condition,
            when_true,
            when_false,
            ..
        } => Ok(format!(
            "{} ? {} : {}",
            operand(condition, render_inline(condition)?),
            operand(when_true, render_inline(when_true)?),
            operand(when_false, render_inline(when_false)?)
        )),
        Expr::Arithmetic {
            op, left, right, ..
        } => binary(op.symbol(), left, right),
        Expr::Comparison { op, left, right } => binary(op.symbol(), left, right),
        Expr::Logical { op, left, right } => binary(op.symbol(), left, right),
        Expr::Not { operand: inner } => Ok(format!("!{}", operand(inner, render_inline(inner)?))),

        Expr::ArrayLength { source } => Ok(format!("len({})", structured(source)?)),
        Expr::ArrayIndex { source, index, .. } => Ok(format!(
            "{}[{}]",
            operand(source, structured(source)?),
            render_inline(index)?
        )),
        Expr::AsString { source } => text(source),
        Expr::Cast { source, ty } => {
            let from = source.ty();
            if is_textual(&from) && !is_textual(ty) && !matches!(**source, Expr::Literal { .. }) {
                Ok(format!("fromJSON({})", text(source)?))
            } else {
                render_inline(source)
            }
        }
    }
}

/// Quote `value` as a single-quoted string of the inline language.
///
/// Braces are hex-escaped so the result never closes an enclosing `{{=...}}`.
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '{' => out.push_str("\\x7b"),
            '}' => out.push_str("\\x7d"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Dotted reference as written between `{{ }}`
pub fn reference(source: &ParamSource) -> String {
    source.describe()
}

/* ===================== Helpers ===================== */

/// Reference usable inside the inline language, where keys that are not
/// identifiers need index syntax
fn inline_reference(source: &ParamSource) -> String {
    let member = |key: &str| {
        if is_identifier(key) {
            format!(".{}", key)
        } else {
            format!("[{}]", quote_string(key))
        }
    };
    match source {
        ParamSource::Workflow { name } => format!("workflow.parameters{}", member(name)),
        ParamSource::Input { name } => format!("inputs.parameters{}", member(name)),
        ParamSource::StepOutput { step, name } => {
            format!("steps{}.outputs.parameters{}", member(step), member(name))
        }
        ParamSource::TaskOutput { task, name } => {
            format!("tasks{}.outputs.parameters{}", member(task), member(name))
        }
    }
}

/// The value's textual form, as the engine would hand it to a container
fn text(expr: &Expr) -> Result<String, RenderError> {
    match expr {
        Expr::Parameter { source, .. } => Ok(inline_reference(source)),
        Expr::Cast { source, .. } => text(source),
        other if other.ty() == ValueType::String => render_inline(other),
        other => Ok(format!("toJSON({})", render_inline(other)?)),
    }
}

/// The value decoded into a structure the inline language can index
fn structured(expr: &Expr) -> Result<String, RenderError> {
    let rendered = render_inline(expr)?;
    Ok(match expr.ty() {
        ValueType::Array { .. } | ValueType::Record { .. } => rendered,
        _ if matches!(expr, Expr::Item { .. } | Expr::Literal { .. }) => rendered,
        _ => format!("fromJSON({})", operand(expr, rendered)),
    })
}

fn binary(symbol: &str, left: &Expr, right: &Expr) -> Result<String, RenderError> {
    Ok(format!(
        "{} {} {}",
        operand(left, render_inline(left)?),
        symbol,
        operand(right, render_inline(right)?)
    ))
}

/// Parenthesize `rendered` when `expr` is an operator or pipe expression
fn operand(expr: &Expr, rendered: String) -> String {
    if is_compound(expr) {
        format!("({})", rendered)
    } else {
        rendered
    }
}

fn is_compound(expr: &Expr) -> bool {
    match expr {
        Expr::Ternary { .. }
        | Expr::Arithmetic { .. }
        | Expr::Comparison { .. }
        | Expr::Logical { .. }
        | Expr::Path { .. }
        | Expr::JsonPath { .. } => true,
        Expr::Concat { parts, .. } => parts.len() > 1,
        Expr::Cast { source, .. } => is_compound(source),
        _ => false,
    }
}

/// Whether values of this type reach the inline language as plain strings
fn is_textual(ty: &ValueType) -> bool {
    matches!(ty, ValueType::String | ValueType::Any)
}

/// Whether the template text of a literal would be read as a `{{...}}` tag
fn collides_with_delimiters(value: &JsonValue, text: &str) -> bool {
    match value {
        JsonValue::String(_) => text.contains("{{") || text.contains("}}"),
        // `}}` closes nested JSON objects harmlessly; only an opening tag matters
        _ => text.contains("{{"),
    }
}

fn has_brace_text(parts: &[Expr], separator: Option<&str>) -> bool {
    let braced = |text: &str| text.contains('{') || text.contains('}');
    separator.map_or(false, braced)
        || parts.iter().any(|part| match part {
            Expr::Literal { value, .. } => braced(&literal_text(value)),
            _ => false,
        })
}

fn literal_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn inline_literal(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => quote_string(s),
        JsonValue::Null => "nil".to_string(),
        JsonValue::Bool(_) | JsonValue::Number(_) => value.to_string(),
        JsonValue::Array(_) | JsonValue::Object(_) => {
            format!("fromJSON({})", quote_string(&value.to_string()))
        }
    }
}

fn unsupported(expr: &Expr, position: &'static str) -> RenderError {
    RenderError::UnsupportedPosition {
        kind: expr.kind(),
        position,
    }
}
