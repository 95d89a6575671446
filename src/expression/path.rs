//! Path segments used by `path`, `json_path` and `dig` projections

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ExprError;

/// One step of a projection: a property key or an array index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl PathSegment {
    /// Parse a JSON-path style string such as `$.cluster.endpoints[0]` or
    /// `metadata['app.kubernetes.io/name']`. The leading `$` is optional.
    pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, ExprError> {
        let invalid = |reason: &str| ExprError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let mut rest = path.trim();
        rest = rest.strip_prefix('$').unwrap_or(rest);
        let mut segments = Vec::new();
        let mut first = true;

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix("['") {
                let end = after.find("']").ok_or_else(|| invalid("unterminated quoted key"))?;
                segments.push(PathSegment::Key(after[..end].to_string()));
                rest = &after[end + 2..];
            } else if let Some(after) = rest.strip_prefix('[') {
                let end = after.find(']').ok_or_else(|| invalid("unterminated index"))?;
                let index = after[..end]
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| invalid("index must be a non-negative integer"))?;
                segments.push(PathSegment::Index(index));
                rest = &after[end + 1..];
            } else {
                let body = match rest.strip_prefix('.') {
                    Some(after) => after,
                    None if first => rest,
                    None => return Err(invalid("expected '.' or '['")),
                };
                let end = body.find(['.', '[']).unwrap_or(body.len());
                if end == 0 {
                    return Err(invalid("empty key"));
                }
                segments.push(PathSegment::Key(body[..end].to_string()));
                rest = &body[end..];
            }
            first = false;
        }

        if segments.is_empty() {
            return Err(invalid("path has no segments"));
        }
        Ok(segments)
    }

    /// Render a segment list as a `$`-rooted JSON path
    pub fn to_json_path(segments: &[PathSegment]) -> String {
        let mut out = String::from("$");
        for segment in segments {
            out.push_str(&segment.to_string());
        }
        out
    }
}

pub(crate) fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) if is_identifier(key) => write!(f, ".{}", key),
            PathSegment::Key(key) => write!(f, "['{}']", key),
            PathSegment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}
