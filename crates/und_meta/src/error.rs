use alloc::boxed::Box;
use alloc::string::String;

use thiserror::Error;
use und_types::XmlError;

/// Reasons a type's field table could not be built.
///
/// Failed builds are never cached; the next caller retries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MetaError {
    #[error("`{type_path}`: field `{field}` has an empty wire name")]
    EmptyWireName {
        type_path: &'static str,
        field: &'static str,
    },
    #[error("`{type_path}`: wire name `{wire_name}` is used by more than one field")]
    DuplicateWireName {
        type_path: &'static str,
        wire_name: &'static str,
    },
    #[error("`{type_path}`: field `{field}` cannot be carried as a string")]
    UnsupportedHint {
        type_path: &'static str,
        field: &'static str,
    },
    #[error("`{type_path}`: flattened field `{field}` is invalid")]
    Flatten {
        type_path: &'static str,
        field: &'static str,
        #[source]
        source: Box<MetaError>,
    },
    #[error("`{type_path}` flattens itself")]
    Cycle { type_path: &'static str },
    #[error("`{type_path}`: {message}")]
    Custom {
        type_path: &'static str,
        message: String,
    },
}

/// Errors from the struct drivers in [`json`](crate::json) and
/// [`xml`](crate::xml).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    #[error(transparent)]
    Meta(#[from] MetaError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error("`{type_path}` expects a JSON object, found {found}")]
    ExpectedObject {
        type_path: &'static str,
        found: &'static str,
    },
    #[error("a string-carried field expects a JSON string, found {found}")]
    HintMismatch { found: &'static str },
    #[error("field `{field}` of `{type_path}`{}: {source}", at(.snippet))]
    Field {
        type_path: &'static str,
        field: &'static str,
        snippet: Option<String>,
        #[source]
        source: Box<CodecError>,
    },
}

fn at(snippet: &Option<String>) -> String {
    match snippet {
        Some(s) => alloc::format!(" at `{s}`"),
        None => String::new(),
    }
}

impl CodecError {
    /// The innermost error, skipping field context.
    pub fn root(&self) -> &CodecError {
        match self {
            CodecError::Field { source, .. } => source.root(),
            other => other,
        }
    }

    /// Field names from the outermost struct inwards.
    pub fn field_path(&self) -> alloc::vec::Vec<&'static str> {
        let mut path = alloc::vec::Vec::new();
        let mut current = self;
        while let CodecError::Field { field, source, .. } = current {
            path.push(*field);
            current = source;
        }
        path
    }
}

/// Short JSON type name used in messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
