use std::borrow::Cow;

use thiserror::Error;

/// Faults raised by the value and collection core.
///
/// Misses that read as null in scripts, such as a hash-part miss or a missing savefile entry,
/// are returned as values and never show up here.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("value {value} was not the expected type of {expected}")]
    TypeCast { value: String, expected: &'static str },

    #[error("list index {index} out of bounds (length {len})")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("invalid index {0}")]
    InvalidIndex(String),

    #[error("{op} is not supported on {kind}")]
    NotSupported { op: &'static str, kind: &'static str },

    #[error("undefined var \"{name}\" on {ty}")]
    UndefinedVariable { name: String, ty: String },

    #[error("undefined global var \"{0}\"")]
    UndefinedGlobal(String),

    #[error("undefined type {0}")]
    UndefinedType(String),

    #[error("unsupported storage type {0}")]
    UnsupportedType(&'static str),

    #[error("object was deleted")]
    DeletedObject,

    #[error("{0}")]
    InvalidArguments(Cow<'static, str>),

    #[error("invalid operation: {lhs} {op} {rhs}")]
    InvalidOperation {
        op: &'static str,
        lhs: String,
        rhs: String,
    },

    #[error("division by zero")]
    DivideByZero,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed savefile: {0}")]
    Json(#[from] serde_json::Error),
}

impl RuntimeError {
    pub fn invalid_arguments(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidArguments(message.into())
    }

    pub fn not_supported(op: &'static str, kind: &'static str) -> Self {
        Self::NotSupported { op, kind }
    }

    pub fn out_of_bounds(index: i64, len: usize) -> Self {
        Self::IndexOutOfBounds { index, len }
    }
}

pub type Result<T, E = RuntimeError> = std::result::Result<T, E>;
