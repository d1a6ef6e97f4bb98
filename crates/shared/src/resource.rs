//! Lifecycle of a single asynchronous fetch.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Resource<T, E> {
    /// No fetch has started.
    Empty,
    Loading,
    Success(T),
    Error(E),
}

impl<T, E> Default for Resource<T, E> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<T, E> Resource<T, E> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// `true` once the fetch has produced a value or a failure.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Error(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Error(cause) => Some(cause),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Resource<&T, &E> {
        match self {
            Self::Empty => Resource::Empty,
            Self::Loading => Resource::Loading,
            Self::Success(value) => Resource::Success(value),
            Self::Error(cause) => Resource::Error(cause),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resource<U, E> {
        match self {
            Self::Empty => Resource::Empty,
            Self::Loading => Resource::Loading,
            Self::Success(value) => Resource::Success(f(value)),
            Self::Error(cause) => Resource::Error(cause),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Loading => "loading",
            Self::Success(_) => "success",
            Self::Error(_) => "error",
        }
    }
}

impl<T, E> From<Result<T, E>> for Resource<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(cause) => Self::Error(cause),
        }
    }
}
