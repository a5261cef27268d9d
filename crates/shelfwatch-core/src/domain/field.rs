use serde::{Serialize, Serializer};

/// A record attribute that was either determined or explicitly not found.
///
/// `NotFound` is distinct from zero: a `Found(0)` review count and a
/// `NotFound` review count render differently in the grid.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Field<T> {
    Found(T),
    #[default]
    NotFound,
}

impl<T> Field<T> {
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn as_ref(&self) -> Field<&T> {
        match self {
            Self::Found(value) => Field::Found(value),
            Self::NotFound => Field::NotFound,
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Self::Found(value) => Field::Found(f(value)),
            Self::NotFound => Field::NotFound,
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Field<U>) -> Field<U> {
        match self {
            Self::Found(value) => f(value),
            Self::NotFound => Field::NotFound,
        }
    }

    pub fn or_else(self, f: impl FnOnce() -> Field<T>) -> Field<T> {
        match self {
            Self::Found(value) => Field::Found(value),
            Self::NotFound => f(),
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Found(value),
            None => Self::NotFound,
        }
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Found(value) => value.serialize(serializer),
            Self::NotFound => serializer.serialize_none(),
        }
    }
}
