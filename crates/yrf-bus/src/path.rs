#![forbid(unsafe_code)]

//! Field paths into an event payload.
//!
//! A [`FieldPath`] locates a value inside an [`Event`](crate::Event) payload.
//! Paths are at most two levels deep; the type makes deeper paths
//! unrepresentable, and [`FieldPath::from_segments`] rejects them.
//!
//! Reading is defined for every depth. Writing (replace, set, remove) is only
//! defined for [`FieldPath::Whole`] and [`FieldPath::Field`]; callers that
//! write decide what to do with a [`FieldPath::Nested`] path.

use std::fmt;

use crate::error::BusError;

/// Maximum number of segments a path may carry.
pub const MAX_PATH_DEPTH: usize = 2;

/// Location of a value inside an event payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FieldPath {
    /// The whole payload.
    #[default]
    Whole,
    /// A top-level field.
    Field(String),
    /// A field of a top-level object field.
    Nested(String, String),
}

impl FieldPath {
    /// Path to a top-level field.
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    /// Path to a second-level field.
    #[must_use]
    pub fn nested(outer: impl Into<String>, inner: impl Into<String>) -> Self {
        Self::Nested(outer.into(), inner.into())
    }

    /// Build a path from raw segments.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::PathTooDeep`] for more than [`MAX_PATH_DEPTH`] segments.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Result<Self, BusError> {
        match segments {
            [] => Ok(Self::Whole),
            [a] => Ok(Self::field(a.as_ref())),
            [a, b] => Ok(Self::nested(a.as_ref(), b.as_ref())),
            _ => Err(BusError::PathTooDeep {
                depth: segments.len(),
            }),
        }
    }

    /// Number of segments (0, 1 or 2).
    #[must_use]
    pub const fn depth(&self) -> usize {
        match self {
            Self::Whole => 0,
            Self::Field(_) => 1,
            Self::Nested(..) => 2,
        }
    }

    /// Segments in order.
    #[must_use]
    pub fn segments(&self) -> Vec<&str> {
        match self {
            Self::Whole => Vec::new(),
            Self::Field(a) => vec![a.as_str()],
            Self::Nested(a, b) => vec![a.as_str(), b.as_str()],
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Whole => f.write_str("<payload>"),
            Self::Field(a) => f.write_str(a),
            Self::Nested(a, b) => write!(f, "{a}.{b}"),
        }
    }
}

impl From<&str> for FieldPath {
    fn from(name: &str) -> Self {
        Self::field(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_map_to_variants() {
        let empty: [&str; 0] = [];
        assert_eq!(FieldPath::from_segments(&empty).unwrap(), FieldPath::Whole);
        assert_eq!(
            FieldPath::from_segments(&["x"]).unwrap(),
            FieldPath::field("x")
        );
        assert_eq!(
            FieldPath::from_segments(&["x", "y"]).unwrap(),
            FieldPath::nested("x", "y")
        );
    }

    #[test]
    fn three_segments_rejected() {
        let err = FieldPath::from_segments(&["a", "b", "c"]).unwrap_err();
        assert!(matches!(err, BusError::PathTooDeep { depth: 3 }));
    }

    #[test]
    fn depth_and_display() {
        assert_eq!(FieldPath::Whole.depth(), 0);
        assert_eq!(FieldPath::field("x").depth(), 1);
        let nested = FieldPath::nested("user", "name");
        assert_eq!(nested.depth(), 2);
        assert_eq!(nested.to_string(), "user.name");
        assert_eq!(nested.segments(), vec!["user", "name"]);
    }
}
