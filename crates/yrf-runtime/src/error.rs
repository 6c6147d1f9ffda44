#![forbid(unsafe_code)]

//! Runtime error type.

use std::fmt;

use yrf_bus::BusError;
use yrf_core::TreeError;

use crate::binding::BindingError;

/// Errors from building, mounting and driving components.
#[derive(Debug)]
pub enum FrameError {
    Binding(BindingError),
    Tree(TreeError),
    Bus(BusError),
    /// A child was [`Child::Missing`](crate::Child::Missing).
    UndefinedChild,
    /// Children nested deeper than the configured flattening depth.
    NestingTooDeep { max: usize },
    /// The host's document was dropped.
    DocumentGone { owner: String },
    /// The event loop kept producing work.
    NotIdle { turns: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binding(e) => write!(f, "{e}"),
            Self::Tree(e) => write!(f, "{e}"),
            Self::Bus(e) => write!(f, "{e}"),
            Self::UndefinedChild => f.write_str("An element's child cannot be undefined"),
            Self::NestingTooDeep { max } => {
                write!(f, "children nested deeper than {max} levels")
            }
            Self::DocumentGone { owner } => write!(f, "document of '{owner}' was dropped"),
            Self::NotIdle { turns } => write!(f, "event loop not idle after {turns} turns"),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Binding(e) => Some(e),
            Self::Tree(e) => Some(e),
            Self::Bus(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BindingError> for FrameError {
    fn from(e: BindingError) -> Self {
        Self::Binding(e)
    }
}

impl From<TreeError> for FrameError {
    fn from(e: TreeError) -> Self {
        Self::Tree(e)
    }
}

impl From<BusError> for FrameError {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}
