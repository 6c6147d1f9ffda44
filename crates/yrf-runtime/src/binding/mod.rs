#![forbid(unsafe_code)]

//! Binding declarations and the per-host binding manager.

mod error;
mod manager;
mod target;

pub use error::BindingError;
pub use manager::{BindingManager, PullCallback};
pub use target::{BindingKind, BindingTarget, Requirement};
