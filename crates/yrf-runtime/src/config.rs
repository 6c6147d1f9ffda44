#![forbid(unsafe_code)]

//! Runtime configuration.

use yrf_bus::{EventKind, Priority};

use crate::binding::BindingTarget;

/// Knobs shared by a [`Factory`](crate::Factory) and everything it builds.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FrameConfig {
    /// Key prefix marking special (binding) props. Default `"yr:"`.
    pub special_prefix: String,
    /// Deepest list nesting accepted in children. Default 5.
    pub max_child_depth: usize,
    /// Priority of targets built with [`FrameConfig::target`]. Default 0.
    pub default_nice: Priority,
    /// Turns [`EventLoop::run_until_idle`](crate::EventLoop::run_until_idle)
    /// may take before giving up. Default 1024.
    pub max_idle_turns: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            special_prefix: "yr:".to_owned(),
            max_child_depth: 5,
            default_nice: 0,
            max_idle_turns: 1024,
        }
    }
}

impl FrameConfig {
    #[must_use]
    pub fn with_special_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.special_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_max_child_depth(mut self, depth: usize) -> Self {
        self.max_child_depth = depth;
        self
    }

    #[must_use]
    pub fn with_default_nice(mut self, nice: Priority) -> Self {
        self.default_nice = nice;
        self
    }

    #[must_use]
    pub fn with_max_idle_turns(mut self, turns: usize) -> Self {
        self.max_idle_turns = turns;
        self
    }

    /// Whether `key` names a special prop.
    #[must_use]
    pub fn is_special(&self, key: &str) -> bool {
        key.starts_with(&self.special_prefix)
    }

    /// Target the whole payload of `kind` at the default priority.
    #[must_use]
    pub fn target(&self, kind: EventKind) -> BindingTarget {
        BindingTarget::on(kind).with_nice(self.default_nice)
    }
}
