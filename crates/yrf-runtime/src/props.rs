#![forbid(unsafe_code)]

//! Construction-time configuration of hosts.
//!
//! [`Props`] is an ordered key → [`Prop`] map. Keys carrying the special
//! prefix (see [`FrameConfig::special_prefix`](crate::FrameConfig)) configure
//! bindings and are read by the host's constructor; all other keys are plain
//! attributes applied to the node.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;
use yrf_core::AttrValue;

use crate::binding::BindingTarget;

/// One configuration value.
#[derive(Debug, Clone)]
pub enum Prop {
    /// Plain attribute or behavior hook.
    Attr(AttrValue),
    /// Binding target for a listener, source or trigger.
    Binding(BindingTarget),
    /// Value for a static binding.
    Value(Value),
}

impl From<AttrValue> for Prop {
    fn from(v: AttrValue) -> Self {
        Self::Attr(v)
    }
}

impl From<&str> for Prop {
    fn from(s: &str) -> Self {
        Self::Attr(AttrValue::from(s))
    }
}

impl From<String> for Prop {
    fn from(s: String) -> Self {
        Self::Attr(AttrValue::from(s))
    }
}

impl From<BindingTarget> for Prop {
    fn from(t: BindingTarget) -> Self {
        Self::Binding(t)
    }
}

impl From<Value> for Prop {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

/// Ordered configuration map.
#[derive(Debug, Clone, Default)]
pub struct Props {
    entries: BTreeMap<String, Prop>,
}

impl Props {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, prop: impl Into<Prop>) -> Self {
        self.insert(key, prop);
        self
    }

    /// Set `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, prop: impl Into<Prop>) -> Option<Prop> {
        self.entries.insert(key.into(), prop.into())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Prop> {
        self.entries.get(key)
    }

    /// Binding target under `key`, if that is what it holds.
    #[must_use]
    pub fn binding(&self, key: &str) -> Option<BindingTarget> {
        match self.entries.get(key) {
            Some(Prop::Binding(t)) => Some(t.clone()),
            _ => None,
        }
    }

    /// Static value under `key`, if that is what it holds.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<Value> {
        match self.entries.get(key) {
            Some(Prop::Value(v)) => Some(v.clone()),
            _ => None,
        }
    }

    /// Text attribute under `key`.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(Prop::Attr(AttrValue::Text(s))) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Prop)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// `defaults` overlaid with `props`; caller values win.
    #[must_use]
    pub fn merged(defaults: &Self, props: &Self) -> Self {
        let mut entries = defaults.entries.clone();
        entries.extend(props.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { entries }
    }

    /// Split into plain attributes and special props.
    ///
    /// Plain keys holding a static value are stringified (strings as-is,
    /// everything else as JSON). Plain keys holding a binding target are
    /// dropped with a warning.
    #[must_use]
    pub fn partition(&self, prefix: &str) -> (Vec<(String, AttrValue)>, Self) {
        let mut plain = Vec::new();
        let mut special = Self::new();
        for (key, prop) in &self.entries {
            if key.starts_with(prefix) {
                special.entries.insert(key.clone(), prop.clone());
                continue;
            }
            match prop {
                Prop::Attr(value) => plain.push((key.clone(), value.clone())),
                Prop::Value(Value::String(s)) => {
                    plain.push((key.clone(), AttrValue::from(s.as_str())));
                }
                Prop::Value(other) => plain.push((key.clone(), AttrValue::from(other.to_string()))),
                Prop::Binding(target) => {
                    warn!(key = %key, %target, "binding under a plain key ignored");
                }
            }
        }
        (plain, special)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use yrf_bus::EventKind;

    use super::*;

    const CHANGE: EventKind = EventKind::new("change");

    #[test]
    fn caller_values_win() {
        let defaults = Props::new().with("class", "base").with("title", "t");
        let props = Props::new().with("class", "mine");
        let merged = Props::merged(&defaults, &props);
        assert_eq!(merged.text("class"), Some("mine"));
        assert_eq!(merged.text("title"), Some("t"));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn partition_splits_on_prefix() {
        let props = Props::new()
            .with("yr:value", BindingTarget::on(CHANGE).field("v"))
            .with("yr:label", json!("hi"))
            .with("class", "row")
            .with("width", json!(3))
            .with("href", AttrValue::Unset);
        let (plain, special) = props.partition("yr:");
        assert_eq!(special.len(), 2);
        assert!(special.binding("yr:value").is_some());
        assert_eq!(special.value("yr:label"), Some(json!("hi")));

        let keys: Vec<_> = plain.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["class", "href", "width"]);
        assert!(matches!(&plain[2].1, AttrValue::Text(s) if s == "3"));
    }

    #[test]
    fn stray_binding_is_not_an_attribute() {
        let props = Props::new().with("value", BindingTarget::on(CHANGE));
        let (plain, special) = props.partition("yr:");
        assert!(plain.is_empty());
        assert!(special.is_empty());
    }

    #[test]
    fn typed_accessors_reject_other_variants() {
        let props = Props::new().with("a", json!(1)).with("b", "x");
        assert!(props.binding("a").is_none());
        assert!(props.value("b").is_none());
        assert!(props.text("a").is_none());
        assert!(props.get("missing").is_none());
    }
}
