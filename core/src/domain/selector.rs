//! Selector domain models: how targets are matched.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Error returned when a `key=value` label cannot be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid label '{input}': {reason}")]
pub struct LabelParseError {
    pub input: String,
    pub reason: &'static str,
}

// ============================================================================
// Label
// ============================================================================

/// A single `key=value` label constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label {
    pub key: String,
    pub value: String,
}

impl Label {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl FromStr for Label {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| LabelParseError {
            input: s.to_string(),
            reason,
        };

        let (key, value) = s.split_once('=').ok_or_else(|| err("expected key=value"))?;
        if key.is_empty() {
            return Err(err("label key is empty"));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(err("labels cannot contain whitespace"));
        }

        Ok(Self::new(key, value))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

// ============================================================================
// LabelSelector
// ============================================================================

/// A set of label constraints that must all match.
///
/// Stored by key so the rendered selector is stable regardless of the order
/// the labels were given in. A repeated key keeps its last value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelSelector {
    labels: BTreeMap<String, String>,
}

impl LabelSelector {
    pub fn new(labels: impl IntoIterator<Item = Label>) -> Self {
        Self {
            labels: labels.into_iter().map(|l| (l.key, l.value)).collect(),
        }
    }

    /// Builds a selector from a service's `spec.selector` map.
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        Self {
            labels: map.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl fmt::Display for LabelSelector {
    /// Renders as comma-joined `key=value` pairs without whitespace.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.labels {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{}={}", key, value)?;
            first = false;
        }
        Ok(())
    }
}

// ============================================================================
// SelectorSpec
// ============================================================================

/// What kind of thing a selector names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetKind {
    /// Pods matching all labels (direct mode).
    Labels(LabelSelector),
    /// A single pod by exact name (direct mode).
    Name(String),
    /// Pods behind the named service's own selector (indirect mode).
    Service(String),
}

/// Immutable description of how to find targets within one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorSpec {
    pub namespace: String,
    pub kind: TargetKind,
}

impl SelectorSpec {
    pub fn labels(namespace: impl Into<String>, labels: impl IntoIterator<Item = Label>) -> Self {
        Self {
            namespace: namespace.into(),
            kind: TargetKind::Labels(LabelSelector::new(labels)),
        }
    }

    pub fn name(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            kind: TargetKind::Name(name.into()),
        }
    }

    pub fn service(namespace: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            kind: TargetKind::Service(service.into()),
        }
    }

    /// Whether this selector goes through a service.
    pub fn is_service(&self) -> bool {
        matches!(self.kind, TargetKind::Service(_))
    }
}

impl fmt::Display for SelectorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TargetKind::Labels(selector) => {
                write!(f, "labels [{}] in namespace {}", selector, self.namespace)
            }
            TargetKind::Name(name) => write!(f, "pod {} in namespace {}", name, self.namespace),
            TargetKind::Service(name) => {
                write!(f, "service {} in namespace {}", name, self.namespace)
            }
        }
    }
}
