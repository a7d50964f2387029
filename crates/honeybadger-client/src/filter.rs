//! Decides whether a captured fault is reported at all

use honeybadger_core::{DispatchConfig, Fault};
use std::collections::BTreeSet;

/// Prefix-based exclusion on the fault's type name and on its innermost frame
#[derive(Debug, Clone, Default)]
pub struct ExclusionPolicy {
    exception_prefixes: BTreeSet<String>,
    frame_prefixes: BTreeSet<String>,
}

impl ExclusionPolicy {
    pub fn new(exception_prefixes: BTreeSet<String>, frame_prefixes: BTreeSet<String>) -> Self {
        Self {
            exception_prefixes,
            frame_prefixes,
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(
            config.excluded_exception_prefixes.clone(),
            config.excluded_frame_prefixes.clone(),
        )
    }

    /// True when the fault must not be reported: it is absent, its type is excluded, or
    /// its innermost frame belongs to an excluded type.
    pub fn should_exclude(&self, fault: Option<&Fault>) -> bool {
        let Some(fault) = fault else {
            return true;
        };

        if matches_any(&self.exception_prefixes, &fault.type_name) {
            return true;
        }

        if self.frame_prefixes.is_empty() {
            return false;
        }

        fault
            .innermost_frame()
            .is_some_and(|frame| matches_any(&self.frame_prefixes, &frame.declaring_type))
    }
}

fn matches_any(prefixes: &BTreeSet<String>, name: &str) -> bool {
    prefixes.iter().any(|prefix| matches_prefix(prefix, name))
}

/// Path-aware prefix match: `a.b` matches `a.b`, `a.b.C` and `a.b::C` but not `a.bc`.
/// An entry that already ends in a separator matches anything below it.
pub fn matches_prefix(prefix: &str, name: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    if prefix.ends_with('.') || prefix.ends_with("::") {
        return name.starts_with(prefix);
    }
    match name.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with('.') || rest.starts_with("::"),
        None => false,
    }
}
