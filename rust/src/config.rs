//! Configuration types for network construction and export.

use pyo3::prelude::*;

/// What to do with records that have fewer than the four required fields.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordPolicy {
    /// Abort the run with `MalformedRecord`.
    Strict,
    /// Skip the record and log it at CHECKS verbosity.
    SkipShort,
}

/// How many dummies consistency repair may add for one activity.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsistencyMode {
    /// One dummy for the first predecessor missing from the head event.
    FirstMissing,
    /// Dummies until every declared predecessor reaches the head event.
    Complete,
}

/// Backward-pass rule for latest finish times.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LatestFinishRule {
    /// `LFT = min(EST(tail) - duration)`; terminal events use their own EST.
    SuccessorEarliest,
    /// `LFT = min(LFT(tail) - duration)`; terminal events use the project end.
    ProjectEnd,
}

impl Default for RecordPolicy {
    fn default() -> Self {
        Self::Strict
    }
}

impl Default for ConsistencyMode {
    fn default() -> Self {
        Self::FirstMissing
    }
}

impl Default for LatestFinishRule {
    fn default() -> Self {
        Self::SuccessorEarliest
    }
}

/// Configuration for one network build.
#[pyclass]
#[derive(Clone, Debug, Default)]
pub struct NetworkConfig {
    /// Verbosity level: 0=silent, 1=stages, 2=checks, 3=debug.
    #[pyo3(get, set)]
    pub verbosity: u8,
    #[pyo3(get, set)]
    pub record_policy: RecordPolicy,
    #[pyo3(get, set)]
    pub consistency_mode: ConsistencyMode,
    #[pyo3(get, set)]
    pub latest_finish_rule: LatestFinishRule,
    /// Colour critical real activities red in the DOT output.
    #[pyo3(get, set)]
    pub highlight_critical: bool,
}

#[pymethods]
impl NetworkConfig {
    #[new]
    #[pyo3(signature = (
        verbosity=None,
        record_policy=None,
        consistency_mode=None,
        latest_finish_rule=None,
        highlight_critical=None
    ))]
    fn new(
        verbosity: Option<u8>,
        record_policy: Option<RecordPolicy>,
        consistency_mode: Option<ConsistencyMode>,
        latest_finish_rule: Option<LatestFinishRule>,
        highlight_critical: Option<bool>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            verbosity: verbosity.unwrap_or(defaults.verbosity),
            record_policy: record_policy.unwrap_or(defaults.record_policy),
            consistency_mode: consistency_mode.unwrap_or(defaults.consistency_mode),
            latest_finish_rule: latest_finish_rule.unwrap_or(defaults.latest_finish_rule),
            highlight_critical: highlight_critical.unwrap_or(defaults.highlight_critical),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "NetworkConfig(verbosity={}, record_policy={:?}, consistency_mode={:?}, latest_finish_rule={:?})",
            self.verbosity, self.record_policy, self.consistency_mode, self.latest_finish_rule
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.verbosity, 0);
        assert_eq!(config.record_policy, RecordPolicy::Strict);
        assert_eq!(config.consistency_mode, ConsistencyMode::FirstMissing);
        assert_eq!(config.latest_finish_rule, LatestFinishRule::SuccessorEarliest);
        assert!(!config.highlight_critical);
    }

    #[test]
    fn test_new_keeps_defaults_for_missing_arguments() {
        let config = NetworkConfig::new(Some(2), None, Some(ConsistencyMode::Complete), None, None);
        assert_eq!(config.verbosity, 2);
        assert_eq!(config.record_policy, RecordPolicy::Strict);
        assert_eq!(config.consistency_mode, ConsistencyMode::Complete);
    }
}
