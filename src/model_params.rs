//! Parameter store shared by every recalibration model.
//!
//! A model keeps its calibration parameters (`amplitude_0`, `phase_3`, ...) in a
//! [`RecalibParams`] and re-binds them before each evaluation from the sampler's
//! full parameter vector. Only keys that start with the configured prefix are
//! taken; the prefix is stripped before storing.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use log::debug;

use crate::error::RecalibError;

/// Prefix that marks calibration parameters inside a sampler's parameter vector.
pub const DEFAULT_PREFIX: &str = "recalib_";

/// How a prefixed update is folded into the stored parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UpdatePolicy {
    /// Overwrite the supplied keys and keep every other key from earlier calls.
    ///
    /// An update that omits a parameter silently reuses its previous value.
    #[default]
    Accumulate,
    /// Reject updates that do not supply every required key; a complete update
    /// replaces the stored mapping wholesale.
    Strict,
}

/// Calibration parameters currently bound to a model.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecalibParams {
    values: BTreeMap<String, f64>,
    policy: UpdatePolicy,
}

impl RecalibParams {
    pub fn new(policy: UpdatePolicy) -> Self {
        Self {
            values: BTreeMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> UpdatePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: UpdatePolicy) {
        self.policy = policy;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Looks up one parameter, failing with [`RecalibError::MissingParameter`].
    pub fn get(&self, key: &str) -> Result<f64> {
        self.values
            .get(key)
            .copied()
            .ok_or_else(|| RecalibError::MissingParameter(key.to_string()).into())
    }

    /// Collects `keys` in order.
    pub fn collect(&self, keys: &[String]) -> Result<Vec<f64>> {
        keys.iter().map(|k| self.get(k)).collect()
    }

    /// Folds the `prefix`-matching entries of `all_params` into the store.
    ///
    /// `required` is only consulted under [`UpdatePolicy::Strict`]. Returns the
    /// number of calibration parameters taken from `all_params`.
    pub fn update_from_prefixed(
        &mut self,
        prefix: &str,
        all_params: &HashMap<String, f64>,
        required: &[String],
    ) -> Result<usize> {
        let update: BTreeMap<String, f64> = all_params
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(prefix)
                    .map(|stripped| (stripped.to_string(), *value))
            })
            .collect();
        let taken = update.len();

        match self.policy {
            UpdatePolicy::Accumulate => self.values.extend(update),
            UpdatePolicy::Strict => {
                let missing: Vec<String> = required
                    .iter()
                    .filter(|key| !update.contains_key(*key))
                    .cloned()
                    .collect();
                if !missing.is_empty() {
                    return Err(RecalibError::IncompleteUpdate { missing }.into());
                }
                self.values = update;
            }
        }

        debug!(
            "bound {} calibration parameters with prefix '{}' ({} stored)",
            taken,
            prefix,
            self.values.len()
        );
        Ok(taken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_prefix_is_stripped_by_its_length() {
        let mut params = RecalibParams::default();
        let taken = params
            .update_from_prefixed("cal_", &sample(&[("cal_amplitude_0", 0.2)]), &[])
            .unwrap();
        assert_eq!(taken, 1);
        assert_eq!(params.get("amplitude_0").unwrap(), 0.2);
    }

    #[test]
    fn test_missing_key_is_a_lookup_failure() {
        let params = RecalibParams::default();
        let err = params.get("phase_3").unwrap_err();
        assert_eq!(
            err.downcast_ref::<RecalibError>(),
            Some(&RecalibError::MissingParameter("phase_3".into()))
        );
    }

    #[test]
    fn test_strict_replaces_stored_values() {
        let mut params = RecalibParams::new(UpdatePolicy::Strict);
        params.insert("stale", 1.0);
        let required = vec!["amplitude_0".to_string()];
        params
            .update_from_prefixed(
                DEFAULT_PREFIX,
                &sample(&[("recalib_amplitude_0", 0.5)]),
                &required,
            )
            .unwrap();
        assert!(!params.contains("stale"));
        assert_eq!(params.len(), 1);
    }
}
