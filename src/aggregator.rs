//! Aggregator abstraction.
//!
//! An aggregator defines how observation samples are folded into a fixed length feature vector
//! in two phases. In the spatial phase raw samples for one grid cell within one partition are
//! accumulated. In the temporal phase the completed spatial vectors for one grid cell from every
//! partition are accumulated. Finally the temporal vector is projected to an output vector.
//!
//! Vectors are always allocated by the caller, so that the hot loop in the spatial binner does
//! not allocate.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::BinningError;
use crate::types::missing::{is_masked, Missing};

/// Trait for aggregators.
///
/// This forms the contract between the binners and the aggregation strategies. Implementations
/// hold only immutable configuration, so a single instance may be shared between threads.
pub trait Aggregator: std::fmt::Debug + Send + Sync {
    /// Registry name of the aggregator, e.g. `AVG`.
    fn name(&self) -> &str;

    /// Names of the spatial features.
    fn spatial_feature_names(&self) -> &[String];

    /// Names of the temporal features.
    fn temporal_feature_names(&self) -> &[String];

    /// Names of the output features.
    fn output_feature_names(&self) -> &[String];

    /// Value used for output features of bins without valid data.
    fn output_fill_value(&self) -> f32 {
        f32::NAN
    }

    /// Whether the aggregator can fold an observation's samples.
    ///
    /// Observations refused by any aggregator are skipped by the spatial binner and do not
    /// count towards a bin's observations.
    fn accepts(&self, _values: &[f32]) -> bool {
        true
    }

    /// Set a spatial vector to its neutral state.
    fn init_spatial(&self, vector: &mut [f32]);

    /// Fold one observation into a spatial vector.
    ///
    /// # Arguments
    ///
    /// * `values`: Sample values of the observation, one per configured variable
    /// * `vector`: Spatial vector to update
    fn aggregate_spatial(&self, values: &[f32], vector: &mut [f32]);

    /// Finalise a spatial vector.
    ///
    /// # Arguments
    ///
    /// * `num_obs`: Number of observations accumulated in the bin
    /// * `vector`: Spatial vector to update
    fn complete_spatial(&self, num_obs: i32, vector: &mut [f32]);

    /// Set a temporal vector to its neutral state.
    fn init_temporal(&self, vector: &mut [f32]);

    /// Fold one completed spatial vector into a temporal vector.
    ///
    /// # Arguments
    ///
    /// * `spatial`: Completed spatial vector
    /// * `num_spatial_obs`: Number of observations in the spatial bin
    /// * `vector`: Temporal vector to update
    fn aggregate_temporal(&self, spatial: &[f32], num_spatial_obs: i32, vector: &mut [f32]);

    /// Finalise a temporal vector.
    fn complete_temporal(&self, num_temporal_obs: i32, vector: &mut [f32]);

    /// Project a completed temporal vector to the output vector.
    fn compute_output(&self, temporal: &[f32], output: &mut [f32]);
}

/// Named sample slots of an observation, with optional masking descriptors.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariableContext {
    names: Vec<String>,
    missing: Vec<Option<Missing>>,
}

impl VariableContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable. Its index is the number of variables added before it.
    pub fn add(&mut self, name: &str, missing: Option<Missing>) -> usize {
        self.names.push(name.to_string());
        self.missing.push(missing);
        self.names.len() - 1
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Returns the index of a variable by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Returns whether an observation's samples must not contribute to any bin.
    ///
    /// An observation is rejected if it has fewer samples than there are variables, or if any of
    /// its samples is non-finite or masked by the variable's descriptor.
    pub fn is_rejected(&self, values: &[f32]) -> bool {
        if values.len() < self.names.len() {
            return true;
        }
        self.missing
            .iter()
            .zip(values)
            .any(|(missing, x)| is_masked(missing.as_ref(), *x))
    }
}

/// Typed access to an aggregator's string parameters.
pub struct Parameters<'a> {
    type_name: &'a str,
    parameters: &'a HashMap<String, String>,
}

impl<'a> Parameters<'a> {
    pub fn new(type_name: &'a str, parameters: &'a HashMap<String, String>) -> Self {
        Self {
            type_name,
            parameters,
        }
    }

    /// Fail if any parameter is not in `known`.
    pub fn check_known(&self, known: &[&str]) -> Result<(), BinningError> {
        // Sorted for a deterministic error message.
        let mut names: Vec<&String> = self.parameters.keys().collect();
        names.sort();
        match names.into_iter().find(|name| !known.contains(&name.as_str())) {
            Some(name) => Err(self.error(name, "unknown parameter")),
            None => Ok(()),
        }
    }

    /// Returns a parsed optional parameter.
    pub fn get<T: FromStr>(&self, name: &str) -> Result<Option<T>, BinningError> {
        match self.parameters.get(name) {
            Some(value) => value
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| self.error(name, "failed to parse value")),
            None => Ok(None),
        }
    }

    /// Returns a parsed parameter, or a default if absent.
    pub fn get_or<T: FromStr>(&self, name: &str, default: T) -> Result<T, BinningError> {
        Ok(self.get(name)?.unwrap_or(default))
    }

    /// Returns a parsed parameter that must be present.
    pub fn require<T: FromStr>(&self, name: &str) -> Result<T, BinningError> {
        self.get(name)?
            .ok_or_else(|| self.error(name, "required parameter is missing"))
    }

    /// Returns a configuration error for a parameter.
    pub fn error(&self, name: &str, reason: &str) -> BinningError {
        BinningError::InvalidAggregatorParameter {
            type_name: self.type_name.to_string(),
            parameter: name.to_string(),
            value: self.parameters.get(name).cloned().unwrap_or_default(),
            reason: reason.to_string(),
        }
    }
}

/// Returns feature names formed from a variable name and suffixes, e.g. `chl_mean`.
pub fn feature_names(variable: &str, suffixes: &[&str]) -> Vec<String> {
    suffixes
        .iter()
        .map(|suffix| format!("{}_{}", variable, suffix))
        .collect()
}
