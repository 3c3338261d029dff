//! Masked sample descriptors
//!
//! Input variables can contain samples which must not contribute to a bin, for example fill
//! values written by the product decoder or values outside the physically valid range. There are
//! multiple ways to describe them. Currently we support:
//!
//! * A single missing value
//! * Multiple missing values
//! * A valid minimum value
//! * A valid maximum value
//! * A valid range of values
//!
//! Non-finite samples (NaN, ±infinity) are always treated as missing.

use serde::{Deserialize, Serialize};
use validator::ValidationError;

/// Missing data
///
/// This enum mirrors the descriptions of missing data used in NetCDF4 / CF conventions.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Missing {
    /// A single missing value
    MissingValue(f32),
    /// Multple missing values
    MissingValues(Vec<f32>),
    /// Valid minimum
    ValidMin(f32),
    /// Valid maxiumum
    ValidMax(f32),
    /// Valid range
    ValidRange(f32, f32),
}

impl Missing {
    /// Validate a [Missing] descriptor.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let finite = match self {
            Missing::MissingValue(value) => value.is_finite(),
            Missing::MissingValues(values) => values.iter().all(|value| value.is_finite()),
            Missing::ValidMin(min) => min.is_finite(),
            Missing::ValidMax(max) => max.is_finite(),
            Missing::ValidRange(min, max) => min.is_finite() && max.is_finite(),
        };
        if !finite {
            return Err(ValidationError::new(
                "Missing data descriptor values must be finite",
            ));
        }
        // Validate min + max for valid ranges.
        if let Missing::ValidRange(min, max) = self {
            if min >= max {
                let mut error =
                    ValidationError::new("Missing data valid range min must be less than max");
                error.add_param("min".into(), min);
                error.add_param("max".into(), max);
                return Err(error);
            };
        };
        Ok(())
    }

    /// Filter function to check whether the provided sample is a 'missing' value
    pub fn is_missing(&self, x: f32) -> bool {
        if !x.is_finite() {
            return true;
        }
        match self {
            Missing::MissingValue(value) => x == *value,
            Missing::MissingValues(values) => values.contains(&x),
            Missing::ValidMin(min) => x < *min,
            Missing::ValidMax(max) => x > *max,
            Missing::ValidRange(min, max) => x < *min || x > *max,
        }
    }
}

/// Returns whether a sample is masked, given an optional descriptor.
pub fn is_masked(missing: Option<&Missing>, x: f32) -> bool {
    match missing {
        Some(missing) => missing.is_missing(x),
        None => !x.is_finite(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_missing_value() {
        Missing::MissingValue(42.0).validate().unwrap();
    }

    #[test]
    #[should_panic(expected = "Missing data valid range min must be less than max")]
    fn test_validate_range_min_gt_max() {
        Missing::ValidRange(42.0, -42.0).validate().unwrap();
    }

    #[test]
    #[should_panic(expected = "Missing data valid range min must be less than max")]
    fn test_validate_range_min_eq_max() {
        Missing::ValidRange(42.0, 42.0).validate().unwrap();
    }

    #[test]
    #[should_panic(expected = "Missing data descriptor values must be finite")]
    fn test_validate_nan() {
        Missing::MissingValues(vec![1.0, f32::NAN]).validate().unwrap();
    }

    #[test]
    fn test_deserialise() {
        let missing: Missing = serde_json::from_str(r#"{"valid_range": [0.0, 1.5]}"#).unwrap();
        assert_eq!(Missing::ValidRange(0.0, 1.5), missing);
        let missing: Missing = serde_json::from_str(r#"{"missing_value": -999}"#).unwrap();
        assert_eq!(Missing::MissingValue(-999.0), missing);
    }

    #[test]
    fn test_is_missing_value() {
        let missing = Missing::MissingValue(1.0);
        assert!(!missing.is_missing(0.0));
        assert!(missing.is_missing(1.0));
        assert!(!missing.is_missing(2.0));
    }

    #[test]
    fn test_is_missing_values() {
        let missing = Missing::MissingValues(vec![1.0, 2.0]);
        assert!(!missing.is_missing(0.0));
        assert!(missing.is_missing(1.0));
        assert!(missing.is_missing(2.0));
        assert!(!missing.is_missing(3.0));
    }

    #[test]
    fn test_is_missing_valid_min() {
        let missing = Missing::ValidMin(1.0);
        assert!(missing.is_missing(0.0));
        assert!(!missing.is_missing(1.0));
        assert!(!missing.is_missing(2.0));
    }

    #[test]
    fn test_is_missing_valid_max() {
        let missing = Missing::ValidMax(1.0);
        assert!(!missing.is_missing(0.0));
        assert!(!missing.is_missing(1.0));
        assert!(missing.is_missing(2.0));
    }

    #[test]
    fn test_is_missing_valid_range() {
        let missing = Missing::ValidRange(1.0, 2.0);
        assert!(missing.is_missing(0.0));
        assert!(!missing.is_missing(1.0));
        assert!(!missing.is_missing(2.0));
        assert!(missing.is_missing(3.0));
    }

    #[test]
    fn test_non_finite_always_missing() {
        let missing = Missing::ValidMin(-1.0);
        assert!(missing.is_missing(f32::NAN));
        assert!(missing.is_missing(f32::INFINITY));
        assert!(is_masked(None, f32::NEG_INFINITY));
        assert!(!is_masked(None, 0.0));
    }
}
