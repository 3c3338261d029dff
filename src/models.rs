//! Job configuration data types and their validation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::{Date, Month};
use validator::{Validate, ValidationError};

use crate::grid::DEFAULT_NUM_ROWS;
use crate::types::{ByteOrder, Missing};

/// A named sample slot of an observation
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VariableConfig {
    /// Variable name, referenced by aggregators
    pub name: String,
    /// Optional description of masked samples
    pub missing: Option<Missing>,
}

/// Aggregator configuration
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AggregatorConfig {
    /// Aggregator type, e.g. `AVG`. Matched case-insensitively.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Name of the variable the aggregator consumes
    pub input_variable: String,
    /// Type specific parameters
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

/// A named output region
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegionConfig {
    pub name: String,
    /// Region geometry as WKT `POLYGON` or `MULTIPOLYGON` text
    pub wkt: String,
}

/// Time range covered by a job, as ISO 8601 calendar dates (`YYYY-MM-DD`).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

/// Binning job configuration
#[derive(Clone, Debug, Deserialize, PartialEq, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_job_config"))]
pub struct JobConfig {
    /// Number of grid rows
    #[serde(default = "default_num_rows")]
    pub num_rows: usize,
    /// Number of temporal reduce partitions
    #[serde(default = "default_partitions")]
    #[validate(range(min = 1, message = "num_reducers must be greater than 0"))]
    pub num_reducers: usize,
    /// Number of region reduce partitions
    #[serde(default = "default_partitions")]
    #[validate(range(min = 1, message = "num_region_partitions must be greater than 0"))]
    pub num_region_partitions: usize,
    /// Byte order of spilled and shuffled bins
    #[serde(default)]
    pub byte_order: ByteOrder,
    /// Observation sample slots, in order
    #[validate(length(min = 1, message = "variables must not be empty"))]
    pub variables: Vec<VariableConfig>,
    /// Aggregators, in output order
    #[validate(length(min = 1, message = "aggregators must not be empty"))]
    pub aggregators: Vec<AggregatorConfig>,
    /// Output regions, in order
    pub regions: Vec<RegionConfig>,
    /// Time range copied into the output metadata
    pub time_range: Option<TimeRange>,
}

fn default_num_rows() -> usize {
    DEFAULT_NUM_ROWS
}

fn default_partitions() -> usize {
    1
}

/// Validate a grid row count
fn validate_num_rows(num_rows: usize) -> Result<(), ValidationError> {
    if num_rows == 0 {
        return Err(ValidationError::new("num_rows must be greater than 0"));
    }
    if num_rows % 2 != 0 {
        let mut error = ValidationError::new("num_rows must be even");
        error.add_param("num_rows".into(), &num_rows);
        return Err(error);
    }
    Ok(())
}

/// Parse an ISO 8601 calendar date of the form `YYYY-MM-DD`.
pub fn parse_date(text: &str) -> Option<Date> {
    let mut parts = text.trim().splitn(3, '-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month = parts.next()?.parse::<u8>().ok()?;
    let day = parts.next()?.parse::<u8>().ok()?;
    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}

/// Validate a time range
fn validate_time_range(time_range: &TimeRange) -> Result<(), ValidationError> {
    let (Some(start), Some(end)) = (parse_date(&time_range.start), parse_date(&time_range.end))
    else {
        return Err(ValidationError::new(
            "time_range dates must be of the form YYYY-MM-DD",
        ));
    };
    if start > end {
        let mut error = ValidationError::new("time_range start must not be after end");
        error.add_param("start".into(), &time_range.start);
        error.add_param("end".into(), &time_range.end);
        return Err(error);
    }
    Ok(())
}

/// Validate fields of a job configuration that depend on each other
fn validate_job_config(config: &JobConfig) -> Result<(), ValidationError> {
    validate_num_rows(config.num_rows)?;
    for variable in &config.variables {
        if let Some(missing) = &variable.missing {
            missing.validate()?;
        }
    }
    for (index, variable) in config.variables.iter().enumerate() {
        if config.variables[..index]
            .iter()
            .any(|other| other.name == variable.name)
        {
            let mut error = ValidationError::new("variable names must be unique");
            error.add_param("name".into(), &variable.name);
            return Err(error);
        }
    }
    for (index, region) in config.regions.iter().enumerate() {
        if config.regions[..index]
            .iter()
            .any(|other| other.name == region.name)
        {
            let mut error = ValidationError::new("region names must be unique");
            error.add_param("name".into(), &region.name);
            return Err(error);
        }
    }
    if let Some(time_range) = &config.time_range {
        validate_time_range(time_range)?;
    }
    Ok(())
}

impl JobConfig {
    /// Deserialise and validate a job configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, crate::error::BinningError> {
        let config: JobConfig =
            serde_json::from_str(text).map_err(crate::error::BinningError::ConfigParse)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use serde_test::{assert_de_tokens, assert_de_tokens_error, Token};

    #[test]
    fn test_required_fields() {
        let config = test_utils::get_test_job_config();
        assert_de_tokens(
            &config,
            &[
                Token::Struct {
                    name: "JobConfig",
                    len: 3,
                },
                Token::Str("variables"),
                Token::Seq { len: Some(1) },
                Token::Struct {
                    name: "VariableConfig",
                    len: 1,
                },
                Token::Str("name"),
                Token::Str("chl"),
                Token::StructEnd,
                Token::SeqEnd,
                Token::Str("aggregators"),
                Token::Seq { len: Some(1) },
                Token::Struct {
                    name: "AggregatorConfig",
                    len: 2,
                },
                Token::Str("type"),
                Token::Str("AVG"),
                Token::Str("input_variable"),
                Token::Str("chl"),
                Token::StructEnd,
                Token::SeqEnd,
                Token::Str("regions"),
                Token::Seq { len: Some(1) },
                Token::Struct {
                    name: "RegionConfig",
                    len: 2,
                },
                Token::Str("name"),
                Token::Str("north_sea"),
                Token::Str("wkt"),
                Token::Str("POLYGON((0 50,10 50,10 60,0 60,0 50))"),
                Token::StructEnd,
                Token::SeqEnd,
                Token::StructEnd,
            ],
        );
        config.validate().unwrap();
        assert_eq!(2160, config.num_rows);
        assert_eq!(1, config.num_reducers);
        assert_eq!(ByteOrder::default(), config.byte_order);
    }

    #[test]
    fn test_optional_fields() {
        let config = test_utils::get_test_job_config_optional();
        assert_de_tokens(
            &config,
            &[
                Token::Struct {
                    name: "JobConfig",
                    len: 8,
                },
                Token::Str("num_rows"),
                Token::U64(180),
                Token::Str("num_reducers"),
                Token::U64(4),
                Token::Str("num_region_partitions"),
                Token::U64(2),
                Token::Str("byte_order"),
                Token::Enum { name: "ByteOrder" },
                Token::Str("big"),
                Token::Unit,
                Token::Str("variables"),
                Token::Seq { len: Some(2) },
                Token::Struct {
                    name: "VariableConfig",
                    len: 2,
                },
                Token::Str("name"),
                Token::Str("doy"),
                Token::StructEnd,
                Token::Struct {
                    name: "VariableConfig",
                    len: 2,
                },
                Token::Str("name"),
                Token::Str("cl"),
                Token::Str("missing"),
                Token::Some,
                Token::Enum { name: "Missing" },
                Token::Str("valid_min"),
                Token::F32(0.0),
                Token::StructEnd,
                Token::SeqEnd,
                Token::Str("aggregators"),
                Token::Seq { len: Some(1) },
                Token::Struct {
                    name: "AggregatorConfig",
                    len: 3,
                },
                Token::Str("type"),
                Token::Str("JD"),
                Token::Str("input_variable"),
                Token::Str("doy"),
                Token::Str("parameters"),
                Token::Map { len: Some(1) },
                Token::Str("confidence_variable"),
                Token::Str("cl"),
                Token::MapEnd,
                Token::StructEnd,
                Token::SeqEnd,
                Token::Str("regions"),
                Token::Seq { len: Some(2) },
                Token::Struct {
                    name: "RegionConfig",
                    len: 2,
                },
                Token::Str("name"),
                Token::Str("north_sea"),
                Token::Str("wkt"),
                Token::Str("POLYGON((0 50,10 50,10 60,0 60,0 50))"),
                Token::StructEnd,
                Token::Struct {
                    name: "RegionConfig",
                    len: 2,
                },
                Token::Str("name"),
                Token::Str("baltic"),
                Token::Str("wkt"),
                Token::Str("POLYGON((10 53,30 53,30 66,10 66,10 53))"),
                Token::StructEnd,
                Token::SeqEnd,
                Token::Str("time_range"),
                Token::Some,
                Token::Struct {
                    name: "TimeRange",
                    len: 2,
                },
                Token::Str("start"),
                Token::Str("2020-02-01"),
                Token::Str("end"),
                Token::Str("2020-02-29"),
                Token::StructEnd,
                Token::StructEnd,
            ],
        );
        config.validate().unwrap()
    }

    #[test]
    fn test_missing_variables() {
        assert_de_tokens_error::<JobConfig>(
            &[
                Token::Struct {
                    name: "JobConfig",
                    len: 2,
                },
                Token::StructEnd,
            ],
            "missing field `variables`",
        )
    }

    #[test]
    fn test_unknown_field() {
        assert_de_tokens_error::<JobConfig>(
            &[
                Token::Struct {
                    name: "JobConfig",
                    len: 2,
                },
                Token::Str("rows"),
            ],
            "unknown field `rows`, expected one of `num_rows`, `num_reducers`, \
             `num_region_partitions`, `byte_order`, `variables`, `aggregators`, `regions`, \
             `time_range`",
        )
    }

    #[test]
    fn test_serialize_variable() {
        let variable = VariableConfig {
            name: "cl".to_string(),
            missing: Some(Missing::ValidMin(0.0)),
        };
        assert_eq!(
            r#"{"name":"cl","missing":{"valid_min":0.0}}"#,
            serde_json::to_string(&variable).unwrap()
        );
    }

    #[test]
    fn test_invalid_byte_order() {
        assert_de_tokens_error::<JobConfig>(
            &[
                Token::Struct {
                    name: "JobConfig",
                    len: 2,
                },
                Token::Str("byte_order"),
                Token::Enum { name: "ByteOrder" },
                Token::Str("middle"),
                Token::StructEnd,
            ],
            "unknown variant `middle`, expected `big` or `little`",
        )
    }

    #[test]
    #[should_panic(expected = "num_rows must be even")]
    fn test_odd_num_rows() {
        let mut config = test_utils::get_test_job_config();
        config.num_rows = 2161;
        config.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "num_rows must be greater than 0")]
    fn test_zero_num_rows() {
        let mut config = test_utils::get_test_job_config();
        config.num_rows = 0;
        config.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "num_reducers must be greater than 0")]
    fn test_zero_reducers() {
        let mut config = test_utils::get_test_job_config();
        config.num_reducers = 0;
        config.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "num_region_partitions must be greater than 0")]
    fn test_zero_region_partitions() {
        let mut config = test_utils::get_test_job_config();
        config.num_region_partitions = 0;
        config.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "variables must not be empty")]
    fn test_empty_variables() {
        let mut config = test_utils::get_test_job_config();
        config.variables = vec![];
        config.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "aggregators must not be empty")]
    fn test_empty_aggregators() {
        let mut config = test_utils::get_test_job_config();
        config.aggregators = vec![];
        config.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "variable names must be unique")]
    fn test_duplicate_variable() {
        let mut config = test_utils::get_test_job_config();
        config.variables.push(config.variables[0].clone());
        config.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "region names must be unique")]
    fn test_duplicate_region() {
        let mut config = test_utils::get_test_job_config();
        config.regions.push(config.regions[0].clone());
        config.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "Missing data valid range min must be less than max")]
    fn test_invalid_missing() {
        let mut config = test_utils::get_test_job_config();
        config.variables[0].missing = Some(Missing::ValidRange(1.0, 0.0));
        config.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "time_range start must not be after end")]
    fn test_time_range_reversed() {
        let mut config = test_utils::get_test_job_config();
        config.time_range = Some(TimeRange {
            start: "2020-03-01".to_string(),
            end: "2020-02-01".to_string(),
        });
        config.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "time_range dates must be of the form YYYY-MM-DD")]
    fn test_time_range_invalid_date() {
        let mut config = test_utils::get_test_job_config();
        config.time_range = Some(TimeRange {
            start: "2020-02-30".to_string(),
            end: "2020-03-01".to_string(),
        });
        config.validate().unwrap()
    }

    #[test]
    fn test_empty_regions_pass_validation() {
        // Rejected when the job is built, with a dedicated error.
        let mut config = test_utils::get_test_job_config();
        config.regions = vec![];
        config.validate().unwrap()
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            Date::from_calendar_date(2020, Month::February, 29).ok(),
            parse_date("2020-02-29")
        );
        assert_eq!(None, parse_date("2021-02-29"));
        assert_eq!(None, parse_date("2021-02"));
        assert_eq!(None, parse_date("20x1-01-01"));
    }

    #[test]
    fn test_json() {
        let config = JobConfig::from_json(
            r#"{
                "num_rows": 6,
                "byte_order": "little",
                "variables": [{"name": "chl", "missing": {"missing_value": -999}}],
                "aggregators": [
                    {"type": "avg", "input_variable": "chl", "parameters": {"weight_coeff": "0.5"}}
                ],
                "regions": [{"name": "all", "wkt": "POLYGON((-180 -90,180 -90,180 90,-180 90,-180 -90))"}]
            }"#,
        )
        .unwrap();
        assert_eq!(6, config.num_rows);
        assert_eq!(ByteOrder::Little, config.byte_order);
        assert_eq!(Some(Missing::MissingValue(-999.0)), config.variables[0].missing);
        assert_eq!("avg", config.aggregators[0].type_name);
        assert_eq!(
            Some(&"0.5".to_string()),
            config.aggregators[0].parameters.get("weight_coeff")
        );
        assert_eq!(None, config.time_range);
    }

    #[test]
    fn test_json_malformed() {
        let error = JobConfig::from_json(r#"{"num_rows": 6, "variables": ["#).unwrap_err();
        assert!(matches!(error, crate::error::BinningError::ConfigParse(_)));
        assert!(error.is_configuration_error());
    }

    #[test]
    #[should_panic(expected = "ConfigValidation")]
    fn test_json_invalid() {
        JobConfig::from_json(
            r#"{"num_rows": 7, "variables": [{"name": "chl"}],
                "aggregators": [{"type": "AVG", "input_variable": "chl"}], "regions": []}"#,
        )
        .unwrap();
    }
}
