use std::collections::HashMap;

use crate::aggregator::{Aggregator, VariableContext};
use crate::aggregators::average::Average;
use crate::bin_manager::BinManager;
use crate::models::*;
use crate::types::{ByteOrder, Missing};

/// Create a JobConfig object with only required fields set.
pub(crate) fn get_test_job_config() -> JobConfig {
    JobConfig {
        num_rows: 2160,
        num_reducers: 1,
        num_region_partitions: 1,
        byte_order: ByteOrder::default(),
        variables: vec![VariableConfig {
            name: "chl".to_string(),
            missing: None,
        }],
        aggregators: vec![aggregator_config("AVG", "chl", &[])],
        regions: vec![RegionConfig {
            name: "north_sea".to_string(),
            wkt: "POLYGON((0 50,10 50,10 60,0 60,0 50))".to_string(),
        }],
        time_range: None,
    }
}

/// Create a JobConfig object with all fields set.
pub(crate) fn get_test_job_config_optional() -> JobConfig {
    JobConfig {
        num_rows: 180,
        num_reducers: 4,
        num_region_partitions: 2,
        byte_order: ByteOrder::Big,
        variables: vec![
            VariableConfig {
                name: "doy".to_string(),
                missing: None,
            },
            VariableConfig {
                name: "cl".to_string(),
                missing: Some(Missing::ValidMin(0.0)),
            },
        ],
        aggregators: vec![aggregator_config(
            "JD",
            "doy",
            &[("confidence_variable", "cl")],
        )],
        regions: vec![
            RegionConfig {
                name: "north_sea".to_string(),
                wkt: "POLYGON((0 50,10 50,10 60,0 60,0 50))".to_string(),
            },
            RegionConfig {
                name: "baltic".to_string(),
                wkt: "POLYGON((10 53,30 53,30 66,10 66,10 53))".to_string(),
            },
        ],
        time_range: Some(TimeRange {
            start: "2020-02-01".to_string(),
            end: "2020-02-29".to_string(),
        }),
    }
}

/// Create an AggregatorConfig object.
pub(crate) fn aggregator_config(
    type_name: &str,
    input_variable: &str,
    parameters: &[(&str, &str)],
) -> AggregatorConfig {
    AggregatorConfig {
        type_name: type_name.to_string(),
        input_variable: input_variable.to_string(),
        parameters: parameters
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<String, String>>(),
    }
}

/// Create a VariableContext with unmasked variables.
pub(crate) fn variables(names: &[&str]) -> VariableContext {
    let mut variables = VariableContext::new();
    for name in names {
        variables.add(name, None);
    }
    variables
}

/// Create a BinManager with a single average aggregator over variable index 0.
pub(crate) fn average_manager(variable: &str, weight_coeff: f64) -> BinManager {
    let aggregators: Vec<Box<dyn Aggregator>> =
        vec![Box::new(Average::new(variable, 0, weight_coeff))];
    BinManager::new(aggregators)
}

/// Assert that two floats are equal within a relative tolerance.
pub(crate) fn assert_close(expected: f32, actual: f32) {
    let tolerance = 1e-5 * expected.abs().max(1.0);
    assert!(
        (expected - actual).abs() <= tolerance,
        "expected {} but got {}",
        expected,
        actual
    );
}
