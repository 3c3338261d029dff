//! Aggregator implementations and the registry that builds them from configuration.
//!
//! Each aggregator is implemented as a struct that implements the
//! [Aggregator](crate::aggregator::Aggregator) trait.

pub mod average;
pub mod average_ml;
pub mod burned_day;
pub mod land_cover;
pub mod min_max;
pub mod sum;

use crate::aggregator::{Aggregator, Parameters, VariableContext};
use crate::error::BinningError;
use crate::models::AggregatorConfig;

/// Names accepted in the `type` field of an aggregator configuration.
pub const AGGREGATOR_TYPES: [&str; 6] = [
    average::Average::NAME,
    average_ml::AverageMl::NAME,
    min_max::MinMax::NAME,
    sum::Sum::NAME,
    burned_day::BurnedDay::NAME,
    land_cover::LandCover::NAME,
];

/// Build an aggregator from its configuration.
///
/// Type names are matched case-insensitively.
///
/// # Arguments
///
/// * `index`: Position of the aggregator in the job configuration, for error reporting
/// * `config`: Aggregator configuration
/// * `variables`: Variables available in observations
pub fn create_aggregator(
    index: usize,
    config: &AggregatorConfig,
    variables: &VariableContext,
) -> Result<Box<dyn Aggregator>, BinningError> {
    let type_name = config.type_name.trim().to_ascii_uppercase();
    let params = Parameters::new(&type_name, &config.parameters);
    let variable = config.input_variable.as_str();
    let resolve = |name: &str| {
        variables
            .index_of(name)
            .ok_or_else(|| BinningError::UnknownVariable {
                type_name: type_name.clone(),
                variable: name.to_string(),
            })
    };
    let aggregator: Box<dyn Aggregator> = match type_name.as_str() {
        average::Average::NAME => Box::new(average::Average::from_parameters(
            variable,
            resolve(variable)?,
            &params,
        )?),
        average_ml::AverageMl::NAME => Box::new(average_ml::AverageMl::from_parameters(
            variable,
            resolve(variable)?,
            &params,
        )?),
        min_max::MinMax::NAME => Box::new(min_max::MinMax::from_parameters(
            variable,
            resolve(variable)?,
            &params,
        )?),
        sum::Sum::NAME => Box::new(sum::Sum::from_parameters(
            variable,
            resolve(variable)?,
            &params,
        )?),
        burned_day::BurnedDay::NAME => {
            let confidence_index = match params.get::<String>("confidence_variable")? {
                Some(name) => Some(resolve(&name)?),
                None => None,
            };
            Box::new(burned_day::BurnedDay::from_parameters(
                variable,
                resolve(variable)?,
                confidence_index,
                &params,
            )?)
        }
        land_cover::LandCover::NAME => Box::new(land_cover::LandCover::from_parameters(
            variable,
            resolve(variable)?,
            &params,
        )?),
        _ => {
            return Err(BinningError::UnknownAggregator {
                index,
                type_name: config.type_name.clone(),
            })
        }
    };
    Ok(aggregator)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_utils;

    fn variables() -> VariableContext {
        let mut variables = VariableContext::new();
        variables.add("chl", None);
        variables.add("doy", None);
        variables.add("cl", None);
        variables
    }

    #[test]
    fn create_each_type() {
        let configs = [
            test_utils::aggregator_config("AVG", "chl", &[("weight_coeff", "1")]),
            test_utils::aggregator_config("avg_ml", "chl", &[]),
            test_utils::aggregator_config("Min_Max", "chl", &[]),
            test_utils::aggregator_config("SUM", "chl", &[]),
            test_utils::aggregator_config("JD", "doy", &[("confidence_variable", "cl")]),
            test_utils::aggregator_config("LC_CLASS", "chl", &[("num_classes", "4")]),
        ];
        let names: Vec<String> = configs
            .iter()
            .enumerate()
            .map(|(index, config)| {
                create_aggregator(index, config, &variables())
                    .unwrap()
                    .name()
                    .to_string()
            })
            .collect();
        assert_eq!(AGGREGATOR_TYPES.to_vec(), names);
    }

    #[test]
    fn burned_day_month_window() {
        let config = test_utils::aggregator_config(
            "JD",
            "doy",
            &[("year", "2020"), ("month", "2"), ("confidence_variable", "cl")],
        );
        let agg = create_aggregator(0, &config, &variables()).unwrap();
        let mut svec = [0.0f32; 2];
        agg.init_spatial(&mut svec);
        // Day 20 is in January, outside the window.
        agg.aggregate_spatial(&[0.0, 20.0, 0.9], &mut svec);
        assert_eq!([0.0f32, 0.0], svec);
        agg.aggregate_spatial(&[0.0, 45.0, 0.9], &mut svec);
        assert_eq!([45.0f32, 0.9], svec);
    }

    #[test]
    #[should_panic(expected = "UnknownAggregator")]
    fn unknown_type() {
        let config = test_utils::aggregator_config("MEDIAN", "chl", &[]);
        create_aggregator(3, &config, &variables()).unwrap();
    }

    #[test]
    #[should_panic(expected = "UnknownVariable")]
    fn unknown_variable() {
        let config = test_utils::aggregator_config("AVG", "sst", &[]);
        create_aggregator(0, &config, &variables()).unwrap();
    }

    #[test]
    #[should_panic(expected = "UnknownVariable")]
    fn unknown_confidence_variable() {
        let config =
            test_utils::aggregator_config("JD", "doy", &[("confidence_variable", "conf")]);
        create_aggregator(0, &config, &variables()).unwrap();
    }

    #[test]
    #[should_panic(expected = "required with year")]
    fn burned_day_year_without_month() {
        let config = test_utils::aggregator_config("JD", "doy", &[("year", "2020")]);
        create_aggregator(0, &config, &variables()).unwrap();
    }

    #[test]
    #[should_panic(expected = "required with month")]
    fn burned_day_month_without_year() {
        let config = test_utils::aggregator_config("JD", "doy", &[("month", "2")]);
        create_aggregator(0, &config, &variables()).unwrap();
    }

    #[test]
    #[should_panic(expected = "failed to parse value")]
    fn invalid_parameter() {
        let config = test_utils::aggregator_config("AVG", "chl", &[("weight_coeff", "x")]);
        create_aggregator(0, &config, &variables()).unwrap();
    }
}
