//! JSON lines observation source.

use std::fs::File;
use std::io::{BufRead, BufReader};

use crate::bins::Observation;
use crate::error::BinningError;
use crate::pipeline::{ObservationSource, Observations};

/// Reads observations from files holding one JSON object per line.
///
/// Each partition is a file path. Blank lines are ignored. Lines have the form
/// `{"time": 58849.5, "lat": 54.2, "lon": 7.9, "values": [0.31, 1.0]}`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonLinesSource;

impl ObservationSource for JsonLinesSource {
    fn open(&self, partition: &str) -> Result<Observations<'_>, BinningError> {
        let file = File::open(partition).map_err(|source| BinningError::PartitionIo {
            partition: partition.to_string(),
            source,
        })?;
        let partition = partition.to_string();
        let lines = BufReader::new(file).lines().enumerate();
        Ok(Box::new(lines.filter_map(move |(number, line)| {
            let line = match line {
                Ok(line) => line,
                Err(source) => {
                    return Some(Err(BinningError::PartitionIo {
                        partition: partition.clone(),
                        source,
                    }))
                }
            };
            if line.trim().is_empty() {
                return None;
            }
            Some(
                serde_json::from_str::<Observation>(&line).map_err(|source| {
                    BinningError::ObservationParse {
                        partition: partition.clone(),
                        line: number + 1,
                        source,
                    }
                }),
            )
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use uuid::Uuid;

    fn write_partition(content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("binning-source-{}.jsonl", Uuid::new_v4()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn read_observations() {
        let path = write_partition(
            "{\"time\": 1.5, \"lat\": 54.0, \"lon\": 7.5, \"values\": [0.25, 1.0]}\n\
             \n\
             {\"time\": 2.0, \"lat\": -10.0, \"lon\": 170.0, \"values\": [3.0]}\n",
        );
        let observations: Vec<Observation> = JsonLinesSource
            .open(path.to_str().unwrap())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(
            vec![
                Observation::new(1.5, 54.0, 7.5, vec![0.25, 1.0]),
                Observation::new(2.0, -10.0, 170.0, vec![3.0]),
            ],
            observations
        );
    }

    #[test]
    fn invalid_line() {
        let path = write_partition(
            "{\"time\": 1.5, \"lat\": 54.0, \"lon\": 7.5, \"values\": [0.25]}\n{\"time\": 1.5}\n",
        );
        let results: Vec<Result<Observation, BinningError>> = JsonLinesSource
            .open(path.to_str().unwrap())
            .unwrap()
            .collect();
        std::fs::remove_file(&path).unwrap();
        assert!(results[0].is_ok());
        match &results[1] {
            Err(BinningError::ObservationParse { line, .. }) => assert_eq!(2, *line),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn missing_partition() {
        let error = JsonLinesSource
            .open("/nonexistent/binning/partition.jsonl")
            .err()
            .unwrap();
        assert!(matches!(error, BinningError::PartitionIo { .. }));
        assert_eq!(
            "failed to read partition /nonexistent/binning/partition.jsonl",
            error.to_string()
        );
    }
}
