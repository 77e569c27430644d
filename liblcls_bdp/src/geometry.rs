use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::GeometryError;

/// One override entry: an inclusive run range and the value it selects.
///
/// Entries whose `runs` list does not hold exactly [first, last] are
/// skipped, matching the tolerance of the batch tooling this format
/// comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeValue {
    #[serde(default)]
    pub runs: Vec<i64>,
    pub value: f64,
}

/// Run-range geometry overrides loaded from a YAML document.
///
/// ```yml
/// detector_distance_m:
///   - runs: [100, 250]
///     value: 4.05
/// probe_energy_ev:
///   - runs: [100, 399]
///     value: 8800.0
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeometryConfig {
    #[serde(default)]
    pub detector_distance_m: Vec<RangeValue>,
    #[serde(default)]
    pub probe_energy_ev: Vec<RangeValue>,
}

impl GeometryConfig {
    /// Read the geometry overrides from a YAML file
    pub fn read_config_file(config_path: &Path) -> Result<Self, GeometryError> {
        if !config_path.exists() {
            return Err(GeometryError::BadFilePath(config_path.to_path_buf()));
        }
        let yaml_str = std::fs::read_to_string(config_path)?;
        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    pub fn detector_distance_for_run(&self, run: i64) -> Option<f64> {
        value_for_run(&self.detector_distance_m, run)
    }

    pub fn probe_energy_for_run(&self, run: i64) -> Option<f64> {
        value_for_run(&self.probe_energy_ev, run)
    }
}

/// First range containing the run wins
fn value_for_run(ranges: &[RangeValue], run: i64) -> Option<f64> {
    for entry in ranges {
        if entry.runs.len() != 2 {
            continue;
        }
        let (start, end) = (entry.runs[0], entry.runs[1]);
        if start <= run && run <= end {
            return Some(entry.value);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "
detector_distance_m:
  - runs: [100, 250]
    value: 4.05
  - runs: [251, 400]
    value: 3.2
probe_energy_ev:
  - runs: [300]
    value: 9999.0
  - runs: [100, 400]
    value: 8800.0
";

    #[test]
    fn test_value_for_run_selection() {
        let config: GeometryConfig = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.detector_distance_for_run(100), Some(4.05));
        assert_eq!(config.detector_distance_for_run(250), Some(4.05));
        assert_eq!(config.detector_distance_for_run(251), Some(3.2));
        assert_eq!(config.detector_distance_for_run(401), None);
    }

    #[test]
    fn test_malformed_range_skipped() {
        let config: GeometryConfig = serde_yaml::from_str(SAMPLE).unwrap();
        // the single-element range is ignored, the next match wins
        assert_eq!(config.probe_energy_for_run(300), Some(8800.0));
    }

    #[test]
    fn test_empty_document() {
        let config: GeometryConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.detector_distance_for_run(1), None);
        assert_eq!(config.probe_energy_for_run(1), None);
    }
}
