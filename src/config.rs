//! Serde-backed configuration for the counting pipeline.

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::integration::{CountingLine, DetectionFilter};
use crate::tracker::TrackerConfig;

/// Tracker, detection filter and counting line settings.
///
/// Every section and field is optional in serialized form and falls back to
/// the vehicle-counting defaults.
///
/// ```
/// use sort_counter::CounterConfig;
///
/// let config = CounterConfig::from_json_str(r#"{ "tracker": { "max_age": 30 } }"#).unwrap();
/// assert_eq!(config.tracker.max_age, 30);
/// assert_eq!(config.tracker.min_hits, 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    pub tracker: TrackerConfig,
    pub filter: DetectionFilter,
    pub line: CountingLine,
}

impl CounterConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, TrackerError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, TrackerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        self.tracker.validate()?;
        self.filter.validate()?;
        self.line.validate()
    }
}
