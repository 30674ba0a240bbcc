//! Run-wide settings for the enrichment pipeline.

use geoenrich_core::{AdminIndexConfig, ConfigError, StreetIndexConfig};
use serde::{Deserialize, Serialize};

/// Tag keys that mark a named element as a point of interest by default.
pub const DEFAULT_POI_KEYS: [&str; 10] = [
    "amenity",
    "shop",
    "tourism",
    "historic",
    "leisure",
    "natural",
    "place",
    "office",
    "craft",
    "public_transport",
];

/// Settings for [`Pipeline`](crate::Pipeline).
///
/// Every field has a default, so a partial document deserialises cleanly:
///
/// ```
/// use geoenrich_data::PipelineConfig;
///
/// let config: PipelineConfig =
///     serde_json::from_str(r#"{ "street": { "max_distance_m": 250.0 } }"#).unwrap();
/// assert_eq!(config.street.max_distance_m, 250.0);
/// assert_eq!(config.admin.county_level, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// County and municipality lookup settings.
    pub admin: AdminIndexConfig,
    /// Nearest-street lookup settings.
    pub street: StreetIndexConfig,
    /// Initial slot count for the node coordinate store.
    pub node_store_capacity: usize,
    /// Initial slot count for the way centroid store.
    pub way_store_capacity: usize,
    /// Bound on decoded entities buffered between the decoder and a stage.
    pub channel_capacity: usize,
    /// Country assumed for boundaries without any country tag.
    ///
    /// While this is set, the country check in stage 1 never rejects a
    /// relation: on an extract that crosses a border, a foreign level 4 or 7
    /// boundary without `ISO3166-2` or `country_code` tags is filed under this
    /// code. Set it to `None` to skip such relations instead.
    pub default_country_code: Option<String>,
    /// Keys that, together with `name`, mark a point of interest.
    pub poi_keys: Vec<String>,
    /// Attach the nearest street to node records.
    pub resolve_streets: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            admin: AdminIndexConfig::default(),
            street: StreetIndexConfig::default(),
            node_store_capacity: 1 << 20,
            way_store_capacity: 1 << 16,
            channel_capacity: 4096,
            default_country_code: Some("NO".to_owned()),
            poi_keys: DEFAULT_POI_KEYS.iter().map(|&key| key.to_owned()).collect(),
            resolve_streets: true,
        }
    }
}

impl PipelineConfig {
    /// Validate the nested index settings and the channel bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.admin.validate()?;
        self.street.validate()?;
        if self.channel_capacity == 0 {
            return Err(ConfigError::NotPositive {
                field: "channel_capacity",
                value: 0.0,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert!(config.poi_keys.iter().any(|key| key == "amenity"));
        assert_eq!(config.default_country_code.as_deref(), Some("NO"));
    }

    #[rstest]
    fn zero_channel_is_rejected() {
        let config = PipelineConfig {
            channel_capacity: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "channel_capacity",
                ..
            })
        ));
    }

    #[rstest]
    fn nested_errors_surface() {
        let mut config = PipelineConfig::default();
        config.admin.municipality_level = config.admin.county_level;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateLevel { .. })
        ));
    }
}
