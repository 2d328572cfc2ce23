use derive_setters::Setters;
use serde::{Deserialize, Serialize};

/// Settings of a [DataLoader](super::DataLoader).
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Setters)]
#[serde(rename_all = "camelCase", default)]
pub struct LoaderConfig {
    /// Coalesce the loads of one scheduler tick into a single batch. When
    /// off, every load is dispatched on its own.
    pub batch: bool,

    /// Dispatch as soon as this many keys are queued. `None` or `0` means no
    /// limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[setters(strip_option)]
    pub max_batch_size: Option<usize>,

    /// Share one future between loads of the same cache key.
    pub cache: bool,

    /// Milliseconds to wait before a deferred dispatch. `0` waits for a
    /// single cooperative yield.
    pub delay: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig { batch: true, max_batch_size: None, cache: true, delay: 0 }
    }
}

impl LoaderConfig {
    /// The batch size threshold, if one is in effect.
    pub fn threshold(&self) -> Option<usize> {
        self.max_batch_size.filter(|size| *size > 0)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let config: LoaderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LoaderConfig::default());
        assert!(config.batch);
        assert!(config.cache);
        assert_eq!(config.threshold(), None);
    }

    #[test]
    fn test_camel_case_fields() {
        let config: LoaderConfig =
            serde_json::from_str(r#"{"batch": false, "maxBatchSize": 25, "delay": 3}"#).unwrap();
        assert_eq!(
            config,
            LoaderConfig::default().batch(false).max_batch_size(25).delay(3)
        );
    }

    #[test]
    fn test_zero_max_batch_size_is_unbounded() {
        let config = LoaderConfig::default().max_batch_size(0);
        assert_eq!(config.threshold(), None);
    }

    #[test]
    fn test_skips_absent_max_batch_size() {
        let json = serde_json::to_value(LoaderConfig::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"batch": true, "cache": true, "delay": 0})
        );
    }
}
