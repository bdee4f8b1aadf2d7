//! Pipeline configuration.

use mixdeck_media::MediaConfig;
use mixdeck_queue::QueueConfig;
use mixdeck_storage::StorageConfig;

/// Settings for every pipeline component.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub storage: StorageConfig,
    pub media: MediaConfig,
    pub queue: QueueConfig,
}

impl PipelineConfig {
    /// Create config from environment variables.
    ///
    /// Does not load `.env`; binaries call `dotenvy::dotenv()` first.
    pub fn from_env() -> Self {
        Self {
            storage: StorageConfig::from_env(),
            media: MediaConfig::from_env(),
            queue: QueueConfig::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert!(!config.storage.is_complete());
        assert_eq!(config.media.waveform_points, 100);
        assert_eq!(config.media.peak_points, 50);
        assert_eq!(config.queue.derived_prefix, "processed");
    }
}
