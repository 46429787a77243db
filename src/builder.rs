//! Builder for configuring and constructing an [`Engine`].

use kairos_beat::{BeatSyncConfig, EstimatorFactory};
use kairos_core::EngineConfig;

use crate::{AudioProcessor, Engine, Result};

/// Configures an engine and splits it into its script and audio halves.
///
/// # Example
///
/// ```ignore
/// use kairos::prelude::*;
///
/// let (mut engine, mut audio) = Engine::builder()
///     .sample_rate(44_100)
///     .block_size(128)
///     .build()?;
///
/// // Move `audio` to the audio callback:
/// audio.process_block(128);
/// ```
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    beat_sync: BeatSyncConfig,
    estimator: Option<EstimatorFactory>,
}

impl EngineBuilder {
    /// Replace the whole engine config.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: 48000
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    /// Largest block the audio thread processes at once. Default: 256
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.config.block_size = block_size;
        self
    }

    /// Live entries per node cache. Default: 256
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Pending script notifications before new ones are dropped. Default: 1024
    pub fn notification_capacity(mut self, capacity: usize) -> Self {
        self.config.notification_capacity = capacity;
        self
    }

    pub fn beat_sync(mut self, config: BeatSyncConfig) -> Self {
        self.beat_sync = config;
        self
    }

    /// Use a custom tempo estimator for new beat trackers.
    pub fn estimator(mut self, factory: EstimatorFactory) -> Self {
        self.estimator = Some(factory);
        self
    }

    pub fn build(self) -> Result<(Engine, AudioProcessor)> {
        self.config.validate()?;
        self.beat_sync.validate()?;
        tracing::debug!(
            sample_rate = self.config.sample_rate,
            block_size = self.config.block_size,
            cache_capacity = self.config.cache_capacity,
            "building engine"
        );
        Ok(Engine::from_parts(self.config, self.beat_sync, self.estimator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_defaults_build() {
        let (engine, audio) = EngineBuilder::default().build().unwrap();
        assert_eq!(engine.sample_rate(), 48_000);
        assert_eq!(audio.block_size(), 256);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = EngineBuilder::default().block_size(0).build();
        assert!(matches!(result, Err(Error::Core(kairos_core::Error::InvalidConfig(_)))));
    }

    #[test]
    fn test_invalid_beat_sync_rejected() {
        let beat_sync = BeatSyncConfig {
            hop_size: 0,
            ..BeatSyncConfig::default()
        };
        assert!(EngineBuilder::default().beat_sync(beat_sync).build().is_err());
    }
}
