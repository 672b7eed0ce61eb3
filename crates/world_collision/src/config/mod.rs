//! Configuration system
//!
//! Tunables for octree subdivision and incremental building, loadable from
//! TOML or RON files.

pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is out of its allowed range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Octree subdivision parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Maximum triangles per leaf before it is split
    pub leaf_capacity: usize,

    /// Maximum subdivision depth (root is depth 0)
    pub max_depth: u32,

    /// Outward padding applied to every face of the root box
    pub box_margin: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            leaf_capacity: 8,
            max_depth: 16,
            box_margin: 0.01,
        }
    }
}

impl OctreeConfig {
    /// Set the leaf capacity
    pub fn with_leaf_capacity(mut self, capacity: usize) -> Self {
        self.leaf_capacity = capacity;
        self
    }

    /// Set the maximum depth
    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.leaf_capacity == 0 {
            return Err(ConfigError::Invalid("leaf_capacity must be at least 1".to_string()));
        }
        if !self.box_margin.is_finite() || self.box_margin < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "box_margin must be finite and non-negative, got {}",
                self.box_margin
            )));
        }
        Ok(())
    }
}

/// Incremental build parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Nodes examined per build step
    pub batch_size: usize,

    /// Triangles inserted per ingest step
    pub ingest_batch_size: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            ingest_batch_size: 1000,
        }
    }
}

impl BuildConfig {
    /// Set the build batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the ingest batch size
    pub fn with_ingest_batch_size(mut self, batch_size: usize) -> Self {
        self.ingest_batch_size = batch_size;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".to_string()));
        }
        if self.ingest_batch_size == 0 {
            return Err(ConfigError::Invalid("ingest_batch_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// # Complete Collision Configuration
///
/// Top-level configuration grouping subdivision and build settings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Subdivision settings
    pub octree: OctreeConfig,
    /// Incremental build settings
    pub build: BuildConfig,
}

impl CollisionConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.octree.validate()?;
        self.build.validate()
    }
}

impl Config for CollisionConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = CollisionConfig::default();
        assert_eq!(config.octree.leaf_capacity, 8);
        assert_eq!(config.octree.max_depth, 16);
        assert_eq!(config.build.batch_size, 100);
        assert_eq!(config.build.ingest_batch_size, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_sizes() {
        let config = CollisionConfig {
            octree: OctreeConfig::default().with_leaf_capacity(0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let build = BuildConfig::default().with_batch_size(0);
        assert!(build.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CollisionConfig = toml::from_str("[octree]\nleaf_capacity = 4\n").unwrap();
        assert_eq!(config.octree.leaf_capacity, 4);
        assert_eq!(config.octree.max_depth, 16);
        assert_eq!(config.build, BuildConfig::default());
    }

    #[test]
    fn test_ron_round_trip_through_file() {
        let path = std::env::temp_dir().join("world_collision_config_test.ron");
        let path = path.to_string_lossy().to_string();
        let config = CollisionConfig {
            octree: OctreeConfig::default().with_max_depth(5),
            build: BuildConfig::default().with_batch_size(7),
        };
        config.save_to_file(&path).unwrap();
        let loaded = CollisionConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let result = CollisionConfig::default().save_to_file("config.yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
