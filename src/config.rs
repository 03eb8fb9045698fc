use crate::params::{ParamRanges, Parameters};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Complete application configuration for export/import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version field for future compatibility
    pub version: u32,
    /// Current parameter values
    pub params: Parameters,
    /// Slider ranges the parameters are clamped to
    #[serde(default)]
    pub ranges: ParamRanges,
    /// Milliseconds between driver ticks
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Driver ticks per tick interval (app-level)
    #[serde(default = "default_ticks_per_frame")]
    pub ticks_per_frame: usize,
    /// RNG seed; `None` seeds from entropy
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_tick_ms() -> u64 {
    100
}

fn default_ticks_per_frame() -> usize {
    1
}

impl AppConfig {
    /// `<config dir>/schelling-simulator/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("schelling-simulator").join("config.json"))
    }

    /// Export config to a JSON file, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create config directory: {}", e))?;
            }
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        fs::write(path, json).map_err(|e| format!("Failed to write config file: {}", e))?;
        Ok(())
    }

    /// Import config from a JSON file. Parameters are validated and clamped
    /// into the stored slider ranges.
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let content =
            fs::read_to_string(path).map_err(|e| format!("Failed to read config file: {}", e))?;
        let mut config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;
        config
            .params
            .validate()
            .map_err(|e| format!("Invalid parameters in config file: {}", e))?;
        config.params = config.ranges.clamp(&config.params);
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let ranges = ParamRanges::default();
        Self {
            version: 1,
            params: ranges.defaults(),
            ranges,
            tick_ms: default_tick_ms(),
            ticks_per_frame: default_ticks_per_frame(),
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_file_save_and_load() {
        let config = AppConfig {
            params: Parameters {
                cell_size: 4,
                occupancy: 0.6,
                group_count: 5,
                preference: 0.35,
            },
            tick_ms: 50,
            ticks_per_frame: 3,
            seed: Some(99),
            ..Default::default()
        };

        let temp_file = NamedTempFile::new().unwrap();
        config.save_to_file(temp_file.path()).unwrap();
        let loaded = AppConfig::load_from_file(temp_file.path()).unwrap();

        assert_eq!(loaded.params, config.params);
        assert_eq!(loaded.tick_ms, 50);
        assert_eq!(loaded.ticks_per_frame, 3);
        assert_eq!(loaded.seed, Some(99));
    }

    #[test]
    fn test_missing_optional_fields_use_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(
            temp_file.path(),
            r#"{"version":1,"params":{"cell_size":3,"occupancy":0.5,"group_count":3,"preference":0.4}}"#,
        )
        .unwrap();

        let loaded = AppConfig::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.params.group_count, 3);
        assert_eq!(loaded.tick_ms, 100);
        assert_eq!(loaded.ticks_per_frame, 1);
        assert_eq!(loaded.ranges, ParamRanges::default());
        assert_eq!(loaded.seed, None);
    }

    #[test]
    fn test_load_clamps_into_ranges() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(
            temp_file.path(),
            r#"{"version":1,"params":{"cell_size":30,"occupancy":0.99,"group_count":40,"preference":0.4}}"#,
        )
        .unwrap();

        let loaded = AppConfig::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.params.cell_size, 10);
        assert_eq!(loaded.params.occupancy, 0.95);
        assert_eq!(loaded.params.group_count, 10);
    }

    #[test]
    fn test_load_rejects_invalid_parameters() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(
            temp_file.path(),
            r#"{"version":1,"params":{"cell_size":0,"occupancy":0.5,"group_count":2,"preference":0.4}}"#,
        )
        .unwrap();

        let err = AppConfig::load_from_file(temp_file.path()).unwrap_err();
        assert!(err.contains("cell size"));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        AppConfig::default().save_to_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_invalid_config_file() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "not valid json").unwrap();
        assert!(AppConfig::load_from_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let result = AppConfig::load_from_file(Path::new("/nonexistent/path/config.json"));
        assert!(result.is_err());
    }
}
