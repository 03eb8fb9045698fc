use crate::params::Parameters;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A named parameter set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub description: String,
    pub params: Parameters,
}

impl Preset {
    pub fn new(name: impl Into<String>, description: impl Into<String>, params: Parameters) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params,
        }
    }
}

/// Built-in presets plus any user presets found on disk
pub struct PresetManager {
    pub builtin: Vec<Preset>,
    pub user: Vec<Preset>,
}

impl Default for PresetManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PresetManager {
    pub fn new() -> Self {
        let mut manager = Self {
            builtin: Self::builtin_presets(),
            user: Vec::new(),
        };
        if let Some(dir) = Self::presets_dir() {
            manager.user = Self::load_dir(&dir);
        }
        manager
    }

    fn builtin_presets() -> Vec<Preset> {
        let base = Parameters::default();
        vec![
            Preset::new("Classic", "Two groups, half of neighbours similar", base),
            Preset::new(
                "Tolerant",
                "Mild preference still segregates",
                Parameters { preference: 0.3, ..base },
            ),
            Preset::new(
                "Demanding",
                "High preference, slow to settle",
                Parameters { preference: 0.75, occupancy: 0.7, ..base },
            ),
            Preset::new(
                "Mosaic",
                "Many small groups",
                Parameters { group_count: 6, preference: 0.4, occupancy: 0.85, ..base },
            ),
            Preset::new(
                "Sparse",
                "Plenty of vacancies",
                Parameters { occupancy: 0.4, preference: 0.6, ..base },
            ),
            Preset::new(
                "Crowded",
                "Few vacancies, many stranded agents",
                Parameters { occupancy: 0.95, group_count: 3, preference: 0.5, ..base },
            ),
        ]
    }

    /// `<config dir>/schelling-simulator/presets`
    fn presets_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("schelling-simulator").join("presets"))
    }

    /// Load every `*.json` preset in `dir`; unreadable or invalid files are skipped.
    pub fn load_dir(dir: &Path) -> Vec<Preset> {
        let mut presets = Vec::new();
        let Ok(entries) = fs::read_dir(dir) else {
            return presets;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|content| serde_json::from_str::<Preset>(&content).map_err(|e| e.to_string()));
            match parsed {
                Ok(preset) if preset.params.validate().is_ok() => presets.push(preset),
                Ok(preset) => warn!("Ignoring preset '{}' with invalid parameters", preset.name),
                Err(e) => warn!("Ignoring preset file {}: {}", path.display(), e),
            }
        }
        presets.sort_by(|a, b| a.name.cmp(&b.name));
        presets
    }

    pub fn all_presets(&self) -> impl Iterator<Item = &Preset> {
        self.builtin.iter().chain(self.user.iter())
    }

    pub fn len(&self) -> usize {
        self.builtin.len() + self.user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&Preset> {
        self.all_presets().nth(index)
    }

    pub fn find(&self, name: &str) -> Option<&Preset> {
        self.all_presets().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn preset_names(&self) -> Vec<&str> {
        self.all_presets().map(|p| p.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin_only() -> PresetManager {
        PresetManager {
            builtin: PresetManager::builtin_presets(),
            user: Vec::new(),
        }
    }

    #[test]
    fn test_builtin_presets_are_valid() {
        let manager = builtin_only();
        assert!(manager.len() >= 5);
        for preset in manager.all_presets() {
            assert!(preset.params.validate().is_ok(), "{} is invalid", preset.name);
        }
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let manager = builtin_only();
        assert_eq!(manager.find("mosaic").map(|p| p.params.group_count), Some(6));
        assert!(manager.find("nope").is_none());
        assert_eq!(manager.get(0).map(|p| p.name.as_str()), Some("Classic"));
    }

    #[test]
    fn test_load_dir_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = Preset::new("Mine", "user preset", Parameters { group_count: 4, ..Default::default() });
        fs::write(dir.path().join("mine.json"), serde_json::to_string(&good).unwrap()).unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let invalid = Preset::new("Bad", "", Parameters { cell_size: 0, ..Default::default() });
        fs::write(dir.path().join("bad.json"), serde_json::to_string(&invalid).unwrap()).unwrap();

        let loaded = PresetManager::load_dir(dir.path());
        assert_eq!(loaded, vec![good]);
    }

    #[test]
    fn test_load_missing_dir_is_empty() {
        assert!(PresetManager::load_dir(Path::new("/nonexistent/presets")).is_empty());
    }
}
