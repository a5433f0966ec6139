//! Configuration Management

use crate::chain::{MappingChain, TimingSource};
use crate::mapping::{Mapping, MappingSettings};
use crate::preset::{Preset, PresetMapping};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine settings
    pub engine: EngineConfig,
    /// Mappings applied in every application, in chain order
    pub global_mappings: Vec<MappingSettings>,
    /// Application name to preset name
    pub app_presets: BTreeMap<String, String>,
    /// Named presets
    pub presets: BTreeMap<String, Preset>,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Time used for gesture timing windows
    pub timing: TimingSource,
    /// Log every event with its outputs at debug level
    pub log_events: bool,
    /// Delay before retrying event tap creation (ms)
    pub tap_retry_ms: u64,
    /// Frontmost application polling interval (ms)
    pub frontmost_poll_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timing: TimingSource::Event,
            log_events: false,
            tap_retry_ms: 1000,
            frontmost_poll_ms: 500,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            global_mappings: vec![
                MappingSettings::middle_click(),
                MappingSettings::magic_mouse_zoom(),
                MappingSettings::multi_tap(),
            ],
            app_presets: BTreeMap::from([("Cubase".to_string(), "Cubase".to_string())]),
            presets: Preset::builtin(),
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.engine.tap_retry_ms == 0 {
            return Err(crate::Error::Config("tap_retry_ms must be > 0".to_string()));
        }
        if self.engine.frontmost_poll_ms == 0 {
            return Err(crate::Error::Config("frontmost_poll_ms must be > 0".to_string()));
        }
        for (index, mapping) in self.global_mappings.iter().enumerate() {
            mapping
                .validate()
                .map_err(|e| crate::Error::Config(format!("global_mappings[{}]: {}", index, e)))?;
        }
        for (name, preset) in &self.presets {
            preset
                .validate()
                .map_err(|e| crate::Error::Config(format!("preset '{}': {}", name, e)))?;
        }
        for (app, preset) in &self.app_presets {
            if !self.presets.contains_key(preset) {
                return Err(crate::Error::Config(format!(
                    "app '{}' uses unknown preset '{}'",
                    app, preset
                )));
            }
        }
        Ok(())
    }

    /// Parse a TOML document, merging the built-in presets under the user's.
    pub fn from_toml(content: &str) -> Result<Self, crate::Error> {
        let mut config: Self = toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))?;
        for (name, preset) in Preset::builtin() {
            config.presets.entry(name).or_insert(preset);
        }
        config.validate()?;
        Ok(config)
    }

    /// Load config from file
    pub fn load(path: &PathBuf) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self, crate::Error> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &PathBuf) -> Result<(), crate::Error> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Save to default location
    pub fn save_default(&self) -> Result<(), crate::Error> {
        self.save(&Self::default_path())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".pinchbar").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Preset assigned to `app`, with its name
    pub fn preset_for(&self, app: &str) -> Option<(&str, &Preset)> {
        let name = self.app_presets.get(app)?;
        self.presets.get_key_value(name).map(|(name, preset)| (name.as_str(), preset))
    }

    /// Chain for the frontmost application: global mappings in configured
    /// order, then the application's preset stage if it has one.
    pub fn chain_for(&self, app: Option<&str>) -> MappingChain {
        let mut chain = MappingChain::from_settings(&self.global_mappings);
        if let Some((name, preset)) = app.and_then(|app| self.preset_for(app)) {
            chain.push(Mapping::Preset(PresetMapping::new(name, preset)));
        }
        chain
    }
}
