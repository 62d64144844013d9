//! Runtime settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tessera_core::ecs::RegistryConfig;

/// Settings for the headless particle run. Every field is optional in JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Live particle count the spawn phase tops up to.
    pub population: usize,
    pub frames: u32,
    /// Fixed timestep in seconds.
    pub dt: f32,
    /// Seconds a particle lives before the cull phase removes it.
    pub lifetime: f32,
    /// Log a status line every N frames (`0` disables).
    pub report_every: u32,
    pub registry: RegistryConfig,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            population: 10_000,
            frames: 600,
            dt: 1.0 / 60.0,
            lifetime: 3.0,
            report_every: 60,
            registry: RegistryConfig::default(),
        }
    }
}

impl RuntimeSettings {
    /// Read settings from a JSON file, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing settings from {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings: RuntimeSettings =
            serde_json::from_str(r#"{ "frames": 5, "registry": { "page_size": 64 } }"#).unwrap();
        assert_eq!(settings.frames, 5);
        assert_eq!(settings.population, RuntimeSettings::default().population);
        assert_eq!(settings.registry.page_size, 64);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = RuntimeSettings::load(Some(Path::new("/nonexistent/tessera.json"))).unwrap_err();
        assert!(err.to_string().contains("reading settings"));
    }
}
