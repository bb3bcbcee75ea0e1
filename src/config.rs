//! Engine configuration: optional ~/.gridtrack/config.yaml.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, DEFAULT_BPM, DEFAULT_PPQ};
use crate::error::Error;

/// Engine settings. Every field is optional on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bpm: f64,
    pub ppq: u32,
    /// Host of the synth that receives OSC triggers.
    pub osc_host: String,
    pub osc_port: u16,
    /// Base seed for the per-track random streams; unset seeds from time.
    pub seed: Option<u64>,
    /// Directory that relative sample paths are resolved against.
    pub sample_root: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            ppq: DEFAULT_PPQ,
            osc_host: "127.0.0.1".to_string(),
            osc_port: 57120,
            seed: None,
            sample_root: None,
        }
    }
}

/// ~/.gridtrack/config.yaml
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".gridtrack").join("config.yaml"))
}

impl EngineConfig {
    /// Load from the standard path, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// A clock for these settings; out-of-range values are clamped.
    pub fn clock(&self) -> Clock {
        Clock::new(self.bpm, self.ppq)
    }

    /// Resolve a sample path from a composition against `sample_root`.
    pub fn sample_path(&self, path: &Path) -> PathBuf {
        match &self.sample_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert!((config.bpm - 120.0).abs() < f64::EPSILON);
        assert_eq!(config.ppq, 4);
        assert_eq!(config.osc_port, 57120);
        assert!(config.seed.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "bpm: 140\nseed: 9").unwrap();
        let config = EngineConfig::load_from(file.path()).unwrap();
        assert!((config.bpm - 140.0).abs() < f64::EPSILON);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.ppq, 4);
        assert_eq!(config.osc_host, "127.0.0.1");
    }

    #[test]
    fn bad_yaml_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "bpm: [fast").unwrap();
        assert!(matches!(EngineConfig::load_from(file.path()), Err(Error::Yaml(_))));
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = EngineConfig::load_from(Path::new("/nonexistent/gridtrack.yaml"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn load_never_panics() {
        let _ = EngineConfig::load();
    }

    #[test]
    fn clock_clamps() {
        let config = EngineConfig {
            bpm: 0.0,
            ppq: 100,
            ..Default::default()
        };
        let clock = config.clock();
        assert!((clock.bpm() - 1.0).abs() < f64::EPSILON);
        assert_eq!(clock.ppq(), 32);
    }

    #[test]
    fn sample_paths_resolve_against_root() {
        let config = EngineConfig {
            sample_root: Some(PathBuf::from("/samples")),
            ..Default::default()
        };
        assert_eq!(
            config.sample_path(Path::new("kit/kick.wav")),
            PathBuf::from("/samples/kit/kick.wav")
        );
        assert_eq!(
            config.sample_path(Path::new("/abs/kick.wav")),
            PathBuf::from("/abs/kick.wav")
        );
    }
}
