//! Configuration loading and resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing config file is not an error: a warning is logged and the
//! compiled defaults are used. A config file that exists but cannot be
//! parsed is reported as [`Error::Config`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable selecting the surround decode path
pub const ENV_SURROUND: &str = "SURROUND_OUT_SURROUND";

/// Environment variable naming the output device
pub const ENV_DEVICE: &str = "SURROUND_OUT_DEVICE";

/// Environment variable holding the initial volume in percent
pub const ENV_VOLUME: &str = "SURROUND_OUT_VOLUME";

/// Compiled-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    /// Location of the TOML config file
    pub config_file: PathBuf,
    /// Default tracing filter level
    pub log_level: String,
    /// Mixer sample rate in Hz
    pub sample_rate: u32,
    /// Mixer ring capacity in stereo frames
    pub ring_buffer_frames: usize,
    /// Initial output volume in percent
    pub volume_percent: i32,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was compiled for
    ///
    /// - Linux: `~/.config/surround-out/config.toml`
    /// - macOS: `~/Library/Application Support/surround-out/config.toml`
    /// - Windows: `%APPDATA%\surround-out\config.toml`
    pub fn for_current_platform() -> Self {
        let config_file = dirs::config_dir()
            .map(|d| d.join("surround-out").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./surround-out.toml"));

        Self {
            config_file,
            log_level: "info".to_string(),
            sample_rate: 48_000,
            // ~170ms @ 48kHz
            ring_buffer_frames: 8192,
            volume_percent: 100,
        }
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TomlConfig {
    /// Decode stereo into 5.1 surround instead of stereo passthrough
    pub surround_decode: bool,
    /// Output device name (None = backend default device)
    pub device: Option<String>,
    /// Initial volume in percent; not clamped here
    pub volume_percent: i32,
    /// Mixer ring capacity in stereo frames
    pub ring_buffer_frames: usize,
    /// Mixer sample rate in Hz
    pub sample_rate: u32,
    /// Tracing filter level (e.g. "info", "debug")
    pub log_level: String,
}

/// Config file contents; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    surround_decode: Option<bool>,
    device: Option<String>,
    volume_percent: Option<i32>,
    ring_buffer_frames: Option<usize>,
    sample_rate: Option<u32>,
    log_level: Option<String>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self::from_defaults(&CompiledDefaults::for_current_platform())
    }
}

impl TomlConfig {
    /// Configuration made only of compiled defaults
    pub fn from_defaults(defaults: &CompiledDefaults) -> Self {
        Self {
            surround_decode: false,
            device: None,
            volume_percent: defaults.volume_percent,
            ring_buffer_frames: defaults.ring_buffer_frames,
            sample_rate: defaults.sample_rate,
            log_level: defaults.log_level.clone(),
        }
    }

    /// Parse a config file from disk; keys it omits come from `defaults`
    pub fn load(path: &Path, defaults: &CompiledDefaults) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, defaults)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse config from TOML text; keys it omits come from `defaults`
    pub fn parse(content: &str, defaults: &CompiledDefaults) -> Result<Self> {
        let file: FileConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;

        let config = Self {
            surround_decode: file.surround_decode.unwrap_or(false),
            device: file.device,
            volume_percent: file.volume_percent.unwrap_or(defaults.volume_percent),
            ring_buffer_frames: file.ring_buffer_frames.unwrap_or(defaults.ring_buffer_frames),
            sample_rate: file.sample_rate.unwrap_or(defaults.sample_rate),
            log_level: file.log_level.unwrap_or_else(|| defaults.log_level.clone()),
        };

        if config.ring_buffer_frames == 0 {
            return Err(Error::Config("ring_buffer_frames must be > 0".to_string()));
        }
        if config.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be > 0".to_string()));
        }

        Ok(config)
    }
}

/// Values supplied on the command line; `None` means "not given"
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Explicit config file path (must exist when given)
    pub config_file: Option<PathBuf>,
    pub surround_decode: Option<bool>,
    pub device: Option<String>,
    pub volume_percent: Option<i32>,
}

/// Resolves the effective configuration from all sources
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    overrides: ConfigOverrides,
    defaults: CompiledDefaults,
}

impl ConfigResolver {
    pub fn new(overrides: ConfigOverrides) -> Self {
        Self {
            overrides,
            defaults: CompiledDefaults::for_current_platform(),
        }
    }

    /// Use a specific set of compiled defaults (mainly for tests)
    pub fn with_defaults(overrides: ConfigOverrides, defaults: CompiledDefaults) -> Self {
        Self { overrides, defaults }
    }

    /// Resolve the effective configuration
    pub fn resolve(&self) -> Result<TomlConfig> {
        // Priority 4 and 3: compiled defaults, then TOML file
        let mut config = self.load_file()?;

        // Priority 2: environment
        if let Ok(value) = std::env::var(ENV_SURROUND) {
            match parse_bool(&value) {
                Some(flag) => config.surround_decode = flag,
                None => warn!("Ignoring {}={:?}: expected a boolean", ENV_SURROUND, value),
            }
        }
        if let Ok(value) = std::env::var(ENV_DEVICE) {
            if !value.is_empty() {
                config.device = Some(value);
            }
        }
        if let Ok(value) = std::env::var(ENV_VOLUME) {
            match value.trim().parse::<i32>() {
                Ok(volume) => config.volume_percent = volume,
                Err(_) => warn!("Ignoring {}={:?}: expected an integer", ENV_VOLUME, value),
            }
        }

        // Priority 1: command line
        if let Some(flag) = self.overrides.surround_decode {
            config.surround_decode = flag;
        }
        if let Some(device) = &self.overrides.device {
            config.device = Some(device.clone());
        }
        if let Some(volume) = self.overrides.volume_percent {
            config.volume_percent = volume;
        }

        debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }

    fn load_file(&self) -> Result<TomlConfig> {
        let mut config = TomlConfig::from_defaults(&self.defaults);

        if let Some(path) = &self.overrides.config_file {
            // An explicitly requested file must exist
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            config = TomlConfig::load(path, &self.defaults)?;
            info!("Loaded configuration from {}", path.display());
        } else if self.defaults.config_file.exists() {
            config = TomlConfig::load(&self.defaults.config_file, &self.defaults)?;
            info!(
                "Loaded configuration from {}",
                self.defaults.config_file.display()
            );
        } else {
            warn!(
                "No config file at {}, using compiled defaults",
                self.defaults.config_file.display()
            );
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_variants() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool(" ON "), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    fn test_defaults() -> CompiledDefaults {
        CompiledDefaults {
            config_file: PathBuf::from("unused.toml"),
            log_level: "debug".to_string(),
            sample_rate: 44_100,
            ring_buffer_frames: 1024,
            volume_percent: 30,
        }
    }

    #[test]
    fn test_parse_fills_omitted_keys_from_given_defaults() {
        let config = TomlConfig::parse("surround_decode = true\n", &test_defaults()).unwrap();

        assert!(config.surround_decode);
        assert_eq!(config.device, None);
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.ring_buffer_frames, 1024);
        assert_eq!(config.volume_percent, 30);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_parse_rejects_zero_sample_rate() {
        let result = TomlConfig::parse("sample_rate = 0\n", &test_defaults());
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
