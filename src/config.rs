//! Board configuration files
//!
//! A board file describes where the flash controller and program flash live
//! and how the writer polls the controller:
//!
//! ```toml
//! [controller]
//! base = "0x40020000"
//!
//! [pflash]
//! base = 0x00000000
//! size = "128 KiB"
//!
//! [writer]
//! timeout_us = 100000
//! poll_interval_us = 10
//! wait_for_completion = false
//! ```
//!
//! Every section is optional; anything left out keeps the FRDM-KL25Z value.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ftfx_core::{CompletionMode, FlashConfig, FlashGeometry, WriterConfig};
use thiserror::Error;

/// Errors loading a board configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not valid TOML or has the wrong shape
    #[error("invalid board file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The P-Flash description is unusable
    #[error("invalid P-Flash layout: {0}")]
    Geometry(#[from] ftfx_core::Error),

    /// A value is out of range
    #[error("invalid board file: {0}")]
    Invalid(String),
}

/// TOML board file structure
#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlBoardFile {
    controller: Option<TomlController>,
    pflash: Option<TomlRegion>,
    dflash: Option<TomlRegion>,
    eeram: Option<TomlRegion>,
    writer: Option<TomlWriter>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlController {
    #[serde(deserialize_with = "deserialize_hex_u32")]
    base: u32,
}

/// A memory region in TOML
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlRegion {
    #[serde(deserialize_with = "deserialize_hex_u32")]
    base: u32,
    #[serde(deserialize_with = "deserialize_size")]
    size: u32,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlWriter {
    timeout_us: Option<u32>,
    poll_interval_us: Option<u32>,
    #[serde(default)]
    wait_for_completion: bool,
    #[serde(default)]
    debug: bool,
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Int(u32),
    Str(String),
}

/// Deserialize a u32 that can be hex (0x...) or decimal
fn deserialize_hex_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Int(n) => Ok(n),
        NumOrStr::Str(s) => parse_number(&s).map_err(serde::de::Error::custom),
    }
}

/// Deserialize a size that can be a number or a string like "128 KiB"
fn deserialize_size<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Int(n) => Ok(n),
        NumOrStr::Str(s) => parse_size(&s).map_err(serde::de::Error::custom),
    }
}

/// Parse a number that can be hex (0x...) or decimal
fn parse_number(s: &str) -> Result<u32, String> {
    let s = s.trim().replace('_', "");
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("invalid hex: {}", e))
    } else {
        s.parse().map_err(|e| format!("invalid number: {}", e))
    }
}

/// Parse a size string like "128 KiB", "0x20000" or "4096"
fn parse_size(s: &str) -> Result<u32, String> {
    let s = s.trim();

    if let Ok(n) = parse_number(s) {
        return Ok(n);
    }

    let s_lower = s.to_lowercase();
    let (num_str, multiplier) = if let Some(n) = s_lower.strip_suffix("mib") {
        (n.trim(), 1024 * 1024)
    } else if let Some(n) = s_lower.strip_suffix("kib") {
        (n.trim(), 1024)
    } else if let Some(n) = s_lower.strip_suffix("b") {
        (n.trim(), 1)
    } else {
        return Err(format!("invalid size: {}", s));
    };

    let num: u32 = num_str.parse().map_err(|_| format!("invalid size: {}", s))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size too large: {}", s))
}

/// Format a byte count the way board files write it
pub fn format_size(size: u32) -> String {
    if size >= 1024 * 1024 && size % (1024 * 1024) == 0 {
        format!("{} MiB", size / (1024 * 1024))
    } else if size >= 1024 && size % 1024 == 0 {
        format!("{} KiB", size / 1024)
    } else {
        format!("{} B", size)
    }
}

/// Effective configuration for one board
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Flash driver configuration
    pub flash: FlashConfig,
    /// Writer polling configuration
    pub writer: WriterConfig,
    /// File the configuration came from, if any
    pub source: Option<PathBuf>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            flash: FlashConfig::KL25Z,
            writer: WriterConfig::default(),
            source: None,
        }
    }
}

impl BoardConfig {
    /// Load the board file at `path`, or the FRDM-KL25Z defaults if no
    /// path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_toml_file(path),
            None => {
                log::debug!("No board file given, using FRDM-KL25Z defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load a board configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.source = Some(path.to_path_buf());
        log::debug!("Loaded board file {}", path.display());
        Ok(config)
    }

    /// Parse a board configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: TomlBoardFile = toml::from_str(content)?;
        let mut config = Self::default();

        if let Some(controller) = file.controller {
            config.flash.controller_base = controller.base;
        }
        if let Some(pflash) = file.pflash {
            config.flash.pflash_base = pflash.base;
            config.flash.pflash_size = pflash.size;
        }
        if let Some(dflash) = file.dflash {
            config.flash.dflash_base = dflash.base;
            config.flash.dflash_size = dflash.size;
        }
        if let Some(eeram) = file.eeram {
            config.flash.eeram_base = eeram.base;
            config.flash.eeram_size = eeram.size;
        }
        if let Some(writer) = file.writer {
            if let Some(timeout) = writer.timeout_us {
                config.writer.timeout_us = timeout;
            }
            if let Some(interval) = writer.poll_interval_us {
                if interval == 0 {
                    return Err(ConfigError::Invalid(
                        "poll_interval_us must be at least 1".into(),
                    ));
                }
                config.writer.poll_interval_us = interval;
            }
            if writer.wait_for_completion {
                config.writer.completion = CompletionMode::WaitForCompletion;
            }
            config.flash.debug_enable = writer.debug;
        }

        config.geometry()?;
        Ok(config)
    }

    /// Validated P-Flash geometry
    pub fn geometry(&self) -> Result<FlashGeometry, ConfigError> {
        Ok(self.flash.geometry()?)
    }
}
