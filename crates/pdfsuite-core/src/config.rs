//! TOML configuration for tool defaults
//!
//! Every section is optional; missing keys fall back to the built-in
//! defaults, so an empty file is a valid configuration.

use crate::error::PdfSuiteError;
use crate::geometry::ScreenRect;
use crate::pipeline::{CompressionLevel, CompressionSettings, OcrOptions};
use crate::reader::{DEFAULT_WPM, MAX_WPM, MIN_WPM};
use crate::tools::WatermarkOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV_VAR: &str = "PDFSUITE_CONFIG";

/// Main configuration structure loaded from TOML files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Defaults for the watermark tool
    pub watermark: WatermarkOptions,
    /// Initial selection box of the watermark remover
    pub redaction: RedactionConfig,
    /// Quality and scale for each compression level
    pub compression: CompressionConfig,
    pub reader: ReaderConfig,
    pub ocr: OcrOptions,
}

impl SuiteConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `PdfSuiteError::Config` if:
    /// - The file cannot be read
    /// - The TOML is malformed
    /// - A value is out of range (see [`SuiteConfig::validate`])
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pdfsuite_core::config::SuiteConfig;
    ///
    /// # fn example() -> Result<(), pdfsuite_core::PdfSuiteError> {
    /// let config = SuiteConfig::from_file("pdfsuite.toml")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PdfSuiteError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PdfSuiteError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        content.parse()
    }

    /// Load from the file named by `PDFSUITE_CONFIG`, or the defaults if it is unset.
    pub fn from_env() -> Result<Self, PdfSuiteError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject values the tools cannot work with.
    pub fn validate(&self) -> Result<(), PdfSuiteError> {
        let w = &self.watermark;
        if !(0.0..=1.0).contains(&w.opacity) {
            return Err(invalid("watermark.opacity", w.opacity, "must be in [0, 1]"));
        }
        if !(w.size > 0.0) {
            return Err(invalid("watermark.size", w.size, "must be positive"));
        }
        if !(w.margin >= 0.0) {
            return Err(invalid("watermark.margin", w.margin, "must not be negative"));
        }

        let r = &self.redaction;
        if !(r.width > 0.0 && r.height > 0.0) {
            return Err(PdfSuiteError::Config(
                "redaction box must have a positive size".into(),
            ));
        }

        for (name, settings) in [
            ("low", self.compression.low),
            ("medium", self.compression.medium),
            ("high", self.compression.high),
        ] {
            if !(settings.quality > 0.0 && settings.quality <= 1.0) {
                return Err(invalid(
                    &format!("compression.{}.quality", name),
                    settings.quality,
                    "must be in (0, 1]",
                ));
            }
            if !(settings.scale > 0.0) {
                return Err(invalid(
                    &format!("compression.{}.scale", name),
                    settings.scale,
                    "must be positive",
                ));
            }
        }

        if !(MIN_WPM..=MAX_WPM).contains(&self.reader.wpm) {
            return Err(PdfSuiteError::Config(format!(
                "reader.wpm = {} must be between {} and {}",
                self.reader.wpm, MIN_WPM, MAX_WPM
            )));
        }
        if !(self.ocr.scale > 0.0) {
            return Err(invalid("ocr.scale", self.ocr.scale, "must be positive"));
        }
        if self.ocr.language.trim().is_empty() {
            return Err(PdfSuiteError::Config("ocr.language must not be empty".into()));
        }
        Ok(())
    }
}

impl FromStr for SuiteConfig {
    type Err = PdfSuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: SuiteConfig = toml::from_str(s).map_err(|e| {
            PdfSuiteError::Config(format!("Failed to parse TOML configuration: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }
}

fn invalid(key: &str, value: f64, rule: &str) -> PdfSuiteError {
    PdfSuiteError::Config(format!("{} = {} {}", key, value, rule))
}

/// Screen-space box offered before the user drags their own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionConfig {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            x: 100.0,
            y: 100.0,
            width: 200.0,
            height: 100.0,
        }
    }
}

impl RedactionConfig {
    pub fn initial_box(&self) -> ScreenRect {
        ScreenRect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub low: CompressionSettings,
    pub medium: CompressionSettings,
    pub high: CompressionSettings,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            low: CompressionLevel::Low.settings(),
            medium: CompressionLevel::Medium.settings(),
            high: CompressionLevel::High.settings(),
        }
    }
}

impl CompressionConfig {
    pub fn settings(&self, level: CompressionLevel) -> CompressionSettings {
        match level {
            CompressionLevel::Low => self.low,
            CompressionLevel::Medium => self.medium,
            CompressionLevel::High => self.high,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Words per minute
    pub wpm: u32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self { wpm: DEFAULT_WPM }
    }
}
