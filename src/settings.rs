//! Persistent user settings.
//!
//! Stored as TOML in the platform config directory:
//!   Linux:    `~/.config/redactfe/settings.toml`
//!   Windows:  `%APPDATA%\redactfe\settings.toml`
//!   macOS:    `~/Library/Application Support/redactfe/settings.toml`
//!
//! A missing file yields the defaults (and writes them back); a malformed file
//! yields the defaults with a warning, leaving the file alone.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::components::tools::ToolSettings;
use crate::io::{DEFAULT_JPEG_QUALITY, ExportFormat};
use crate::ops::redact::{
    DEFAULT_BLOCK_SIZE, DEFAULT_FILL_COLOR, format_hex_color, parse_hex_color,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactSettings {
    /// Pixelate block size in buffer pixels.
    pub pixelate_block_size: u32,
    /// Color bar fill as `#rrggbb`.
    pub fill_color: String,
    /// Format used when the download path has no recognised extension.
    pub export_format: String,
    pub jpeg_quality: u8,
    /// Fraction of the window width available to the canvas.
    pub viewport_width_fraction: f32,
    pub viewport_height_fraction: f32,
    /// Width reserved for the side panel, in points.
    pub sidebar_width: f32,
}

impl Default for RedactSettings {
    fn default() -> Self {
        Self {
            pixelate_block_size: DEFAULT_BLOCK_SIZE,
            fill_color: format_hex_color(DEFAULT_FILL_COLOR),
            export_format: "png".to_string(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            viewport_width_fraction: 0.9,
            viewport_height_fraction: 0.8,
            sidebar_width: 300.0,
        }
    }
}

impl RedactSettings {
    pub fn settings_path() -> PathBuf {
        let config_dir = match dirs::config_dir() {
            Some(dir) => dir.join("redactfe"),
            None => PathBuf::from(".config/redactfe"),
        };
        config_dir.join("settings.toml")
    }

    /// Load from the default location, never failing.
    pub fn load() -> Self {
        Self::load_from(&Self::settings_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Ignoring malformed settings {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let defaults = Self::default();
                if let Err(e) = defaults.save_to(path) {
                    log::warn!("Could not write default settings: {}", e);
                }
                defaults
            }
            Err(e) => {
                log::warn!("Could not read settings {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::settings_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Tool parameters with invalid values replaced by defaults.
    pub fn tool_settings(&self) -> ToolSettings {
        ToolSettings {
            pixelate_block_size: if self.pixelate_block_size == 0 {
                DEFAULT_BLOCK_SIZE
            } else {
                self.pixelate_block_size
            },
            fill_color: parse_hex_color(&self.fill_color).unwrap_or(DEFAULT_FILL_COLOR),
        }
    }

    /// Remember the tool parameters in use.
    pub fn store_tool_settings(&mut self, tools: &ToolSettings) {
        self.pixelate_block_size = tools.pixelate_block_size;
        self.fill_color = format_hex_color(tools.fill_color);
    }

    pub fn default_export_format(&self) -> ExportFormat {
        ExportFormat::from_name(&self.export_format, self.jpeg_quality).unwrap_or_default()
    }
}
