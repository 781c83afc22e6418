//! Configuration file support for deckhand
//!
//! Configuration is stored in TOML format at:
//! - Linux: `~/.config/deckhand/config.toml`
//! - macOS: `~/Library/Application Support/deckhand/config.toml`
//! - Windows: `%APPDATA%\deckhand\config.toml`

use crate::error::{Error, Result};
use crate::surface::SurfaceLayout;
use crate::value::Encoding;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Physical layout of the surface
    pub surface: SurfaceLayout,
    /// MIDI transport configuration
    pub midi: MidiSettings,
    /// Timers and refresh rate
    pub timing: TimingSettings,
    /// Start-up state and interaction tweaks
    pub behavior: BehaviorSettings,
}

impl Config {
    /// Load configuration from the default config file location
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Err(Error::Config(format!("Config file not found at {:?}", path)))
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration or return default if not found
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Save configuration to the default config file location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "deckhand") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            Err(Error::Config("Could not determine config directory".to_string()))
        }
    }

    /// Create a default config file with comments
    pub fn create_default_config_file() -> Result<PathBuf> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, DEFAULT_CONFIG)?;
        Ok(path)
    }
}

const DEFAULT_CONFIG: &str = r#"# deckhand configuration file

[surface]
# Pad grid size
grid_rows = 8
grid_cols = 8

# Knobs with LED rings
knobs = 8

# Buttons per row under the display, and scene launch buttons
row_buttons = 8
scene_buttons = 8

# Text display: rows, cells per row, characters per cell
display_rows = 2
display_cells = 8
cell_width = 8

[midi]
# Port name substrings to connect to (first match wins)
input_port = "Grid Controller"
output_port = "Grid Controller"

# Client name announced to the MIDI system
client_name = "deckhand"

# MIDI channel the surface sends on (0-15)
channel = 0

# Minimum spacing between SysEx frames in milliseconds
sysex_spacing_ms = 2

# First pad note (bottom-left pad), first knob CC, first knob touch note
pad_note_base = 36
knob_cc_base = 71
knob_touch_note_base = 0

# Knob encoding: "absolute", "absolute14_bit", "relative_offset_binary",
# "relative_twos_complement" or "relative_signed_bit"
knob_encoding = "relative_twos_complement"

[timing]
# Knob movement re-check interval and idle timeout (ms)
knob_recheck_ms = 100
knob_timeout_ms = 200

# Hold time before a button counts as long-pressed (ms)
long_press_ms = 400

# How long notifications stay on the display (ms)
notification_ms = 2000

# Display/LED refresh tick (ms)
refresh_ms = 16

[behavior]
# Mode and view active after start-up
default_mode = "volume"
default_view = "play"

# Shift turns knobs into fine adjustment
fine_with_shift = true
"#;

/// MIDI transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiSettings {
    /// Input port name substring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_port: Option<String>,
    /// Output port name substring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_port: Option<String>,
    /// Client name announced to the MIDI system
    pub client_name: String,
    /// Channel the surface sends on (0-15)
    pub channel: u8,
    /// Minimum spacing between SysEx frames in milliseconds
    pub sysex_spacing_ms: u64,
    /// Note of the bottom-left pad
    pub pad_note_base: u8,
    /// CC of the first knob
    pub knob_cc_base: u8,
    /// Note sent when the first knob is touched
    pub knob_touch_note_base: u8,
    /// How knobs report movement
    pub knob_encoding: Encoding,
}

impl Default for MidiSettings {
    fn default() -> Self {
        Self {
            input_port: None,
            output_port: None,
            client_name: "deckhand".to_string(),
            channel: 0,
            sysex_spacing_ms: 2,
            pad_note_base: 36,
            knob_cc_base: 71,
            knob_touch_note_base: 0,
            knob_encoding: Encoding::RelativeTwosComplement,
        }
    }
}

impl MidiSettings {
    pub fn sysex_spacing(&self) -> Duration {
        Duration::from_millis(self.sysex_spacing_ms)
    }
}

/// Timer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub knob_recheck_ms: u64,
    pub knob_timeout_ms: u64,
    pub long_press_ms: u64,
    pub notification_ms: u64,
    pub refresh_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            knob_recheck_ms: 100,
            knob_timeout_ms: 200,
            long_press_ms: 400,
            notification_ms: 2000,
            refresh_ms: 16,
        }
    }
}

impl TimingSettings {
    pub fn knob_recheck(&self) -> Duration {
        Duration::from_millis(self.knob_recheck_ms)
    }

    pub fn knob_timeout(&self) -> Duration {
        Duration::from_millis(self.knob_timeout_ms)
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn notification(&self) -> Duration {
        Duration::from_millis(self.notification_ms)
    }

    pub fn refresh(&self) -> Duration {
        Duration::from_millis(self.refresh_ms.max(1))
    }
}

/// Start-up state and interaction tweaks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorSettings {
    /// Mode active after start-up
    pub default_mode: String,
    /// View active after start-up
    pub default_view: String,
    /// Shift turns knobs into fine adjustment
    pub fine_with_shift: bool,
}

impl Default for BehaviorSettings {
    fn default() -> Self {
        Self {
            default_mode: "volume".to_string(),
            default_view: "play".to_string(),
            fine_with_shift: true,
        }
    }
}
