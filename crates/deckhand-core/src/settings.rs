//! Persisted user preferences.
//!
//! Preferences are an opaque key → primitive value store. The engine reads
//! them at start-up and writes them back whenever the user changes one on the
//! surface (scale, ribbon mode, accent).
//!
//! The file-backed store keeps its values in TOML at:
//! - Linux: `~/.config/deckhand/preferences.toml`
//! - macOS: `~/Library/Application Support/deckhand/preferences.toml`
//! - Windows: `%APPDATA%\deckhand\preferences.toml`

use crate::error::{Error, Result};
use crate::scales::{Scale, Scales};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Preference keys
pub mod keys {
    pub const SCALE: &str = "scale";
    pub const SCALE_BASE: &str = "scale_base";
    pub const SCALE_IN_KEY: &str = "scale_in_key";
    pub const RIBBON_MODE: &str = "ribbon_mode";
    pub const ACCENT: &str = "accent";
    pub const ACCENT_VELOCITY: &str = "accent_velocity";
}

/// A primitive preference value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Int(value)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        SettingValue::Float(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(value.to_string())
    }
}

/// Key/value preference storage.
pub trait SettingsStore {
    /// Stored value for a key
    fn get(&self, key: &str) -> Option<SettingValue>;

    /// Store a value (in memory; see [`SettingsStore::persist`])
    fn set(&mut self, key: &str, value: SettingValue);

    /// Write pending changes to durable storage
    fn persist(&mut self) -> Result<()> {
        Ok(())
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(SettingValue::Bool(value)) => value,
            _ => default,
        }
    }

    fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.get(key) {
            Some(SettingValue::Int(value)) => value,
            Some(SettingValue::Float(value)) => value as i64,
            _ => default,
        }
    }

    fn get_text(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(SettingValue::Text(value)) => Some(value),
            _ => None,
        }
    }
}

/// In-memory store (tests, simulation)
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: BTreeMap<String, SettingValue>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<SettingValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: SettingValue) {
        self.values.insert(key.to_string(), value);
    }
}

/// Store backed by a TOML file
#[derive(Debug, Clone)]
pub struct TomlSettings {
    path: PathBuf,
    values: BTreeMap<String, SettingValue>,
    dirty: bool,
}

impl TomlSettings {
    /// Open the store at `path`. A missing file yields an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            values,
            dirty: false,
        })
    }

    /// Open the store at the default location
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    /// Default preferences file path
    pub fn default_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "deckhand") {
            Ok(proj_dirs.config_dir().join("preferences.toml"))
        } else {
            Err(Error::Settings(
                "Could not determine preferences directory".to_string(),
            ))
        }
    }

    /// File this store persists to
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for TomlSettings {
    fn get(&self, key: &str) -> Option<SettingValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: SettingValue) {
        if self.values.get(key) != Some(&value) {
            self.values.insert(key.to_string(), value);
            self.dirty = true;
        }
    }

    fn persist(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&self.values)?;
        fs::write(&self.path, content)?;
        self.dirty = false;
        log::debug!("[SETTINGS] Saved preferences to {:?}", self.path);
        Ok(())
    }
}

/// What the pitch bend ribbon controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RibbonMode {
    /// 14-bit pitch bend
    #[default]
    PitchBend,
    /// Modulation wheel (CC 1)
    Cc1,
    /// Expression (CC 11)
    Cc11,
    /// Volume of the selected track
    Volume,
}

impl RibbonMode {
    pub const ALL: [RibbonMode; 4] = [
        RibbonMode::PitchBend,
        RibbonMode::Cc1,
        RibbonMode::Cc11,
        RibbonMode::Volume,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RibbonMode::PitchBend => "pitch_bend",
            RibbonMode::Cc1 => "cc1",
            RibbonMode::Cc11 => "cc11",
            RibbonMode::Volume => "volume",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }

    /// The next mode in cycle order
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

/// Default velocity used when accent is on
pub const DEFAULT_ACCENT_VELOCITY: u8 = 127;

/// Typed access to the preferences the engine uses.
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub ribbon_mode: RibbonMode,
    /// Play every pad at `accent_velocity`
    pub accent: bool,
    pub accent_velocity: u8,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            ribbon_mode: RibbonMode::default(),
            accent: false,
            accent_velocity: DEFAULT_ACCENT_VELOCITY,
        }
    }
}

impl Preferences {
    /// Read the preferences, falling back to defaults for missing keys.
    pub fn load(store: &dyn SettingsStore) -> Self {
        let ribbon_mode = store
            .get_text(keys::RIBBON_MODE)
            .and_then(|name| RibbonMode::from_name(&name))
            .unwrap_or_default();
        Self {
            ribbon_mode,
            accent: store.get_bool(keys::ACCENT, false),
            accent_velocity: store
                .get_int(keys::ACCENT_VELOCITY, DEFAULT_ACCENT_VELOCITY as i64)
                .clamp(1, 127) as u8,
        }
    }

    /// Write the preferences to the store (not persisted yet).
    pub fn store(&self, store: &mut dyn SettingsStore) {
        store.set(keys::RIBBON_MODE, self.ribbon_mode.as_str().into());
        store.set(keys::ACCENT, self.accent.into());
        store.set(keys::ACCENT_VELOCITY, (self.accent_velocity as i64).into());
    }

    /// Velocity a pad hit plays with
    pub fn velocity(&self, velocity: u8) -> u8 {
        if self.accent && velocity > 0 {
            self.accent_velocity
        } else {
            velocity
        }
    }
}

/// Apply the stored scale preferences to `scales`.
pub fn load_scales(store: &dyn SettingsStore, scales: &mut Scales) {
    if let Some(scale) = store
        .get_text(keys::SCALE)
        .and_then(|name| Scale::from_name(&name))
    {
        scales.scale = scale;
    }
    scales.base = store.get_int(keys::SCALE_BASE, scales.base as i64).rem_euclid(12) as u8;
    scales.in_key = store.get_bool(keys::SCALE_IN_KEY, scales.in_key);
}

/// Store the scale preferences of `scales` (not persisted yet).
pub fn store_scales(store: &mut dyn SettingsStore, scales: &Scales) {
    store.set(keys::SCALE, scales.scale.name().into());
    store.set(keys::SCALE_BASE, (scales.base as i64).into());
    store.set(keys::SCALE_IN_KEY, scales.in_key.into());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_typed_access() {
        let mut store = MemorySettings::new();
        assert!(store.get_bool(keys::ACCENT, true));
        store.set(keys::ACCENT, false.into());
        store.set(keys::ACCENT_VELOCITY, 90i64.into());
        assert!(!store.get_bool(keys::ACCENT, true));
        assert_eq!(store.get_int(keys::ACCENT_VELOCITY, 0), 90);
        // wrong type falls back to the default
        assert_eq!(store.get_text(keys::ACCENT), None);
    }

    #[test]
    fn test_toml_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.toml");

        let mut store = TomlSettings::open(&path).unwrap();
        let scales = Scales {
            scale: Scale::Dorian,
            base: 2,
            in_key: false,
            ..Scales::default()
        };
        store_scales(&mut store, &scales);
        store.set(keys::RIBBON_MODE, RibbonMode::Cc11.as_str().into());
        store.persist().unwrap();
        assert!(path.exists());

        let reopened = TomlSettings::open(&path).unwrap();
        let mut loaded = Scales::default();
        load_scales(&reopened, &mut loaded);
        assert_eq!(loaded.scale, Scale::Dorian);
        assert_eq!(loaded.base, 2);
        assert!(!loaded.in_key);
        assert_eq!(Preferences::load(&reopened).ribbon_mode, RibbonMode::Cc11);
    }

    #[test]
    fn test_preferences_roundtrip_through_store() {
        let mut store = MemorySettings::new();
        let prefs = Preferences {
            ribbon_mode: RibbonMode::Volume,
            accent: true,
            accent_velocity: 110,
        };
        prefs.store(&mut store);
        assert_eq!(Preferences::load(&store), prefs);
        assert_eq!(prefs.velocity(20), 110);
        assert_eq!(prefs.velocity(0), 0);
    }

    #[test]
    fn test_ribbon_mode_cycles() {
        assert_eq!(RibbonMode::PitchBend.next(), RibbonMode::Cc1);
        assert_eq!(RibbonMode::Volume.next(), RibbonMode::PitchBend);
        assert_eq!(RibbonMode::from_name("cc1"), Some(RibbonMode::Cc1));
    }
}
