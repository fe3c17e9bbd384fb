use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppSettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings path unavailable")]
    MissingSettingsPath,

    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, AppSettingsError>;

pub const MASK_STYLES: &[&str] = &["binary", "feathered"];

/// Persisted workspace configuration. Relative directories are resolved
/// against `data_root`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub data_root: PathBuf,
    pub furniture_dir: PathBuf,
    pub output_dir: PathBuf,
    pub mask_dir: PathBuf,
    pub min_height: u32,
    pub target_height: u32,
    pub jpeg_quality: u8,
    pub mask_style: String,
    pub normalize_stroke_background: bool,
    pub strict_stroke_dimensions: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            furniture_dir: PathBuf::from("furniture"),
            output_dir: PathBuf::from("output"),
            mask_dir: PathBuf::from("masks"),
            min_height: 512,
            target_height: 700,
            jpeg_quality: 95,
            mask_style: "binary".to_string(),
            normalize_stroke_background: true,
            strict_stroke_dimensions: false,
        }
    }
}

impl AppSettings {
    pub fn load() -> Result<Self> {
        load_impl()
    }

    pub fn save(&self) -> Result<()> {
        self.validate()?;
        save_impl(self)
    }

    /// Read settings from an explicit JSON file; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings: AppSettings = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_height == 0 {
            return Err(AppSettingsError::Invalid {
                field: "min_height",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.target_height < self.min_height {
            return Err(AppSettingsError::Invalid {
                field: "target_height",
                reason: format!(
                    "{} is below min_height {}",
                    self.target_height, self.min_height
                ),
            });
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(AppSettingsError::Invalid {
                field: "jpeg_quality",
                reason: format!("{} is outside 1..=100", self.jpeg_quality),
            });
        }
        if !MASK_STYLES.contains(&self.mask_style.as_str()) {
            return Err(AppSettingsError::Invalid {
                field: "mask_style",
                reason: format!("'{}' is not one of {}", self.mask_style, MASK_STYLES.join(", ")),
            });
        }
        Ok(())
    }

    pub fn furniture_path(&self) -> PathBuf {
        self.resolve(&self.furniture_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    pub fn mask_path(&self) -> PathBuf {
        self.resolve(&self.mask_dir)
    }

    fn resolve(&self, dir: &Path) -> PathBuf {
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.data_root.join(dir)
        }
    }
}

#[cfg(target_os = "windows")]
const REGISTRY_KEY: &str = "Software\\Roomstage";

#[cfg(target_os = "windows")]
fn load_impl() -> Result<AppSettings> {
    use winreg::enums::{HKEY_CURRENT_USER, KEY_READ};
    use winreg::RegKey;

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let key = hkcu.open_subkey_with_flags(REGISTRY_KEY, KEY_READ).ok();

    if let Some(key) = key {
        if let Ok(payload) = key.get_value::<String, _>("Settings") {
            let settings: AppSettings = serde_json::from_str(&payload)?;
            settings.validate()?;
            return Ok(settings);
        }
    }

    Ok(AppSettings::default())
}

#[cfg(target_os = "windows")]
fn save_impl(settings: &AppSettings) -> Result<()> {
    use winreg::enums::{HKEY_CURRENT_USER, KEY_WRITE};
    use winreg::RegKey;

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let (key, _) = hkcu.create_subkey_with_flags(REGISTRY_KEY, KEY_WRITE)?;
    let payload = serde_json::to_string(settings)?;
    key.set_value("Settings", &payload)?;
    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn load_impl() -> Result<AppSettings> {
    AppSettings::load_from(&settings_file_path()?)
}

#[cfg(not(target_os = "windows"))]
fn save_impl(settings: &AppSettings) -> Result<()> {
    settings.save_to(&settings_file_path()?)
}

#[cfg(target_os = "macos")]
fn settings_file_path() -> Result<PathBuf> {
    let base = directories::BaseDirs::new().ok_or(AppSettingsError::MissingSettingsPath)?;
    let mut path = base.home_dir().to_path_buf();
    path.push("Library");
    path.push("Preferences");
    path.push("com.roomstage");
    path.push("settings.json");
    Ok(path)
}

#[cfg(all(not(target_os = "macos"), not(target_os = "windows")))]
fn settings_file_path() -> Result<PathBuf> {
    let base = directories::BaseDirs::new().ok_or(AppSettingsError::MissingSettingsPath)?;
    let mut path = base.config_dir().to_path_buf();
    path.push("roomstage");
    path.push("settings.json");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let settings = AppSettings::load_from(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.min_height, 512);
        assert_eq!(settings.target_height, 700);
        assert_eq!(settings.jpeg_quality, 95);
        assert!(settings.normalize_stroke_background);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"jpeg_quality": 80, "mask_style": "feathered"}"#).unwrap();

        let settings = AppSettings::load_from(&path).unwrap();
        assert_eq!(settings.jpeg_quality, 80);
        assert_eq!(settings.mask_style, "feathered");
        assert_eq!(settings.min_height, 512);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = AppSettings {
            data_root: dir.path().to_path_buf(),
            strict_stroke_dimensions: true,
            ..AppSettings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(AppSettings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn rejects_inconsistent_values() {
        let low_target = AppSettings {
            target_height: 300,
            ..AppSettings::default()
        };
        assert!(matches!(
            low_target.validate(),
            Err(AppSettingsError::Invalid { field: "target_height", .. })
        ));

        let bad_style = AppSettings {
            mask_style: "soft".into(),
            ..AppSettings::default()
        };
        assert!(bad_style.validate().is_err());

        let dir = tempdir().unwrap();
        assert!(bad_style.save_to(&dir.path().join("s.json")).is_err());
    }

    #[test]
    fn relative_dirs_resolve_under_data_root() {
        let settings = AppSettings {
            data_root: PathBuf::from("/srv/roomstage"),
            output_dir: PathBuf::from("/tmp/out"),
            ..AppSettings::default()
        };
        assert_eq!(settings.furniture_path(), PathBuf::from("/srv/roomstage/furniture"));
        assert_eq!(settings.mask_path(), PathBuf::from("/srv/roomstage/masks"));
        assert_eq!(settings.output_path(), PathBuf::from("/tmp/out"));
    }
}
