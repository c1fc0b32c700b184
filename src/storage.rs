use crate::config::Settings;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.yml";
const THEME_FILE: &str = "theme";

/// Where the client keeps its few local files. Notes are never stored here;
/// the remote service owns them.
#[derive(Debug, Clone)]
pub struct AppDirs {
    pub config_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl AppDirs {
    /// `home` overrides the platform directories, keeping everything under
    /// one root.
    pub fn locate(home: Option<&Path>) -> Result<AppDirs> {
        if let Some(home) = home {
            return Ok(AppDirs {
                config_dir: home.to_path_buf(),
                log_dir: home.join("logs"),
            });
        }
        let dirs = ProjectDirs::from("", "", "notedesk").context("locating config directory")?;
        Ok(AppDirs {
            config_dir: dirs.config_dir().to_path_buf(),
            log_dir: dirs.data_local_dir().join("logs"),
        })
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn theme_path(&self) -> PathBuf {
        self.config_dir.join(THEME_FILE)
    }
}

/// Reads `config.yml`, writing the defaults on first run so there is a file
/// to edit.
pub fn load_settings(dirs: &AppDirs) -> Result<Settings> {
    let path = dirs.config_path();
    if path.exists() {
        let data = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
        let settings = Settings::from_yaml(&data).context("parsing config file")?;
        Ok(settings)
    } else {
        let settings = Settings::default();
        save_settings(dirs, &settings)?;
        Ok(settings)
    }
}

pub fn save_settings(dirs: &AppDirs, settings: &Settings) -> Result<()> {
    let path = dirs.config_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = settings.to_yaml().context("serializing settings")?;
    fs::write(&path, serialized).with_context(|| format!("writing {:?}", path))?;
    Ok(())
}
