use anyhow::{Context, Result};
use log::{info, warn};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(&self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown theme: {0}")]
pub struct UnknownTheme(String);

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(UnknownTheme(other.to_string())),
        }
    }
}

/// The persisted light/dark preference. One instance is created at startup
/// and handed to whoever renders; it is not tied to the note state.
#[derive(Debug, Clone)]
pub struct ThemePreference {
    theme: Theme,
    path: PathBuf,
}

impl ThemePreference {
    /// Reads the stored value. A missing or unreadable file means light.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let theme = match fs::read_to_string(&path) {
            Ok(raw) => raw.parse().unwrap_or_else(|err: UnknownTheme| {
                warn!("event=theme_invalid path={} error={}", path.display(), err);
                Theme::default()
            }),
            Err(_) => Theme::default(),
        };
        ThemePreference { theme, path }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn toggle(&mut self) -> Result<Theme> {
        self.set(self.theme.toggled())?;
        Ok(self.theme)
    }

    pub fn set(&mut self, theme: Theme) -> Result<()> {
        self.theme = theme;
        self.persist()?;
        info!("event=theme_changed theme={}", theme);
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
        }
        fs::write(&self.path, self.theme.as_str())
            .with_context(|| format!("writing {:?}", self.path))?;
        Ok(())
    }
}
