//! Persisted light/dark theme preference.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use crate::CorralError;
use crate::session::{LocalStore, THEME_KEY};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThemePreference {
    Dark,
    #[default]
    Light,
}

impl ThemePreference {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemePreference::Dark => "dark",
            ThemePreference::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ThemePreference::Dark => ThemePreference::Light,
            ThemePreference::Light => ThemePreference::Dark,
        }
    }
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemePreference {
    type Err = CorralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dark" => Ok(ThemePreference::Dark),
            "light" => Ok(ThemePreference::Light),
            other => Err(CorralError::Configuration(format!(
                "unknown theme '{other}' (expected \"dark\" or \"light\")"
            ))),
        }
    }
}

/// Theme preference stored under `"theme"` next to the session snapshot.
pub struct ThemeSettings {
    store: Arc<dyn LocalStore>,
    current: watch::Sender<ThemePreference>,
}

impl ThemeSettings {
    /// Read the stored preference (`"dark"` → dark, anything else → light)
    /// and write it back in normalised form.
    pub fn load(store: Arc<dyn LocalStore>) -> Self {
        let initial = match store.get(THEME_KEY) {
            Ok(Some(value)) if value == "dark" => ThemePreference::Dark,
            Ok(_) => ThemePreference::Light,
            Err(e) => {
                warn!(error = %e, "failed to read theme preference");
                ThemePreference::Light
            }
        };
        let (current, _) = watch::channel(initial);
        let settings = Self { store, current };
        settings.persist(initial);
        settings
    }

    pub fn current(&self) -> ThemePreference {
        *self.current.borrow()
    }

    pub fn is_dark(&self) -> bool {
        self.current() == ThemePreference::Dark
    }

    pub fn set(&self, theme: ThemePreference) {
        self.persist(theme);
        self.current.send_replace(theme);
    }

    pub fn toggle(&self) -> ThemePreference {
        let next = self.current().toggled();
        self.set(next);
        next
    }

    pub fn subscribe(&self) -> watch::Receiver<ThemePreference> {
        self.current.subscribe()
    }

    fn persist(&self, theme: ThemePreference) {
        if let Err(e) = self.store.set(THEME_KEY, theme.as_str()) {
            warn!(error = %e, theme = %theme, "failed to persist theme preference");
        }
    }
}
