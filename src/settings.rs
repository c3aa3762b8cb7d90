//! Highlight appearance settings
//!
//! Persisted in `~/.config/word-highlight/settings.yaml`:
//!
//! ```yaml
//! colors: ["#FFB74D", "#81C784"]
//! foreground_color: "#FFFFFF"
//! ```
//!
//! [`SharedSettings`] is the process-wide handle passed to every session. It
//! holds the sanitized [`Appearance`] behind a read-write lock and broadcasts
//! each effective change to its subscribers.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::palette::{
    normalize_hex, sanitize_foreground, sanitize_palette, Color, DEFAULT_FOREGROUND,
    DEFAULT_PALETTE,
};

/// Settings as stored on disk (raw `#RRGGBB` strings)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightSettings {
    /// Highlight palette, assigned to terms by insertion order
    #[serde(default = "default_colors")]
    pub colors: Vec<String>,
    /// Text color drawn over highlights
    #[serde(default = "default_foreground")]
    pub foreground_color: String,
}

fn default_colors() -> Vec<String> {
    DEFAULT_PALETTE.iter().map(Color::to_hex).collect()
}

fn default_foreground() -> String {
    DEFAULT_FOREGROUND.to_hex()
}

impl Default for HighlightSettings {
    fn default() -> Self {
        Self {
            colors: default_colors(),
            foreground_color: default_foreground(),
        }
    }
}

impl HighlightSettings {
    /// Load settings from the default location, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::settings_file() else {
            tracing::debug!("No config directory available, using default settings");
            return Self::default();
        };

        if !path.exists() {
            tracing::debug!(
                "Settings file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => {
                tracing::info!("Loaded highlight settings from {}", path.display());
                settings
            }
            Err(e) => {
                tracing::warn!("{:#}", e);
                Self::default()
            }
        }
    }

    /// Load and sanitize settings from a specific file
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings at {}", path.display()))?;
        let settings: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse settings at {}", path.display()))?;
        Ok(settings.sanitized())
    }

    /// Save settings to the default location
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = crate::config_paths::settings_file()
            .context("No config directory available")?;
        self.save_to(&path)
    }

    /// Save settings to a specific file
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize settings")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;

        tracing::info!("Saved highlight settings to {}", path.display());
        Ok(())
    }

    /// Normalize every color, dropping malformed ones and filling in defaults
    pub fn sanitized(&self) -> Self {
        let colors: Vec<String> = self
            .colors
            .iter()
            .filter_map(|c| normalize_hex(c))
            .collect();
        Self {
            colors: if colors.is_empty() {
                default_colors()
            } else {
                colors
            },
            foreground_color: normalize_hex(&self.foreground_color)
                .unwrap_or_else(default_foreground),
        }
    }

    /// Resolve into parsed colors
    pub fn appearance(&self) -> Appearance {
        Appearance {
            palette: sanitize_palette(&self.colors),
            foreground: sanitize_foreground(&self.foreground_color),
        }
    }
}

/// Resolved, always-valid appearance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appearance {
    /// Never empty
    pub palette: Vec<Color>,
    pub foreground: Color,
}

impl Default for Appearance {
    fn default() -> Self {
        HighlightSettings::default().appearance()
    }
}

impl Appearance {
    /// Color for the term with the given insertion order
    pub fn color_for(&self, order: u64) -> Color {
        crate::palette::color_for(order, &self.palette)
    }
}

/// Identifier returned by [`SharedSettings::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

type Listener = Arc<dyn Fn(&Appearance) + Send + Sync>;

struct Inner {
    current: RwLock<Arc<Appearance>>,
    subscribers: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

/// Shared, observable appearance settings
///
/// Cloning is cheap; all clones observe the same state.
#[derive(Clone)]
pub struct SharedSettings {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SharedSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSettings")
            .field("current", &*self.appearance())
            .field("subscribers", &self.inner.subscribers.lock().len())
            .finish()
    }
}

impl Default for SharedSettings {
    fn default() -> Self {
        Self::new(&HighlightSettings::default())
    }
}

impl SharedSettings {
    pub fn new(settings: &HighlightSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                current: RwLock::new(Arc::new(settings.appearance())),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Load from the default settings file (defaults on any failure)
    pub fn load() -> Self {
        Self::new(&HighlightSettings::load())
    }

    /// Consistent snapshot of the current appearance
    pub fn appearance(&self) -> Arc<Appearance> {
        Arc::clone(&self.inner.current.read())
    }

    pub fn colors(&self) -> Vec<Color> {
        self.appearance().palette.clone()
    }

    pub fn foreground(&self) -> Color {
        self.appearance().foreground
    }

    /// Current settings in their persisted form
    pub fn settings(&self) -> HighlightSettings {
        let appearance = self.appearance();
        HighlightSettings {
            colors: appearance.palette.iter().map(Color::to_hex).collect(),
            foreground_color: appearance.foreground.to_hex(),
        }
    }

    /// Replace the palette; malformed entries are dropped
    pub fn set_colors<S: AsRef<str>>(&self, colors: &[S]) {
        let palette = sanitize_palette(colors);
        self.modify(|current| Appearance {
            palette,
            foreground: current.foreground,
        });
    }

    /// Replace the foreground color; malformed input resets to the default
    pub fn set_foreground(&self, color: &str) {
        let foreground = sanitize_foreground(color);
        self.modify(|current| Appearance {
            palette: current.palette.clone(),
            foreground,
        });
    }

    /// Replace everything at once, notifying at most once
    pub fn update(&self, settings: &HighlightSettings) {
        let next = settings.appearance();
        self.modify(|_| next);
    }

    /// Register a callback for appearance changes
    ///
    /// Callbacks run on the thread that made the change, after the settings
    /// lock has been released, so they may read the settings again.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Appearance) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.subscribers.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a callback; returns whether it was registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Save the current settings to the default location
    pub fn persist(&self) -> anyhow::Result<()> {
        self.settings().save()
    }

    /// Derive the next appearance from the current one under the write lock
    ///
    /// Subscribers are notified after the lock is released.
    fn modify(&self, derive: impl FnOnce(&Appearance) -> Appearance) {
        let snapshot = {
            let mut current = self.inner.current.write();
            let next = derive(&current);
            if **current == next {
                return;
            }
            *current = Arc::new(next);
            Arc::clone(&current)
        };

        let listeners: Vec<Listener> = self
            .inner
            .subscribers
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        tracing::debug!(
            "Highlight settings changed ({} colors), notifying {} subscribers",
            snapshot.palette.len(),
            listeners.len()
        );

        for listener in listeners {
            listener(&snapshot);
        }
    }
}
