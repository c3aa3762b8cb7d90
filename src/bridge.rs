//! Settings → registry re-render
//!
//! Palette or foreground changes re-render every highlight in place. Each term
//! keeps its order, so it picks the color at the same position in the new
//! palette.

use std::sync::{Arc, Weak};

use crate::registry::HighlightRegistry;
use crate::settings::{Appearance, SharedSettings, SubscriptionId};

/// Live subscription; dropping it stops re-rendering
pub struct ConfigurationBridge {
    settings: SharedSettings,
    subscription: SubscriptionId,
}

impl ConfigurationBridge {
    pub fn connect(settings: &SharedSettings, registry: &Arc<HighlightRegistry>) -> Self {
        let weak: Weak<HighlightRegistry> = Arc::downgrade(registry);
        let subscription = settings.subscribe(move |_: &Appearance| {
            if let Some(registry) = weak.upgrade() {
                registry.on_configuration_changed();
            }
        });
        tracing::debug!(
            "Configuration bridge connected for workspace {}",
            registry.workspace().0
        );

        Self {
            settings: settings.clone(),
            subscription,
        }
    }

    pub fn subscription(&self) -> SubscriptionId {
        self.subscription
    }
}

impl Drop for ConfigurationBridge {
    fn drop(&mut self) {
        self.settings.unsubscribe(self.subscription);
    }
}
