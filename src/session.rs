//! One workspace's highlighting, wired together
//!
//! ```text
//! host lifecycle ──► BufferLifecycleTracker ──► HighlightRegistry ◄── ConfigurationBridge ◄── SharedSettings
//! host edits ─────► RescanHandle ──► RescanScheduler (worker) ──┘
//! ```
//!
//! Closing the session (or dropping it) detaches from the host, then releases
//! every overlay.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::bridge::ConfigurationBridge;
use crate::host::{BufferId, TextHost, WorkspaceId};
use crate::lifecycle::BufferLifecycleTracker;
use crate::registry::{HighlightInfo, HighlightRegistry, ToggleResult};
use crate::scheduler::{RescanScheduler, RescanTarget, RESCAN_DEBOUNCE_MS};
use crate::settings::SharedSettings;
use crate::util::{word_at, word_for_selection};

pub struct HighlightSession {
    host: Arc<dyn TextHost>,
    registry: Arc<HighlightRegistry>,
    tracker: Arc<BufferLifecycleTracker>,
    bridge: ConfigurationBridge,
    scheduler: RescanScheduler,
    closed: AtomicBool,
}

impl HighlightSession {
    /// Start highlighting in `workspace` with the default rescan delay
    pub fn attach(
        host: Arc<dyn TextHost>,
        settings: SharedSettings,
        workspace: WorkspaceId,
    ) -> anyhow::Result<Self> {
        Self::attach_with_delay(
            host,
            settings,
            workspace,
            Duration::from_millis(RESCAN_DEBOUNCE_MS),
        )
    }

    pub fn attach_with_delay(
        host: Arc<dyn TextHost>,
        settings: SharedSettings,
        workspace: WorkspaceId,
        delay: Duration,
    ) -> anyhow::Result<Self> {
        let registry = Arc::new(HighlightRegistry::new(
            workspace,
            Arc::clone(&host),
            settings.clone(),
        ));

        let target: Arc<dyn RescanTarget> = registry.clone();
        let scheduler = RescanScheduler::with_delay(&target, delay)
            .context("Failed to start rescan worker")?;

        let tracker =
            BufferLifecycleTracker::new(Arc::clone(&host), registry.clone(), scheduler.handle());
        tracker.attach();

        let bridge = ConfigurationBridge::connect(&settings, &registry);

        tracing::info!("Highlight session attached to workspace {}", workspace.0);

        Ok(Self {
            host,
            registry,
            tracker,
            bridge,
            scheduler,
            closed: AtomicBool::new(false),
        })
    }

    pub fn workspace(&self) -> WorkspaceId {
        self.registry.workspace()
    }

    pub fn registry(&self) -> &Arc<HighlightRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &SharedSettings {
        self.registry.settings()
    }

    pub fn tracked_buffers(&self) -> Vec<BufferId> {
        self.tracker.tracked_buffers()
    }

    pub fn rescan_delay(&self) -> Duration {
        self.scheduler.delay()
    }

    // =========================================================================
    // UI operations
    // =========================================================================

    /// Toggle a term; a closed session always reports [`ToggleResult::Noop`]
    pub fn toggle(&self, term: &str) -> ToggleResult {
        if self.is_closed() {
            return ToggleResult::Noop;
        }
        self.registry.toggle(term)
    }

    /// Toggle the word under the caret, or the selected word
    ///
    /// A selection is used only if it is made purely of word characters;
    /// otherwise the word around `caret` is taken. Nothing to toggle is
    /// [`ToggleResult::Noop`].
    pub fn toggle_at(
        &self,
        buffer: BufferId,
        selection: Option<Range<usize>>,
        caret: usize,
    ) -> ToggleResult {
        let Some(text) = self.host.buffer_text(buffer) else {
            return ToggleResult::Noop;
        };
        let word = match selection {
            Some(selection) if selection.start != selection.end => {
                word_for_selection(&text, selection, caret)
            }
            _ => word_at(&text, caret),
        };
        match word {
            Some(word) => self.toggle(&word),
            None => ToggleResult::Noop,
        }
    }

    pub fn remove(&self, term: &str) -> bool {
        self.registry.remove(term)
    }

    pub fn clear_all(&self) {
        self.registry.clear_all();
    }

    pub fn snapshot(&self) -> Vec<HighlightInfo> {
        self.registry.snapshot()
    }

    pub fn has_any(&self) -> bool {
        self.registry.has_any()
    }

    /// Detach from the host and release every overlay; later calls do nothing
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.settings().unsubscribe(self.bridge.subscription());
        self.tracker.detach();
        self.registry.close();
        tracing::info!("Highlight session closed for workspace {}", self.workspace().0);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for HighlightSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;

    const WS: WorkspaceId = WorkspaceId(7);

    fn session(host: &Arc<MemoryHost>) -> HighlightSession {
        HighlightSession::attach_with_delay(
            host.clone(),
            SharedSettings::default(),
            WS,
            Duration::from_millis(20),
        )
        .unwrap()
    }

    #[test]
    fn test_toggle_at_caret() {
        let host = Arc::new(MemoryHost::new());
        let buffer = host.open_buffer(WS, "let value = value + 1;");
        let session = session(&host);

        assert_eq!(session.toggle_at(buffer, None, 6), ToggleResult::Added);
        assert_eq!(host.overlay_ranges(buffer), vec![4..9, 12..17]);
        assert_eq!(session.toggle_at(buffer, None, 14), ToggleResult::Removed);
        assert_eq!(host.overlay_count(buffer), 0);
    }

    #[test]
    fn test_toggle_at_prefers_word_selection() {
        let host = Arc::new(MemoryHost::new());
        let buffer = host.open_buffer(WS, "alpha beta");
        let session = session(&host);

        assert_eq!(session.toggle_at(buffer, Some(6..10), 0), ToggleResult::Added);
        assert!(session.registry().contains("beta"));
    }

    #[test]
    fn test_toggle_at_on_whitespace_is_noop() {
        let host = Arc::new(MemoryHost::new());
        let buffer = host.open_buffer(WS, "a  b");
        let session = session(&host);

        assert_eq!(session.toggle_at(buffer, None, 2), ToggleResult::Noop);
        assert_eq!(
            session.toggle_at(BufferId(9999), None, 0),
            ToggleResult::Noop
        );
    }

    #[test]
    fn test_close_releases_and_detaches() {
        let host = Arc::new(MemoryHost::new());
        let buffer = host.open_buffer(WS, "x y x");
        let session = session(&host);
        session.toggle("x");
        assert_eq!(host.overlay_count(buffer), 2);

        session.close();
        assert!(session.is_closed());
        assert_eq!(host.overlay_count(buffer), 0);
        assert_eq!(host.lifecycle_listener_count(), 0);
        assert_eq!(host.change_listener_count(buffer), 0);

        // Closing twice is harmless, and a closed session ignores toggles
        session.close();
        assert_eq!(session.toggle("x"), ToggleResult::Noop);
        assert_eq!(host.overlay_count(buffer), 0);
    }

    #[test]
    fn test_drop_releases_overlays() {
        let host = Arc::new(MemoryHost::new());
        let buffer = host.open_buffer(WS, "x");
        {
            let session = session(&host);
            session.toggle("x");
            assert_eq!(host.overlay_count(buffer), 1);
        }
        assert_eq!(host.overlay_count(buffer), 0);
        assert_eq!(host.stats().rejected, 0);
    }
}
