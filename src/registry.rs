//! Registry of highlighted terms and their overlays
//!
//! The registry owns one [`HighlightEntry`] per term, in insertion order. Each
//! entry remembers the overlay handles it created in every open buffer.
//!
//! ## Locking
//!
//! ```text
//! state lock  (term map + order counter)   held for map mutation only
//!   └─ released before any host call
//! entry lock  (one entry's overlay map)    held for one apply/dispose pass
//! ```
//!
//! The state lock is never taken while an entry lock is held, and only one
//! entry lock is held at a time, so the two cannot deadlock. All overlay I/O
//! happens under an entry lock at most.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use ropey::Rope;

use crate::host::{BufferId, HostError, OverlayId, OverlayStyle, TextHost, WorkspaceId};
use crate::matcher::WordMatcher;
use crate::palette::Color;
use crate::scheduler::RescanTarget;
use crate::settings::SharedSettings;

/// Outcome of [`HighlightRegistry::toggle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleResult {
    Added,
    Removed,
    /// Blank input, nothing changed
    Noop,
}

/// Read-only view of one highlighted term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightInfo {
    pub term: String,
    pub color: Color,
}

#[derive(Default)]
struct EntryOverlays {
    by_buffer: HashMap<BufferId, Vec<OverlayId>>,
    /// Set once the entry left the registry; later applies must not add overlays
    disposed: bool,
}

/// One highlighted term
struct HighlightEntry {
    term: String,
    order: u64,
    matcher: WordMatcher,
    overlays: Mutex<EntryOverlays>,
}

impl HighlightEntry {
    fn new(term: &str, order: u64, matcher: WordMatcher) -> Self {
        Self {
            term: term.to_string(),
            order,
            matcher,
            overlays: Mutex::new(EntryOverlays::default()),
        }
    }

    /// Drop the handles for a buffer the host already discarded
    fn forget(&self, buffer: BufferId) {
        self.overlays.lock().by_buffer.remove(&buffer);
    }
}

struct RegistryState {
    entries: IndexMap<String, Arc<HighlightEntry>>,
    next_order: u64,
}

enum Change {
    Add(Arc<HighlightEntry>),
    Remove(Arc<HighlightEntry>),
}

/// Highlighted terms of one workspace
pub struct HighlightRegistry {
    workspace: WorkspaceId,
    host: Arc<dyn TextHost>,
    settings: SharedSettings,
    state: Mutex<RegistryState>,
}

impl HighlightRegistry {
    pub fn new(workspace: WorkspaceId, host: Arc<dyn TextHost>, settings: SharedSettings) -> Self {
        Self {
            workspace,
            host,
            settings,
            state: Mutex::new(RegistryState {
                entries: IndexMap::new(),
                next_order: 0,
            }),
        }
    }

    pub fn workspace(&self) -> WorkspaceId {
        self.workspace
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    // =========================================================================
    // Term set
    // =========================================================================

    /// Add `term` if absent, remove it if present
    ///
    /// The term is trimmed first; blank input is a [`ToggleResult::Noop`].
    pub fn toggle(&self, term: &str) -> ToggleResult {
        let term = term.trim();
        if term.is_empty() {
            return ToggleResult::Noop;
        }

        // Compiled before locking so the critical section stays map-only
        let matcher = match WordMatcher::new(term) {
            Ok(matcher) => matcher,
            Err(e) => {
                tracing::warn!("Cannot highlight {:?}: {}", term, e);
                return ToggleResult::Noop;
            }
        };

        let change = {
            let mut state = self.state.lock();
            match state.entries.shift_remove(term) {
                Some(existing) => Change::Remove(existing),
                None => {
                    let order = state.next_order;
                    state.next_order += 1;
                    let entry = Arc::new(HighlightEntry::new(term, order, matcher));
                    state.entries.insert(term.to_string(), Arc::clone(&entry));
                    Change::Add(entry)
                }
            }
        };

        match change {
            Change::Add(entry) => {
                tracing::debug!("Highlighting {:?} (order {})", entry.term, entry.order);
                self.apply_to_all_buffers(&entry);
                ToggleResult::Added
            }
            Change::Remove(entry) => {
                tracing::debug!("Removing highlight {:?}", entry.term);
                self.dispose_entry(&entry);
                ToggleResult::Removed
            }
        }
    }

    /// Remove one term; returns whether it was highlighted
    pub fn remove(&self, term: &str) -> bool {
        let removed = self.state.lock().entries.shift_remove(term.trim());
        match removed {
            Some(entry) => {
                self.dispose_entry(&entry);
                true
            }
            None => false,
        }
    }

    /// Remove every term and release all overlays
    pub fn clear_all(&self) {
        let removed = std::mem::take(&mut self.state.lock().entries);
        if !removed.is_empty() {
            tracing::debug!("Clearing {} highlights", removed.len());
        }
        for entry in removed.values() {
            self.dispose_entry(entry);
        }
    }

    /// Terms and their colors in insertion order
    pub fn snapshot(&self) -> Vec<HighlightInfo> {
        let appearance = self.settings.appearance();
        let state = self.state.lock();
        state
            .entries
            .values()
            .map(|entry| HighlightInfo {
                term: entry.term.clone(),
                color: appearance.color_for(entry.order),
            })
            .collect()
    }

    pub fn has_any(&self) -> bool {
        !self.state.lock().entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_any()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.state.lock().entries.contains_key(term.trim())
    }

    /// Buffers in which `term` currently holds overlays, sorted
    pub fn highlighted_buffers(&self, term: &str) -> Option<Vec<BufferId>> {
        let entry = self.state.lock().entries.get(term.trim()).cloned()?;
        let mut buffers: Vec<BufferId> = entry.overlays.lock().by_buffer.keys().copied().collect();
        buffers.sort();
        Some(buffers)
    }

    // =========================================================================
    // Buffer events
    // =========================================================================

    /// Apply every current term to a newly opened buffer
    pub fn on_buffer_opened(&self, buffer: BufferId) {
        self.rescan_buffer(buffer);
    }

    /// Forget a closed buffer without issuing overlay removals
    pub fn on_buffer_closed(&self, buffer: BufferId) {
        for entry in self.entries() {
            entry.forget(buffer);
        }
    }

    /// Re-apply every term to one buffer
    pub fn rescan_buffer(&self, buffer: BufferId) {
        let entries = self.entries();
        if entries.is_empty() {
            return;
        }

        if !self.host.is_open(buffer) {
            tracing::debug!("Skipping rescan of closed buffer {}", buffer.0);
            for entry in &entries {
                entry.forget(buffer);
            }
            return;
        }

        for entry in &entries {
            self.apply_to_buffer(entry, buffer);
        }
    }

    /// Re-render everything after a palette or foreground change
    pub fn on_configuration_changed(&self) {
        let entries = self.entries();
        if entries.is_empty() {
            return;
        }

        for buffer in self.host.open_buffers(self.workspace) {
            for entry in &entries {
                self.apply_to_buffer(entry, buffer);
            }
        }
    }

    /// Tear down: release every overlay
    pub fn close(&self) {
        self.clear_all();
    }

    // =========================================================================
    // Overlay application
    // =========================================================================

    fn entries(&self) -> Vec<Arc<HighlightEntry>> {
        self.state.lock().entries.values().cloned().collect()
    }

    fn apply_to_all_buffers(&self, entry: &HighlightEntry) {
        for buffer in self.host.open_buffers(self.workspace) {
            self.apply_to_buffer(entry, buffer);
        }
    }

    /// Replace an entry's overlays in one buffer with fresh matches
    ///
    /// Text and colors are read under the entry lock, so whichever pass
    /// runs last for this entry also saw the newest of both.
    fn apply_to_buffer(&self, entry: &HighlightEntry, buffer: BufferId) {
        let mut overlays = entry.overlays.lock();
        if overlays.disposed {
            return;
        }

        let Some(rope) = self.host.buffer_text(buffer) else {
            overlays.by_buffer.remove(&buffer);
            return;
        };
        let text = rope_text(&rope);
        let appearance = self.settings.appearance();

        if let Some(previous) = overlays.by_buffer.remove(&buffer) {
            for overlay in previous {
                if let Err(HostError::Disposed) = self.host.remove_overlay(buffer, overlay) {
                    if !self.host.is_open(buffer) {
                        tracing::debug!("Buffer {} closed during rescan", buffer.0);
                        return;
                    }
                }
            }
        }

        let style = OverlayStyle::highlight(appearance.color_for(entry.order), appearance.foreground);
        let mut created = Vec::new();
        for range in entry.matcher.find_iter(&text) {
            match self.host.add_overlay(buffer, range, &style) {
                Ok(id) => created.push(id),
                Err(HostError::Disposed) => {
                    tracing::debug!("Buffer {} closed during rescan", buffer.0);
                    return;
                }
                Err(e) => {
                    // Text moved on since the snapshot; the pending rescan catches up
                    tracing::debug!("Skipping stale match for {:?}: {}", entry.term, e);
                }
            }
        }

        if !created.is_empty() {
            overlays.by_buffer.insert(buffer, created);
        }
    }

    /// Release every overlay of an entry that left the registry
    fn dispose_entry(&self, entry: &HighlightEntry) {
        let mut overlays = entry.overlays.lock();
        overlays.disposed = true;
        for (buffer, handles) in overlays.by_buffer.drain() {
            if !self.host.is_open(buffer) {
                continue;
            }
            for overlay in handles {
                if let Err(e) = self.host.remove_overlay(buffer, overlay) {
                    tracing::debug!(
                        "Overlay {} of {:?} already gone in buffer {}: {}",
                        overlay.0,
                        entry.term,
                        buffer.0,
                        e
                    );
                }
            }
        }
    }
}

impl Drop for HighlightRegistry {
    fn drop(&mut self) {
        self.clear_all();
    }
}

impl RescanTarget for HighlightRegistry {
    fn has_work(&self) -> bool {
        self.has_any()
    }

    fn rescan(&self, buffer: BufferId) {
        self.rescan_buffer(buffer);
    }
}

/// Borrow the rope's text when it is a single chunk
fn rope_text(rope: &Rope) -> Cow<'_, str> {
    match rope.slice(..).as_str() {
        Some(text) => Cow::Borrowed(text),
        None => Cow::Owned(rope.to_string()),
    }
}
