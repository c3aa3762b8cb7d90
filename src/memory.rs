//! In-memory [`TextHost`] backed by ropes
//!
//! Used by the test suite and by headless embeddings that keep their own
//! buffers. Overlays follow edits the way editor range markers do: ranges
//! after an edit shift, ranges overlapping it are clamped.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use ropey::Rope;

use crate::host::{
    BufferId, ChangeListener, HostError, LifecycleEvent, LifecycleListener, ListenerId, OverlayId,
    OverlayStyle, TextHost, WorkspaceId,
};

/// One overlay as the host stores it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayRecord {
    pub range: Range<usize>,
    pub style: OverlayStyle,
}

/// Counters for overlay traffic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayStats {
    pub added: u64,
    pub removed: u64,
    /// Operations issued against a buffer that was not open
    pub rejected: u64,
}

struct MemoryBuffer {
    workspace: WorkspaceId,
    text: Rope,
    overlays: BTreeMap<OverlayId, OverlayRecord>,
    change_listeners: Vec<(ListenerId, ChangeListener)>,
}

#[derive(Default)]
struct State {
    buffers: HashMap<BufferId, MemoryBuffer>,
    lifecycle_listeners: Vec<(ListenerId, LifecycleListener)>,
    stats: OverlayStats,
}

/// Thread-safe in-memory editor surface
#[derive(Default)]
pub struct MemoryHost {
    state: Mutex<State>,
    next_id: AtomicU64,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Open a buffer and announce it to lifecycle listeners
    pub fn open_buffer(&self, workspace: WorkspaceId, text: &str) -> BufferId {
        let buffer = BufferId(self.next_id());
        self.state.lock().buffers.insert(
            buffer,
            MemoryBuffer {
                workspace,
                text: Rope::from_str(text),
                overlays: BTreeMap::new(),
                change_listeners: Vec::new(),
            },
        );
        self.announce(LifecycleEvent::Opened { workspace, buffer });
        buffer
    }

    /// Close a buffer, discarding its overlays, and announce it
    pub fn close_buffer(&self, buffer: BufferId) -> bool {
        let removed = self.state.lock().buffers.remove(&buffer);
        match removed {
            Some(buf) => {
                self.announce(LifecycleEvent::Closed {
                    workspace: buf.workspace,
                    buffer,
                });
                true
            }
            None => false,
        }
    }

    /// Deliver a lifecycle event to every listener without changing state
    ///
    /// Lets callers replay duplicate signals the way real hosts sometimes do.
    pub fn announce(&self, event: LifecycleEvent) {
        let listeners: Vec<LifecycleListener> = self
            .state
            .lock()
            .lifecycle_listeners
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Replace `range` (char indices) with `text` and notify change listeners
    pub fn edit(&self, buffer: BufferId, range: Range<usize>, text: &str) -> bool {
        let listeners = {
            let mut state = self.state.lock();
            let Some(buf) = state.buffers.get_mut(&buffer) else {
                return false;
            };
            let len = buf.text.len_chars();
            if range.start > range.end || range.end > len {
                return false;
            }

            buf.text.remove(range.clone());
            buf.text.insert(range.start, text);

            let inserted = text.chars().count();
            for record in buf.overlays.values_mut() {
                record.range = shift_range(&record.range, &range, inserted);
            }

            buf.change_listeners
                .iter()
                .map(|(_, l)| l.clone())
                .collect::<Vec<_>>()
        };

        for listener in listeners {
            listener(buffer);
        }
        true
    }

    /// Append text at the end of a buffer
    pub fn append(&self, buffer: BufferId, text: &str) -> bool {
        let Some(len) = self.buffer_text(buffer).map(|t| t.len_chars()) else {
            return false;
        };
        self.edit(buffer, len..len, text)
    }

    /// Replace the whole contents of a buffer
    pub fn set_text(&self, buffer: BufferId, text: &str) -> bool {
        let Some(len) = self.buffer_text(buffer).map(|t| t.len_chars()) else {
            return false;
        };
        self.edit(buffer, 0..len, text)
    }

    /// Current text as a string
    pub fn text(&self, buffer: BufferId) -> Option<String> {
        self.buffer_text(buffer).map(|t| t.to_string())
    }

    /// Overlays of a buffer ordered by position (empty if closed)
    pub fn overlays(&self, buffer: BufferId) -> Vec<OverlayRecord> {
        let state = self.state.lock();
        let mut records: Vec<OverlayRecord> = state
            .buffers
            .get(&buffer)
            .map(|b| b.overlays.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by_key(|r| (r.range.start, r.range.end));
        records
    }

    /// Overlay ranges of a buffer ordered by position
    pub fn overlay_ranges(&self, buffer: BufferId) -> Vec<Range<usize>> {
        self.overlays(buffer).into_iter().map(|r| r.range).collect()
    }

    pub fn overlay_count(&self, buffer: BufferId) -> usize {
        self.state
            .lock()
            .buffers
            .get(&buffer)
            .map_or(0, |b| b.overlays.len())
    }

    /// Overlays across every open buffer
    pub fn total_overlays(&self) -> usize {
        self.state
            .lock()
            .buffers
            .values()
            .map(|b| b.overlays.len())
            .sum()
    }

    pub fn stats(&self) -> OverlayStats {
        self.state.lock().stats
    }

    pub fn change_listener_count(&self, buffer: BufferId) -> usize {
        self.state
            .lock()
            .buffers
            .get(&buffer)
            .map_or(0, |b| b.change_listeners.len())
    }

    pub fn lifecycle_listener_count(&self) -> usize {
        self.state.lock().lifecycle_listeners.len()
    }
}

/// Move `range` to account for `edited` being replaced by `inserted` chars
fn shift_range(range: &Range<usize>, edited: &Range<usize>, inserted: usize) -> Range<usize> {
    let map = |pos: usize| {
        if pos <= edited.start {
            pos
        } else if pos >= edited.end {
            pos - (edited.end - edited.start) + inserted
        } else {
            edited.start + inserted
        }
    };
    map(range.start)..map(range.end)
}

impl TextHost for MemoryHost {
    fn open_buffers(&self, workspace: WorkspaceId) -> Vec<BufferId> {
        let state = self.state.lock();
        let mut buffers: Vec<BufferId> = state
            .buffers
            .iter()
            .filter(|(_, b)| b.workspace == workspace)
            .map(|(id, _)| *id)
            .collect();
        buffers.sort();
        buffers
    }

    fn buffer_text(&self, buffer: BufferId) -> Option<Rope> {
        self.state.lock().buffers.get(&buffer).map(|b| b.text.clone())
    }

    fn is_open(&self, buffer: BufferId) -> bool {
        self.state.lock().buffers.contains_key(&buffer)
    }

    fn add_overlay(
        &self,
        buffer: BufferId,
        range: Range<usize>,
        style: &OverlayStyle,
    ) -> Result<OverlayId, HostError> {
        let id = OverlayId(self.next_id());
        let mut state = self.state.lock();
        let State { buffers, stats, .. } = &mut *state;
        let Some(buf) = buffers.get_mut(&buffer) else {
            stats.rejected += 1;
            return Err(HostError::Disposed);
        };
        let len = buf.text.len_chars();
        if range.start > range.end || range.end > len {
            return Err(HostError::InvalidRange { range, len });
        }
        buf.overlays.insert(
            id,
            OverlayRecord {
                range,
                style: *style,
            },
        );
        stats.added += 1;
        Ok(id)
    }

    fn remove_overlay(&self, buffer: BufferId, overlay: OverlayId) -> Result<(), HostError> {
        let mut state = self.state.lock();
        let State { buffers, stats, .. } = &mut *state;
        let Some(buf) = buffers.get_mut(&buffer) else {
            stats.rejected += 1;
            return Err(HostError::Disposed);
        };
        match buf.overlays.remove(&overlay) {
            Some(_) => {
                stats.removed += 1;
                Ok(())
            }
            None => Err(HostError::Disposed),
        }
    }

    fn subscribe_lifecycle(&self, listener: LifecycleListener) -> ListenerId {
        let id = ListenerId(self.next_id());
        self.state.lock().lifecycle_listeners.push((id, listener));
        id
    }

    fn unsubscribe_lifecycle(&self, id: ListenerId) {
        self.state
            .lock()
            .lifecycle_listeners
            .retain(|(lid, _)| *lid != id);
    }

    fn subscribe_changes(&self, buffer: BufferId, listener: ChangeListener) -> Option<ListenerId> {
        let id = ListenerId(self.next_id());
        let mut state = self.state.lock();
        let buf = state.buffers.get_mut(&buffer)?;
        buf.change_listeners.push((id, listener));
        Some(id)
    }

    fn unsubscribe_changes(&self, buffer: BufferId, id: ListenerId) {
        if let Some(buf) = self.state.lock().buffers.get_mut(&buffer) {
            buf.change_listeners.retain(|(lid, _)| *lid != id);
        }
    }
}
