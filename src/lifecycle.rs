//! Buffer open/close tracking
//!
//! Keeps the registry in step with the host's buffers: newly opened buffers
//! get every current term, edits schedule debounced rescans, and closed
//! buffers are forgotten without touching the host.
//!
//! Lifecycle signals may arrive more than once or out of order. Opening an
//! already tracked buffer is ignored. A close always forgets the buffer.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::host::{BufferId, LifecycleEvent, ListenerId, TextHost, WorkspaceId};
use crate::registry::HighlightRegistry;
use crate::scheduler::RescanHandle;

pub struct BufferLifecycleTracker {
    workspace: WorkspaceId,
    host: Arc<dyn TextHost>,
    registry: Arc<HighlightRegistry>,
    rescans: RescanHandle,
    /// Change subscription per tracked buffer
    tracked: Mutex<HashMap<BufferId, ListenerId>>,
    lifecycle: Mutex<Option<ListenerId>>,
}

impl BufferLifecycleTracker {
    pub fn new(
        host: Arc<dyn TextHost>,
        registry: Arc<HighlightRegistry>,
        rescans: RescanHandle,
    ) -> Arc<Self> {
        Arc::new(Self {
            workspace: registry.workspace(),
            host,
            registry,
            rescans,
            tracked: Mutex::new(HashMap::new()),
            lifecycle: Mutex::new(None),
        })
    }

    /// Subscribe to lifecycle events and adopt buffers that are already open
    ///
    /// Calling it twice keeps the first subscription.
    pub fn attach(self: &Arc<Self>) {
        {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.is_some() {
                return;
            }
            let weak: Weak<Self> = Arc::downgrade(self);
            let id = self.host.subscribe_lifecycle(Arc::new(move |event: LifecycleEvent| {
                if let Some(tracker) = weak.upgrade() {
                    tracker.handle(event);
                }
            }));
            *lifecycle = Some(id);
        }

        let open = self.host.open_buffers(self.workspace);
        tracing::debug!(
            "Tracking workspace {} ({} buffers already open)",
            self.workspace.0,
            open.len()
        );
        for buffer in open {
            self.buffer_opened(buffer);
        }
    }

    /// Dispatch one lifecycle event; events for other workspaces are ignored
    pub fn handle(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Opened { workspace, buffer } if workspace == self.workspace => {
                self.buffer_opened(buffer);
            }
            LifecycleEvent::Closed { workspace, buffer } if workspace == self.workspace => {
                self.buffer_closed(buffer);
            }
            _ => {}
        }
    }

    /// Drop every subscription; tracked buffers keep their overlays
    pub fn detach(&self) {
        if let Some(id) = self.lifecycle.lock().take() {
            self.host.unsubscribe_lifecycle(id);
        }

        let tracked: Vec<(BufferId, ListenerId)> = self.tracked.lock().drain().collect();
        for (buffer, listener) in tracked {
            self.rescans.cancel(buffer);
            self.host.unsubscribe_changes(buffer, listener);
        }
    }

    pub fn is_tracking(&self, buffer: BufferId) -> bool {
        self.tracked.lock().contains_key(&buffer)
    }

    pub fn tracked_buffers(&self) -> Vec<BufferId> {
        let mut buffers: Vec<BufferId> = self.tracked.lock().keys().copied().collect();
        buffers.sort();
        buffers
    }

    fn buffer_opened(&self, buffer: BufferId) {
        let subscribed = {
            let mut tracked = self.tracked.lock();
            if tracked.contains_key(&buffer) {
                tracing::trace!("Buffer {} already tracked", buffer.0);
                return;
            }

            let rescans = self.rescans.clone();
            let listener = self.host.subscribe_changes(
                buffer,
                Arc::new(move |changed: BufferId| {
                    rescans.schedule(changed);
                }),
            );
            match listener {
                Some(listener) => {
                    tracked.insert(buffer, listener);
                    true
                }
                None => false,
            }
        };

        if subscribed {
            self.registry.on_buffer_opened(buffer);
        } else {
            // Overlays a toggle drew before the close still hold keys
            tracing::debug!("Buffer {} closed before it could be tracked", buffer.0);
            self.registry.on_buffer_closed(buffer);
        }
    }

    /// Forget the buffer even if it was never tracked; only the change
    /// subscription depends on tracking
    fn buffer_closed(&self, buffer: BufferId) {
        let listener = self.tracked.lock().remove(&buffer);

        self.rescans.cancel(buffer);
        self.registry.on_buffer_closed(buffer);

        match listener {
            Some(listener) => self.host.unsubscribe_changes(buffer, listener),
            None => tracing::trace!("Close for untracked buffer {}", buffer.0),
        }
    }
}

impl Drop for BufferLifecycleTracker {
    fn drop(&mut self) {
        self.detach();
    }
}
