//! Host text-editing surface
//!
//! The engine never touches buffers directly. Everything it needs from the
//! editor (listing buffers, reading text, drawing overlays and subscribing to
//! lifecycle and edit events) goes through [`TextHost`].
//!
//! A host must report a buffer as closed (`buffer_text` returning `None`)
//! before it delivers [`LifecycleEvent::Closed`] for it.

use std::ops::Range;
use std::sync::Arc;

use ropey::Rope;

use crate::palette::Color;

/// Identifies a workspace (one project window, one session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkspaceId(pub u64);

/// Identifies an open buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// Handle to one overlay range created by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(pub u64);

/// Handle to an event subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// How the overlay outline is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayEffect {
    /// Box with rounded corners around the match
    #[default]
    RoundedBox,
}

/// Visual style of a highlight overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayStyle {
    pub background: Color,
    pub foreground: Color,
    pub effect: OverlayEffect,
    pub effect_color: Color,
}

impl OverlayStyle {
    /// Style for one highlighted term: a rounded box in the term's color
    pub fn highlight(background: Color, foreground: Color) -> Self {
        Self {
            background,
            foreground,
            effect: OverlayEffect::RoundedBox,
            effect_color: background,
        }
    }
}

/// Buffer lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Opened {
        workspace: WorkspaceId,
        buffer: BufferId,
    },
    Closed {
        workspace: WorkspaceId,
        buffer: BufferId,
    },
}

/// Callback for lifecycle events
pub type LifecycleListener = Arc<dyn Fn(LifecycleEvent) + Send + Sync>;

/// Callback for text changes in one buffer
pub type ChangeListener = Arc<dyn Fn(BufferId) + Send + Sync>;

/// Errors reported by overlay operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The buffer (or the overlay) no longer exists
    Disposed,
    /// The range lies outside the buffer
    InvalidRange { range: Range<usize>, len: usize },
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disposed => write!(f, "buffer or overlay disposed"),
            Self::InvalidRange { range, len } => write!(
                f,
                "range {}..{} out of bounds for buffer of {} chars",
                range.start, range.end, len
            ),
        }
    }
}

impl std::error::Error for HostError {}

/// Capabilities the engine consumes from the editor
///
/// Implementations must be callable from any thread. Callbacks registered
/// through the `subscribe_*` methods must not be invoked while the host holds
/// internal locks the engine could re-enter.
pub trait TextHost: Send + Sync {
    /// Buffers currently open in `workspace`
    fn open_buffers(&self, workspace: WorkspaceId) -> Vec<BufferId>;

    /// Immutable snapshot of a buffer's text, `None` once the buffer closed
    fn buffer_text(&self, buffer: BufferId) -> Option<Rope>;

    /// Whether the buffer still accepts overlay operations
    fn is_open(&self, buffer: BufferId) -> bool {
        self.buffer_text(buffer).is_some()
    }

    /// Create an overlay over a char range
    fn add_overlay(
        &self,
        buffer: BufferId,
        range: Range<usize>,
        style: &OverlayStyle,
    ) -> Result<OverlayId, HostError>;

    /// Remove an overlay previously returned by [`TextHost::add_overlay`]
    fn remove_overlay(&self, buffer: BufferId, overlay: OverlayId) -> Result<(), HostError>;

    fn subscribe_lifecycle(&self, listener: LifecycleListener) -> ListenerId;

    fn unsubscribe_lifecycle(&self, id: ListenerId);

    /// Subscribe to text changes of one buffer, `None` if it is not open
    fn subscribe_changes(&self, buffer: BufferId, listener: ChangeListener) -> Option<ListenerId>;

    fn unsubscribe_changes(&self, buffer: BufferId, id: ListenerId);
}
