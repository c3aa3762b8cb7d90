//! Word Highlight - persistent multi-color word highlighting
//!
//! This crate keeps a per-workspace set of highlighted terms and mirrors them
//! as colored overlays in every open buffer of a host editor. The editor is
//! reached only through the [`host::TextHost`] trait.

pub mod bridge;
pub mod config_paths;
pub mod host;
pub mod lifecycle;
pub mod matcher;
pub mod memory;
pub mod palette;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod tracing;
pub mod util;

// Re-export commonly used types
pub use host::{BufferId, OverlayStyle, TextHost, WorkspaceId};
pub use matcher::{find_matches, WordMatcher};
pub use memory::MemoryHost;
pub use palette::Color;
pub use registry::{HighlightInfo, HighlightRegistry, ToggleResult};
pub use session::HighlightSession;
pub use settings::{HighlightSettings, SharedSettings};
