//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use word_highlight::{HighlightSession, MemoryHost, SharedSettings, WorkspaceId};

pub const WS: WorkspaceId = WorkspaceId(1);

/// Short rescan delay so timing tests stay fast
pub const TEST_DELAY: Duration = Duration::from_millis(30);

/// Generous upper bound for waiting on the rescan worker
pub const SETTLE: Duration = Duration::from_millis(400);

/// An in-memory host plus an attached session sharing `settings`
pub struct Harness {
    pub host: Arc<MemoryHost>,
    pub settings: SharedSettings,
    pub session: HighlightSession,
}

pub fn harness() -> Harness {
    harness_with(SharedSettings::default())
}

pub fn harness_with(settings: SharedSettings) -> Harness {
    let host = Arc::new(MemoryHost::new());
    let session =
        HighlightSession::attach_with_delay(host.clone(), settings.clone(), WS, TEST_DELAY)
            .expect("session attaches");
    Harness {
        host,
        settings,
        session,
    }
}

/// Settings with a fixed palette
pub fn palette_settings(colors: &[&str]) -> SharedSettings {
    let settings = SharedSettings::default();
    settings.set_colors(colors);
    settings
}

/// Poll `check` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

/// Let the debounce window and any due rescan complete
pub fn settle() {
    thread::sleep(SETTLE);
}
