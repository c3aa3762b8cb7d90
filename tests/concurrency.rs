//! Concurrent toggles, edits and configuration changes
//!
//! After every thread finishes and the rescan worker settles, the host must
//! hold exactly the overlays the registry accounts for.

mod common;

use std::sync::Arc;
use std::thread;

use common::{harness, settle, WS};
use word_highlight::{find_matches, BufferId, MemoryHost};

const TERMS: [&str; 6] = ["alpha", "beta", "gamma", "delta", "eps", "zeta"];

fn expected_overlays(host: &MemoryHost, buffer: BufferId, terms: &[String]) -> usize {
    let text = host.text(buffer).unwrap_or_default();
    terms.iter().map(|t| find_matches(&text, t).len()).sum()
}

#[test]
fn test_concurrent_toggles_keep_overlays_consistent() {
    let h = harness();
    let text = TERMS.join(" ").repeat(3);
    let buffers: Vec<BufferId> = (0..3).map(|_| h.host.open_buffer(WS, &text)).collect();

    thread::scope(|s| {
        // Each term is toggled an odd number of times: it ends up present
        for term in TERMS {
            let session = &h.session;
            s.spawn(move || {
                for _ in 0..5 {
                    session.toggle(term);
                }
            });
        }
        // Shared term toggled an even number of times overall: ends up absent
        for _ in 0..2 {
            let session = &h.session;
            s.spawn(move || {
                for _ in 0..10 {
                    session.toggle("shared");
                }
            });
        }
        // Edits race the toggles
        let host = &h.host;
        let buffers = &buffers;
        s.spawn(move || {
            for i in 0..30 {
                host.append(buffers[i % buffers.len()], " alpha shared");
            }
        });
    });
    settle();

    let snapshot: Vec<String> = h.session.snapshot().into_iter().map(|i| i.term).collect();
    let mut sorted = snapshot.clone();
    sorted.sort();
    let mut expected: Vec<String> = TERMS.iter().map(|t| t.to_string()).collect();
    expected.sort();
    assert_eq!(sorted, expected);

    for &buffer in &buffers {
        assert_eq!(
            h.host.overlay_count(buffer),
            expected_overlays(&h.host, buffer, &snapshot)
        );
    }
    assert_eq!(h.host.stats().rejected, 0);
}

#[test]
fn test_concurrent_open_close_and_clear() {
    let h = harness();
    h.session.toggle("word");
    let host: &Arc<MemoryHost> = &h.host;

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(move || {
                for _ in 0..20 {
                    let buffer = host.open_buffer(WS, "word word");
                    host.append(buffer, " word");
                    host.close_buffer(buffer);
                }
            });
        }
        let session = &h.session;
        s.spawn(move || {
            for _ in 0..20 {
                session.toggle("other");
            }
        });
    });
    settle();

    // Every buffer was closed, so nothing may still be tracked or drawn
    assert_eq!(h.host.total_overlays(), 0);
    assert!(h.session.tracked_buffers().is_empty());
    assert_eq!(h.session.registry().highlighted_buffers("word"), Some(vec![]));

    h.session.clear_all();
    assert!(!h.session.has_any());
}

#[test]
fn test_palette_changes_race_toggles() {
    let h = harness();
    let buffer = h.host.open_buffer(WS, &TERMS.join(" "));

    thread::scope(|s| {
        let settings = &h.settings;
        s.spawn(move || {
            for i in 0..20 {
                if i % 2 == 0 {
                    settings.set_colors(&["#FF0000", "#00FF00"]);
                } else {
                    settings.set_colors(&["#0000FF"]);
                }
            }
        });
        for term in TERMS {
            let session = &h.session;
            s.spawn(move || {
                session.toggle(term);
            });
        }
    });

    // A final change re-renders everything with one palette
    h.settings.set_colors(&["#123456"]);
    assert_eq!(h.host.overlay_count(buffer), TERMS.len());
    let expected = word_highlight::Color::rgb(0x12, 0x34, 0x56);
    assert!(h
        .host
        .overlays(buffer)
        .iter()
        .all(|o| o.style.background == expected));
}
