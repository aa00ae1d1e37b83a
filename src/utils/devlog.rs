//! Developer logging ("level 6") with a thread-local capture sink.
//!
//! The executor emits one JSON line per operation through [`dev6!`]; tests
//! enable the sink on their own thread and assert on the captured lines
//! without touching the global logger.

use std::cell::RefCell;

/// Log target used by [`dev6!`] when routing to the global logger.
pub const DEV6_TARGET: &str = "nexusquery::dev6";

thread_local! {
    static SINK: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Disables the current thread's sink on drop.
pub struct SinkGuard;

impl Drop for SinkGuard {
    fn drop(&mut self) {
        SINK.with(|s| *s.borrow_mut() = None);
    }
}

/// Starts capturing `dev6!` lines on the current thread.
#[must_use = "the sink is disabled when the guard is dropped"]
pub fn enable_thread_sink() -> SinkGuard {
    SINK.with(|s| *s.borrow_mut() = Some(Vec::new()));
    SinkGuard
}

pub fn write_str(msg: &str) {
    SINK.with(|s| {
        if let Some(buf) = s.borrow_mut().as_mut() {
            buf.push(msg.to_owned());
        }
    });
}

/// Takes every captured line, leaving the sink enabled but empty.
pub fn drain() -> Vec<String> {
    SINK.with(|s| s.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
}

pub fn snapshot() -> Vec<String> {
    SINK.with(|s| s.borrow().as_ref().cloned().unwrap_or_default())
}

/// Drains the sink and parses the benchmark lines emitted for `op`.
pub fn drain_bench(op: &str) -> Vec<serde_json::Value> {
    drain()
        .into_iter()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(&line).ok())
        .filter(|v| v.get("bench").is_some() && v.get("op").and_then(serde_json::Value::as_str) == Some(op))
        .collect()
}

/// Emits a developer log line, captured by the thread sink when enabled and
/// routed to the `nexusquery::dev6` target at TRACE.
#[macro_export]
macro_rules! dev6 {
    ($($arg:tt)*) => {{
        let __s = format!($($arg)*);
        $crate::utils::devlog::write_str(&__s);
        log::log!(target: $crate::utils::devlog::DEV6_TARGET, log::Level::Trace, "{}", __s);
    }};
}
