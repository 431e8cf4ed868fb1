//! Wall-clock helper.
//!
//! The core itself never reads the clock — callers pass `now_ms` into
//! every time-sensitive operation so tests stay deterministic. This
//! helper is for those callers. Uses `web-time` so the same code works
//! on wasm targets.

use web_time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_after_2020() {
        assert!(now_ms() > 1_577_836_800_000);
    }
}
