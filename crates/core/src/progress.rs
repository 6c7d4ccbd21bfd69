//! Progress markers in engine output.
//!
//! The engine reports progress on lines of their own, formatted as `#`
//! followed by a percentage, e.g. `#42`.

use std::sync::LazyLock;

use regex::Regex;

/// Highest percentage the engine reports.
pub const MAX_PROGRESS: u8 = 100;

static PROGRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#([0-9]{1,3})$").expect("valid regex"));

/// Extract a progress percentage from one line of engine output.
///
/// The whole line must be `#` followed by one to three digits with a value
/// in `0..=100`. Anything else, including leading or trailing characters,
/// yields `None`.
pub fn parse(line: &str) -> Option<u8> {
    let caps = PROGRESS_RE.captures(line)?;
    let value: u16 = caps[1].parse().ok()?;
    if value > u16::from(MAX_PROGRESS) {
        return None;
    }
    u8::try_from(value).ok()
}
