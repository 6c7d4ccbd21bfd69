//! Path escaping for configuration lines.
//!
//! The engine reads its configuration with a Java-properties style reader,
//! where `\` is an escape character and `:` is an alternative key/value
//! delimiter. Windows paths therefore need both doubled backslashes and an
//! escaped drive colon. Paths on other platforms are emitted as-is.

/// Escape `path` for embedding in a configuration line.
///
/// On Windows targets, `/` becomes `\`, every `\` is doubled, and `:`
/// becomes `\:`. On any other target the input is returned unchanged.
///
/// Escaping is not idempotent: apply it exactly once, right before the
/// value is emitted.
pub fn escape(path: &str, target_is_windows: bool) -> String {
    if !target_is_windows {
        return path.to_string();
    }

    path.replace('/', "\\")
        .replace('\\', "\\\\")
        .replace(':', "\\:")
}
