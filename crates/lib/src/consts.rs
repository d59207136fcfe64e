/// Prefix of every build span id (`build:<n>`).
pub const BUILD_SPAN_PREFIX: &str = "build";

/// Separates the summary from the manifest name in the per-build summary line.
pub const SUMMARY_DELIMITER: &str = "•";

/// Changed files listed in a build summary before the list is cut off.
pub const DEFAULT_MAX_CHANGED_FILES_TO_PRINT: usize = 5;
