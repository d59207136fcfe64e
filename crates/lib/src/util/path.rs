//! Path display helpers.

use std::path::Path;

/// Show `path` relative to `base` when it lives under it.
pub fn display_path(path: &str, base: Option<&Path>) -> String {
  let Some(base) = base else {
    return path.to_string();
  };
  match Path::new(path).strip_prefix(base) {
    Ok(rel) if !rel.as_os_str().is_empty() => rel.to_string_lossy().to_string(),
    _ => path.to_string(),
  }
}

/// Format a changed-file list for a one-line summary, e.g. `[a.go b.go ...]`.
///
/// At most `max` entries are shown. Paths under `base` are shown relative
/// to it.
pub fn format_file_change_list(files: &[String], base: Option<&Path>, max: usize) -> String {
  let mut shown: Vec<String> = files.iter().take(max).map(|f| display_path(f, base)).collect();
  if files.len() > max {
    shown.push("...".to_string());
  }
  format!("[{}]", shown.join(" "))
}
