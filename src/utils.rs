//! Utility functions shared across modules

use std::path::Path;

/// Format a number with underscore separators for readability (e.g., 89210 -> "89_210")
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push('_');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Format bytes for human readability (e.g., 1048576 -> "1.00 MB")
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.2} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.2} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Express `path` relative to `root` with `/` separators.
///
/// Paths outside `root` are returned unchanged (separators still normalized).
/// When `path` is `root` itself, the final component is used so a scan rooted
/// at a single file still reports a usable name.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = match path.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => path
            .file_name()
            .map(Path::new)
            .unwrap_or(path),
        Ok(rel) => rel,
        Err(_) => path,
    };
    relative.to_string_lossy().replace('\\', "/")
}
