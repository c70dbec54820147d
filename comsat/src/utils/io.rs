//! I/O and path utilities

use std::path::{Path, PathBuf};

/// Directory next to `archive` named after its stem, `maps/Temple.SC2Map` -> `maps/Temple-extracted`
pub fn default_output_dir(archive: &Path) -> PathBuf {
    let stem = archive
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    archive.with_file_name(format!("{stem}-extracted"))
}

/// Truncate a member name for display, keeping the file name
pub fn truncate_path(name: &str, max_len: usize) -> String {
    let len = name.chars().count();
    if len <= max_len {
        return name.to_string();
    }

    let (dirs, filename) = match name.rfind(['\\', '/']) {
        Some(pos) => (&name[..pos], &name[pos + 1..]),
        None => ("", name),
    };
    let filename_len = filename.chars().count();

    if filename_len + 4 > max_len {
        // Filename alone is too long, keep its tail
        let keep = max_len.saturating_sub(3);
        let tail: String = filename.chars().skip(filename_len - keep.min(filename_len)).collect();
        return format!("...{tail}");
    }

    // Leading directories that still fit in front of the ellipsis
    let space = max_len - filename_len - 4;
    let mut prefix = String::new();
    for part in dirs.split(['\\', '/']) {
        let needed = part.chars().count() + 1;
        if prefix.chars().count() + needed > space {
            break;
        }
        prefix.push_str(part);
        prefix.push('\\');
    }

    format!("{prefix}...\\{filename}")
}

/// Simple wildcard pattern matching
///
/// Case insensitive. A pattern without `*` matches any name containing it.
pub fn matches_pattern(text: &str, pattern: &str) -> bool {
    if pattern.is_empty() || pattern == "*" {
        return true;
    }

    let pattern_lower = pattern.to_lowercase();
    let text_lower = text.to_lowercase();

    if !pattern_lower.contains('*') {
        return text_lower.contains(&pattern_lower);
    }

    let parts: Vec<&str> = pattern_lower.split('*').collect();
    let mut pos = 0;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }

        if i == 0 && !text_lower.starts_with(part) {
            return false;
        }

        match text_lower[pos..].find(part) {
            Some(found) => pos += found + part.len(),
            None => return false,
        }
    }

    if let Some(last) = parts.last()
        && !last.is_empty()
        && !text_lower.ends_with(last)
    {
        return false;
    }

    true
}
