//! (listfile) parsing functionality

use std::collections::HashSet;

/// Name of the member holding the archive's file names
pub const LISTFILE_NAME: &str = "(listfile)";

/// Parse a (listfile) into individual filenames
///
/// The (listfile) format supports:
/// - One filename per line (`\n`, `\r\n` or `\r` terminated)
/// - Comments starting with ';' or '#'
/// - Optional file metadata after ';' on each line
/// - Empty lines are ignored
///
/// Names are returned in file order. Later duplicates (compared the way the
/// hash table compares names: case-insensitive, `/` equal to `\`) are
/// dropped.
pub fn parse_listfile(data: &[u8]) -> Vec<String> {
    let content = match std::str::from_utf8(data) {
        Ok(s) => std::borrow::Cow::Borrowed(s),
        Err(_) => {
            log::warn!("(listfile) contains invalid UTF-8, using lossy conversion");
            String::from_utf8_lossy(data)
        }
    };

    let mut seen = HashSet::new();
    let files: Vec<String> = content
        .split(['\r', '\n', '\0'])
        .filter_map(|line| {
            let line = line.trim();

            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                return None;
            }

            let filename = match line.find(';') {
                Some(pos) => line[..pos].trim(),
                None => line,
            };

            if filename.is_empty() {
                None
            } else {
                Some(filename.to_string())
            }
        })
        .filter(|name| seen.insert(name.replace('/', "\\").to_ascii_uppercase()))
        .collect();

    log::debug!("Parsed {} files from (listfile)", files.len());
    files
}
