//! Writing archive members to disk
//!
//! MPQ member names use backslashes as separators and may come from an
//! untrusted archive. [`sanitize_member_name`] maps a member name onto a
//! relative path and rejects anything that could escape the output
//! directory. The extraction functions write members one at a time: a
//! member that fails (bad name, decode error, I/O error) is recorded in the
//! [`ExtractReport`] and the remaining members are still written.
//!
//! ```
//! use comsat_mpq::sanitize_member_name;
//! use std::path::PathBuf;
//!
//! let path = sanitize_member_name("enUS.SC2Data\\LocalizedData\\GameStrings.txt").unwrap();
//! assert_eq!(
//!     path,
//!     ["enUS.SC2Data", "LocalizedData", "GameStrings.txt"].iter().collect::<PathBuf>()
//! );
//! assert!(sanitize_member_name("..\\..\\etc\\passwd").is_err());
//! ```

use crate::archive::{Archive, ExtractFailure};
use crate::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Options controlling how members are written
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Write every member directly into the output directory, using only
    /// the last path component
    pub flatten: bool,
    /// Replace files that already exist
    pub overwrite: bool,
}

impl ExtractOptions {
    /// Default options: keep the directory structure, overwrite
    pub fn new() -> Self {
        Self {
            flatten: false,
            overwrite: true,
        }
    }

    /// Set whether to drop the directory structure
    pub fn flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }

    /// Set whether existing files are replaced
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// A member written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    /// Member name in the archive
    pub name: String,
    /// Path that was written
    pub path: PathBuf,
    /// Number of bytes written
    pub size: u64,
}

/// Outcome of an extraction run
#[derive(Debug, Default)]
pub struct ExtractReport {
    /// Members written successfully, in write order
    pub written: Vec<ExtractedFile>,
    /// Members that could not be read or written
    pub failures: Vec<ExtractFailure>,
}

impl ExtractReport {
    /// Whether every member was written
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total number of bytes written
    pub fn total_bytes(&self) -> u64 {
        self.written.iter().map(|f| f.size).sum()
    }

    fn record(&mut self, name: &str, result: Result<(PathBuf, u64)>) {
        match result {
            Ok((path, size)) => self.written.push(ExtractedFile {
                name: name.to_string(),
                path,
                size,
            }),
            Err(error) => {
                log::warn!("Failed to extract {name}: {error}");
                self.failures.push(ExtractFailure {
                    name: name.to_string(),
                    block_index: None,
                    error,
                });
            }
        }
    }
}

/// Map a member name onto a relative filesystem path.
///
/// Both `\` and `/` separate components. Empty and `.` components are
/// dropped.
///
/// # Errors
/// `Error::UnsafePath` for empty names, absolute paths, drive prefixes,
/// `..` components, control characters and the characters `<>:"|?*`.
pub fn sanitize_member_name(name: &str) -> Result<PathBuf> {
    let reject = |reason: &'static str| Error::UnsafePath {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(reject("empty name"));
    }
    if name.chars().any(char::is_control) {
        return Err(reject("control character"));
    }
    if name.starts_with(['\\', '/']) {
        return Err(reject("absolute path"));
    }

    let bytes = name.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return Err(reject("drive prefix"));
    }
    if name.contains(RESERVED_CHARS) {
        return Err(reject("reserved character"));
    }

    let mut path = PathBuf::new();
    for component in name.split(['\\', '/']) {
        match component {
            "" | "." => {}
            ".." => return Err(reject("parent directory component")),
            part => path.push(part),
        }
    }

    if path.as_os_str().is_empty() {
        return Err(reject("empty name"));
    }

    Ok(path)
}

/// Destination of member `name` below `output_dir`
pub fn member_output_path(output_dir: &Path, name: &str, options: &ExtractOptions) -> Result<PathBuf> {
    let relative = sanitize_member_name(name)?;

    if options.flatten {
        let file_name = relative.file_name().ok_or_else(|| Error::UnsafePath {
            name: name.to_string(),
            reason: "no file name",
        })?;
        Ok(output_dir.join(file_name))
    } else {
        Ok(output_dir.join(relative))
    }
}

/// Write one member below `output_dir`, creating parent directories
pub fn write_member(
    output_dir: &Path,
    name: &str,
    data: &[u8],
    options: &ExtractOptions,
) -> Result<PathBuf> {
    let path = member_output_path(output_dir, name, options)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = if options.overwrite {
        fs::File::create(&path)?
    } else {
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    Error::Io(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("{} already exists", path.display()),
                    ))
                } else {
                    Error::Io(e)
                }
            })?
    };
    file.write_all(data)?;

    log::trace!("Wrote {} ({} bytes)", path.display(), data.len());
    Ok(path)
}

/// Output paths written during one extraction run
///
/// Paths are compared case-insensitively, the way member names are.
#[derive(Debug, Default)]
struct ClaimedPaths {
    owners: HashMap<String, String>,
}

impl ClaimedPaths {
    /// Write a member unless an earlier member of this run already wrote its path
    fn write(
        &mut self,
        output_dir: &Path,
        name: &str,
        data: &[u8],
        options: &ExtractOptions,
    ) -> Result<(PathBuf, u64)> {
        let key = member_output_path(output_dir, name, options)?
            .to_string_lossy()
            .to_lowercase();
        if let Some(existing) = self.owners.get(&key) {
            return Err(Error::NameCollision {
                name: name.to_string(),
                existing: existing.clone(),
            });
        }

        let path = write_member(output_dir, name, data, options)?;
        self.owners.insert(key, name.to_string());
        Ok((path, data.len() as u64))
    }
}

/// Extract every existing member of the archive into `output_dir`.
///
/// Members are decoded with [`Archive::extract_all`], so unnamed blocks are
/// written under their synthetic names. Decode failures and write failures
/// both end up in the report. A member whose output path was already written
/// in this run (two basenames meeting under `flatten`) is reported as
/// [`Error::NameCollision`] and the first file is kept.
///
/// # Errors
/// Only when `output_dir` itself cannot be created.
pub fn extract_to_dir<R, P>(
    archive: &mut Archive<R>,
    output_dir: P,
    options: &ExtractOptions,
) -> Result<ExtractReport>
where
    R: Read + Seek,
    P: AsRef<Path>,
{
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    let all = archive.extract_all();
    let mut report = ExtractReport {
        written: Vec::with_capacity(all.files.len()),
        failures: all.failures,
    };

    let mut claimed = ClaimedPaths::default();
    for (name, data) in &all.files {
        let result = claimed.write(output_dir, name, data, options);
        report.record(name, result);
    }

    log::info!(
        "Extracted {} files ({} bytes) to {}, {} failed",
        report.written.len(),
        report.total_bytes(),
        output_dir.display(),
        report.failures.len()
    );
    Ok(report)
}

/// Extract the listed members whose name satisfies `predicate`.
///
/// # Errors
/// When `output_dir` cannot be created or the (listfile) cannot be read.
pub fn extract_matching_to_dir<R, P, F>(
    archive: &mut Archive<R>,
    output_dir: P,
    options: &ExtractOptions,
    mut predicate: F,
) -> Result<ExtractReport>
where
    R: Read + Seek,
    P: AsRef<Path>,
    F: FnMut(&str) -> bool,
{
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    let mut report = ExtractReport::default();
    let mut claimed = ClaimedPaths::default();
    for name in archive.list_names()? {
        if !predicate(&name) {
            continue;
        }

        let result = archive
            .read_file(&name)
            .and_then(|data| claimed.write(output_dir, &name, &data, options));
        report.record(&name, result);
    }

    log::info!(
        "Extracted {} matching files to {}, {} failed",
        report.written.len(),
        output_dir.display(),
        report.failures.len()
    );
    Ok(report)
}
