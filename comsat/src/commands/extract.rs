//! Replay and map extraction

use anyhow::{Context, Result, bail};
use comsat_mpq::extract::{extract_matching_to_dir, extract_to_dir, write_member};
use comsat_mpq::{Archive, ExtractOptions, ExtractReport};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::{create_spinner, default_output_dir, format_bytes};

/// Thumbnail extracted from maps unless another name is given
pub const DEFAULT_THUMBNAIL: &str = "Minimap.tga";

/// Member name of a map's localized strings (`enUS.SC2Data\LocalizedData\GameStrings.txt`)
pub const GAME_STRINGS_PATTERN: &str =
    r"^[a-z]{2}[A-Z]{2}\.SC2Data\\LocalizedData\\GameStrings\.txt$";

/// File the replay's user data content is written to
pub const REPLAY_HEADER_FILE: &str = "replay.header";

/// Build extraction options from the command line flags
pub fn extract_options(flatten: bool, no_overwrite: bool) -> ExtractOptions {
    ExtractOptions::new()
        .flatten(flatten)
        .overwrite(!no_overwrite)
}

/// Extract every member of a replay
pub fn extract_replay(replay: &Path, output: Option<&Path>, options: &ExtractOptions) -> Result<()> {
    let spinner = create_spinner("Opening replay...");
    let mut archive = Archive::open(replay)
        .with_context(|| format!("Failed to open replay {}", replay.display()))?;
    let output = resolve_output(replay, output)?;
    spinner.set_message("Extracting files...");

    let mut header_written = false;
    if let Some(user_data) = archive.user_data() {
        write_member(&output, REPLAY_HEADER_FILE, &user_data.content, options)
            .with_context(|| format!("Failed to write {REPLAY_HEADER_FILE}"))?;
        header_written = true;
    } else {
        log::info!("{} has no user data header", replay.display());
    }

    let report = extract_to_dir(&mut archive, &output, options)
        .with_context(|| format!("Failed to extract to {}", output.display()))?;
    spinner.finish_and_clear();

    if header_written {
        println!("Wrote {REPLAY_HEADER_FILE}");
    }
    summarize(&report, &output)
}

/// Extract a map's thumbnail and its localized GameStrings.txt files
pub fn extract_map(
    map: &Path,
    thumbnail: Option<&str>,
    output: Option<&Path>,
    options: &ExtractOptions,
) -> Result<()> {
    let thumbnail = thumbnail.unwrap_or(DEFAULT_THUMBNAIL);
    let game_strings = Regex::new(GAME_STRINGS_PATTERN).context("Invalid localization pattern")?;

    let spinner = create_spinner("Opening map...");
    let mut archive =
        Archive::open(map).with_context(|| format!("Failed to open map {}", map.display()))?;
    let output = resolve_output(map, output)?;
    spinner.set_message("Extracting files...");

    let report = extract_matching_to_dir(&mut archive, &output, options, |name| {
        name == thumbnail || game_strings.is_match(name)
    })
    .with_context(|| format!("Failed to extract to {}", output.display()))?;
    spinner.finish_and_clear();

    if !report.written.iter().any(|f| f.name == thumbnail)
        && !report.failures.iter().any(|f| f.name == thumbnail)
    {
        log::warn!("Thumbnail {thumbnail} not found in {}", map.display());
    }

    summarize(&report, &output)
}

/// Output directory for an opened `archive`, created if absent
fn resolve_output(archive: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_dir(archive));

    fs::create_dir_all(&output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))?;
    Ok(output)
}

/// Print what was written and fail when any member failed
fn summarize(report: &ExtractReport, output: &Path) -> Result<()> {
    for file in &report.written {
        log::info!("{} -> {}", file.name, file.path.display());
    }
    for failure in &report.failures {
        log::error!("{}: {}", failure.name, failure.error);
    }

    println!(
        "Extracted {} files ({}) to {}",
        report.written.len(),
        format_bytes(report.total_bytes()),
        output.display()
    );

    if !report.is_complete() {
        bail!(
            "{} of {} files failed to extract",
            report.failures.len(),
            report.failures.len() + report.written.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_strings_pattern() {
        let re = Regex::new(GAME_STRINGS_PATTERN).unwrap();

        assert!(re.is_match("enUS.SC2Data\\LocalizedData\\GameStrings.txt"));
        assert!(re.is_match("koKR.SC2Data\\LocalizedData\\GameStrings.txt"));
        assert!(!re.is_match("enUS.SC2Data\\LocalizedData\\TriggerStrings.txt"));
        assert!(!re.is_match("ENUS.SC2Data\\LocalizedData\\GameStrings.txt"));
        assert!(!re.is_match("enUS.SC2Data/LocalizedData/GameStrings.txt"));
        assert!(!re.is_match("Mods\\enUS.SC2Data\\LocalizedData\\GameStrings.txt"));
    }

    #[test]
    fn test_extract_options_from_flags() {
        let options = extract_options(true, true);
        assert!(options.flatten);
        assert!(!options.overwrite);

        let options = extract_options(false, false);
        assert!(!options.flatten);
        assert!(options.overwrite);
    }
}
