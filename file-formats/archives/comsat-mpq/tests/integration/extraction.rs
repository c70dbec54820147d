//! Extraction to disk with partial failures

use crate::common::{open_in_memory, temp_dir};
use comsat_mpq::compression::flags;
use comsat_mpq::extract::{extract_matching_to_dir, extract_to_dir};
use comsat_mpq::test_utils::{FileOptions, TestArchiveConfig, TestFile, generate_compressible_data};
use comsat_mpq::{Error, ExtractOptions};
use std::fs;

#[test]
fn test_extract_replay_to_dir() {
    let dir = temp_dir();
    let out = dir.path().join("replay-extracted");
    let config = TestArchiveConfig::replay();
    let mut archive = open_in_memory(&config);

    let report = extract_to_dir(&mut archive, &out, &ExtractOptions::new()).unwrap();

    assert!(report.is_complete(), "failures: {:?}", report.failures);
    assert_eq!(report.written.len(), 5);
    for file in &config.files {
        assert_eq!(fs::read(out.join(&file.name)).unwrap(), file.data);
    }
    assert!(out.join("(listfile)").is_file());
    let expected_total: u64 = report.written.iter().map(|f| f.size).sum();
    assert_eq!(report.total_bytes(), expected_total);
}

#[test]
fn test_directory_structure_and_flatten() {
    let dir = temp_dir();
    let config = TestArchiveConfig::comprehensive();

    let nested = dir.path().join("nested");
    let mut archive = open_in_memory(&config);
    extract_to_dir(&mut archive, &nested, &ExtractOptions::new()).unwrap();
    assert!(nested.join("data").join("zlib.dat").is_file());
    assert!(nested.join("secure").join("plain.bin").is_file());

    let flat = dir.path().join("flat");
    let mut archive = open_in_memory(&config);
    extract_to_dir(&mut archive, &flat, &ExtractOptions::new().flatten(true)).unwrap();
    assert!(flat.join("zlib.dat").is_file());
    assert!(!flat.join("data").exists());
}

#[test]
fn test_flatten_reports_basename_collisions() {
    let dir = temp_dir();
    let config = TestArchiveConfig::new("collide.mpq")
        .with_file(TestFile::new("a\\x.txt", b"first".to_vec()))
        .with_file(TestFile::new("b\\X.TXT", b"second".to_vec()));

    let flat = dir.path().join("flat");
    let mut archive = open_in_memory(&config);
    let report = extract_to_dir(&mut archive, &flat, &ExtractOptions::new().flatten(true)).unwrap();

    assert_eq!(fs::read(flat.join("x.txt")).unwrap(), b"first");
    assert_eq!(report.written.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].name, "b\\X.TXT");
    assert!(matches!(
        &report.failures[0].error,
        Error::NameCollision { existing, .. } if existing == "a\\x.txt"
    ));

    let mut archive = open_in_memory(&config);
    let report = extract_matching_to_dir(
        &mut archive,
        dir.path().join("matching"),
        &ExtractOptions::new().flatten(true),
        |name| name.ends_with(".txt") || name.ends_with(".TXT"),
    )
    .unwrap();
    assert_eq!(report.written.len(), 1);
    assert_eq!(report.failures.len(), 1);

    // Without flatten both members keep their directories
    let nested = dir.path().join("nested");
    let mut archive = open_in_memory(&config);
    let report = extract_to_dir(&mut archive, &nested, &ExtractOptions::new()).unwrap();
    assert!(report.is_complete(), "failures: {:?}", report.failures);
    assert_eq!(fs::read(nested.join("b").join("X.TXT")).unwrap(), b"second");
}

#[test]
fn test_failures_do_not_stop_extraction() {
    let dir = temp_dir();
    let out = dir.path().join("out");
    let config = TestArchiveConfig::new("hostile.mpq")
        .with_file(TestFile::new("good.txt", b"good".to_vec()))
        .with_file(TestFile::new("..\\escape.txt", b"evil".to_vec()))
        .with_file(
            TestFile::new("broken.dat", generate_compressible_data(3000))
                .with_options(FileOptions::compressed(flags::ZLIB))
                .unreadable(),
        )
        .with_file(TestFile::new("also\\good.txt", b"also good".to_vec()));
    let mut archive = open_in_memory(&config);

    let report = extract_to_dir(&mut archive, &out, &ExtractOptions::new()).unwrap();

    assert_eq!(fs::read(out.join("good.txt")).unwrap(), b"good");
    assert_eq!(fs::read(out.join("also").join("good.txt")).unwrap(), b"also good");
    assert!(!dir.path().join("escape.txt").exists());

    assert_eq!(report.failures.len(), 2);
    let unsafe_name = report
        .failures
        .iter()
        .find(|f| f.name == "..\\escape.txt")
        .unwrap();
    assert!(matches!(unsafe_name.error, Error::UnsafePath { .. }));

    let broken = report.failures.iter().find(|f| f.name == "broken.dat").unwrap();
    assert!(matches!(broken.error, Error::Compression(_)));
    assert!(broken.error.is_recoverable());
}

#[test]
fn test_extract_matching_localization() {
    let dir = temp_dir();
    let out = dir.path().join("map");
    let mut archive = open_in_memory(&TestArchiveConfig::map());

    let report = extract_matching_to_dir(&mut archive, &out, &ExtractOptions::new(), |name| {
        name == "Minimap.tga" || name.ends_with("\\LocalizedData\\GameStrings.txt")
    })
    .unwrap();

    let mut written: Vec<_> = report.written.iter().map(|f| f.name.as_str()).collect();
    written.sort_unstable();
    assert_eq!(
        written,
        vec![
            "Minimap.tga",
            "deDE.SC2Data\\LocalizedData\\GameStrings.txt",
            "enUS.SC2Data\\LocalizedData\\GameStrings.txt",
        ]
    );
    assert!(!out.join("MapScript.galaxy").exists());
    assert!(
        out.join("enUS.SC2Data")
            .join("LocalizedData")
            .join("GameStrings.txt")
            .is_file()
    );
}

#[test]
fn test_no_overwrite_reports_existing_files() {
    let dir = temp_dir();
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("test.txt"), b"keep me").unwrap();

    let mut archive = open_in_memory(&TestArchiveConfig::minimal());
    let report =
        extract_to_dir(&mut archive, &out, &ExtractOptions::new().overwrite(false)).unwrap();

    assert_eq!(fs::read(out.join("test.txt")).unwrap(), b"keep me");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].name, "test.txt");
    assert_eq!(report.written.len(), 1);
    assert_eq!(report.written[0].name, "(listfile)");
}
