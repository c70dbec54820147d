//! Reading replay and map shaped archives through the public API

use crate::common::{init_logging, open_in_memory, temp_dir};
use comsat_mpq::test_utils::{
    FileOptions, TestArchiveConfig, TestFile, build_test_archive, create_test_archive,
    generate_compressible_data,
};
use comsat_mpq::{Archive, Error, HashSlot, OpenOptions};
use pretty_assertions::assert_eq;
use std::io::Cursor;

#[test]
fn test_replay_from_disk() {
    init_logging();
    let dir = temp_dir();
    let config = TestArchiveConfig::replay();
    let path = create_test_archive(dir.path(), &config).unwrap();

    let mut archive = Archive::open(&path).unwrap();
    assert_eq!(archive.path(), Some(path.as_path()));
    assert_eq!(archive.archive_offset(), 0x200);
    assert_eq!(
        archive.user_data().map(|ud| ud.content.clone()),
        config.user_data.clone()
    );

    for file in &config.files {
        assert_eq!(
            archive.read_file(&file.name).unwrap(),
            file.data,
            "content of {}",
            file.name
        );
    }
}

#[test]
fn test_every_storage_layout() {
    let config = TestArchiveConfig::comprehensive();
    let mut archive = open_in_memory(&config);

    for file in &config.files {
        let data = archive
            .read_file(&file.name)
            .unwrap_or_else(|e| panic!("{} failed: {e}", file.name));
        assert_eq!(data, file.data, "content of {}", file.name);
    }
}

#[test]
fn test_forward_slashes_resolve() {
    let mut archive = open_in_memory(&TestArchiveConfig::comprehensive());
    assert_eq!(
        archive.read_file("data/zlib.dat").unwrap(),
        archive.read_file("DATA\\ZLIB.DAT").unwrap()
    );
}

#[test]
fn test_list_names_drops_dangling_entries() {
    let mut archive = open_in_memory(&TestArchiveConfig::comprehensive());
    let names = archive.list_names().unwrap();

    assert_eq!(
        names,
        vec![
            "empty.txt",
            "readme.txt",
            "data\\zlib.dat",
            "data\\bzip2.dat",
            "data\\lzma.dat",
            "data\\sparse.dat",
            "data\\implode.dat",
            "secure\\fixed.bin",
            "secure\\plain.bin",
            "crc\\checked.dat",
            "tombstone\\after.txt",
            "(listfile)",
        ]
    );
    assert!(!names.iter().any(|n| n == "hidden.bin"));
}

#[test]
fn test_list_reports_sizes_and_flags() {
    let config = TestArchiveConfig::replay();
    let mut archive = open_in_memory(&config);
    let entries = archive.list().unwrap();

    assert_eq!(entries.len(), 5);
    let details = entries
        .iter()
        .find(|e| e.name == "replay.details")
        .unwrap();
    assert_eq!(details.size, 3000);
    assert!(details.is_compressed());
    assert!(details.is_encrypted());
    assert!(details.compressed_size < details.size);

    let attributes = entries
        .iter()
        .find(|e| e.name == "replay.attributes.events")
        .unwrap();
    assert!(!attributes.is_compressed());
    assert!(attributes.is_encrypted());
}

#[test]
fn test_probe_continues_past_tombstone() {
    let mut archive = open_in_memory(&TestArchiveConfig::comprehensive());

    assert!(
        archive
            .hash_table()
            .entries()
            .iter()
            .any(|e| e.slot == HashSlot::Deleted)
    );
    assert_eq!(archive.read_file("tombstone\\after.txt").unwrap(), b"found me");
}

#[test]
fn test_locale_preference() {
    let config = TestArchiveConfig::new("locales.mpq")
        .with_file(TestFile::new("strings.txt", b"neutral".to_vec()))
        .with_file(TestFile::new("strings.txt", b"german".to_vec()).with_locale(0x0407))
        .with_file(TestFile::new("only_german.txt", b"nur".to_vec()).with_locale(0x0407));
    let bytes = build_test_archive(&config).unwrap();

    let mut neutral = Archive::from_reader(Cursor::new(bytes.clone())).unwrap();
    assert_eq!(neutral.read_file("strings.txt").unwrap(), b"neutral");
    assert_eq!(neutral.read_file("only_german.txt").unwrap(), b"nur");

    let mut german = OpenOptions::new()
        .locale(0x0407)
        .open_reader(Cursor::new(bytes.clone()))
        .unwrap();
    assert_eq!(german.read_file("strings.txt").unwrap(), b"german");
    assert_eq!(german.find_file("strings.txt").unwrap().locale, 0x0407);

    let mut english = OpenOptions::new()
        .locale(0x0409)
        .open_reader(Cursor::new(bytes))
        .unwrap();
    assert_eq!(english.read_file("strings.txt").unwrap(), b"neutral");
}

#[test]
fn test_extract_all_comprehensive() {
    let config = TestArchiveConfig::comprehensive();
    let mut archive = open_in_memory(&config);
    let all = archive.extract_all();

    assert!(all.is_complete(), "failures: {:?}", all.failures);
    // 12 files plus the (listfile); removed blocks are skipped
    assert_eq!(all.files.len(), 13);
    assert_eq!(all.files["readme.txt"], b"MPQ test archive\n");
    assert!(all.files["empty.txt"].is_empty());

    let hidden = config.files.iter().find(|f| f.name == "hidden.bin").unwrap();
    assert_eq!(all.files["file_00000011.dat"], hidden.data);
}

#[test]
fn test_unnamed_encrypted_block_fails_alone() {
    let config = TestArchiveConfig::new("partial.mpq")
        .with_file(TestFile::new("visible.txt", b"visible".to_vec()))
        .with_file(
            TestFile::new("secret.bin", generate_compressible_data(2000))
                .with_options(FileOptions::compressed(comsat_mpq::compression::flags::ZLIB).encrypted())
                .unlisted(),
        );
    let mut archive = open_in_memory(&config);
    let all = archive.extract_all();

    assert_eq!(all.files["visible.txt"], b"visible");
    assert_eq!(all.failures.len(), 1);
    assert_eq!(all.failures[0].name, "file_00000001.dat");
    assert_eq!(all.failures[0].block_index, Some(1));
    assert!(matches!(all.failures[0].error, Error::Crypto(_)));

    // Known by name, the same block decodes
    assert_eq!(
        archive.read_file("secret.bin").unwrap(),
        generate_compressible_data(2000)
    );
}

#[test]
fn test_synthetic_name_taken_by_listed_member() {
    let config = TestArchiveConfig::new("shadow.mpq")
        .with_file(TestFile::new("visible.txt", b"visible".to_vec()))
        .with_file(TestFile::new("unnamed.bin", b"unnamed".to_vec()).unlisted())
        .with_file(TestFile::new("file_00000001.dat", b"listed".to_vec()));
    let mut archive = open_in_memory(&config);
    let all = archive.extract_all();

    assert_eq!(all.files["file_00000001.dat"], b"listed");
    assert_eq!(all.failures.len(), 1);
    assert_eq!(all.failures[0].block_index, Some(1));
    assert!(matches!(
        &all.failures[0].error,
        Error::NameCollision { existing, .. } if existing == "file_00000001.dat"
    ));
}

#[test]
fn test_sector_checksum_verification() {
    let config = TestArchiveConfig::comprehensive();
    let mut bytes = build_test_archive(&config).unwrap();

    let info = Archive::from_reader(Cursor::new(bytes.clone()))
        .unwrap()
        .find_file("crc\\checked.dat")
        .unwrap();
    assert!(info.has_sector_crc());

    // The last byte of the block belongs to the last sector checksum
    let last = (info.file_pos + info.compressed_size - 1) as usize;
    bytes[last] ^= 0x40;

    let mut verified = Archive::from_reader(Cursor::new(bytes.clone())).unwrap();
    assert!(matches!(
        verified.read_file("crc\\checked.dat"),
        Err(Error::ChecksumMismatch { .. })
    ));

    let mut unverified = OpenOptions::new()
        .verify_crc(false)
        .open_reader(Cursor::new(bytes))
        .unwrap();
    let original = config
        .files
        .iter()
        .find(|f| f.name == "crc\\checked.dat")
        .unwrap();
    assert_eq!(unverified.read_file("crc\\checked.dat").unwrap(), original.data);
}

#[test]
fn test_map_localization_files() {
    let mut archive = open_in_memory(&TestArchiveConfig::map());

    assert_eq!(
        archive
            .read_file("deDE.SC2Data\\LocalizedData\\GameStrings.txt")
            .unwrap(),
        b"Map/Name=Verlorener Tempel\r\n"
    );
    assert_eq!(archive.read_file("Minimap.tga").unwrap().len(), 4096);
    assert!(archive.read_file("MapScript.galaxy").is_ok());
}
