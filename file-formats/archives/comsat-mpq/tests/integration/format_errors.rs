//! Malformed and truncated byte sources

use crate::common::{open_in_memory, open_patched};
use comsat_mpq::test_utils::{TestArchiveConfig, build_test_archive};
use comsat_mpq::{Archive, Error, OpenOptions};
use std::io::Cursor;

#[test]
fn test_not_an_archive() {
    let data: Vec<u8> = (0..0x1000u32).map(|i| (i * 7 % 251) as u8).collect();
    let err = Archive::from_reader(Cursor::new(data)).unwrap_err();
    assert!(matches!(err, Error::InvalidFormat(_)));
    assert!(err.is_corruption());

    assert!(matches!(
        Archive::from_reader(Cursor::new(Vec::new())),
        Err(Error::InvalidFormat(_))
    ));
}

#[test]
fn test_truncated_header() {
    let result = open_patched(&TestArchiveConfig::minimal(), |bytes| bytes.truncate(20));
    assert!(matches!(result, Err(Error::Truncated(_))));
}

#[test]
fn test_truncated_tables_behind_user_data() {
    let result = open_patched(&TestArchiveConfig::replay(), |bytes| {
        let len = bytes.len();
        bytes.truncate(len - 1);
    });
    let err = result.unwrap_err();
    assert!(matches!(err, Error::Truncated(_)));
    assert!(!err.is_recoverable());
}

#[test]
fn test_unsupported_version() {
    let result = open_patched(&TestArchiveConfig::minimal(), |bytes| {
        bytes[12..14].copy_from_slice(&5u16.to_le_bytes());
    });
    assert!(matches!(result, Err(Error::UnsupportedVersion(5))));
}

#[test]
fn test_hash_table_size_not_power_of_two() {
    let result = open_patched(&TestArchiveConfig::minimal(), |bytes| {
        bytes[24..28].copy_from_slice(&3u32.to_le_bytes());
    });
    assert!(matches!(result, Err(Error::HashTable(_))));
}

#[test]
fn test_header_search_window() {
    let mut bytes = vec![0u8; 0x400];
    bytes.extend(build_test_archive(&TestArchiveConfig::minimal()).unwrap());

    let limited = OpenOptions::new()
        .header_search_limit(0x400)
        .open_reader(Cursor::new(bytes.clone()));
    assert!(matches!(limited, Err(Error::InvalidFormat(_))));

    let mut archive = Archive::from_reader(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.archive_offset(), 0x400);
    assert_eq!(archive.read_file("test.txt").unwrap(), b"Hello, MPQ!");
}

#[test]
fn test_corrupt_sector_offsets_affect_one_file() {
    let config = TestArchiveConfig::comprehensive();
    let info = open_in_memory(&config).find_file("data\\zlib.dat").unwrap();

    let mut archive = open_patched(&config, |bytes| {
        // Second sector offset goes backwards
        let at = info.file_pos as usize + 4;
        bytes[at..at + 4].copy_from_slice(&0u32.to_le_bytes());
    })
    .unwrap();

    let err = archive.read_file("data\\zlib.dat").unwrap_err();
    assert!(matches!(err, Error::Corrupted(_)));
    assert!(err.is_corruption());

    assert_eq!(archive.read_file("readme.txt").unwrap(), b"MPQ test archive\n");
}

#[test]
fn test_unsupported_codec_is_a_decompression_error() {
    let config = TestArchiveConfig::comprehensive();
    let info = open_in_memory(&config).find_file("data\\zlib.dat").unwrap();

    let mut archive = open_patched(&config, |bytes| {
        let pos = info.file_pos as usize;
        let first = u32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize;
        // 0x04 is not a known method bit
        bytes[pos + first] = 0x04;
    })
    .unwrap();

    assert!(matches!(
        archive.read_file("data\\zlib.dat"),
        Err(Error::Compression(_))
    ));
}

/// Turn the replay's v1 header at 0x200 into a v2 header with the given
/// hi-block table position. The 12 extra bytes overlay the start of the hash
/// table, which is never read when the bounds check fails.
fn replay_with_hi_block_table(hi_pos: u64) -> comsat_mpq::Result<Archive<Cursor<Vec<u8>>>> {
    open_patched(&TestArchiveConfig::replay(), |bytes| {
        bytes[0x204..0x208].copy_from_slice(&0x2Cu32.to_le_bytes());
        bytes[0x20C..0x20E].copy_from_slice(&1u16.to_le_bytes());
        bytes[0x220..0x228].copy_from_slice(&hi_pos.to_le_bytes());
        bytes[0x228..0x22C].fill(0);
    })
}

#[test]
fn test_hi_block_table_position_overflow() {
    let result = replay_with_hi_block_table(u64::MAX);
    assert!(matches!(result, Err(Error::InvalidFormat(_))));
}

#[test]
fn test_hi_block_table_past_end() {
    let result = replay_with_hi_block_table(0x1000_0000);
    assert!(matches!(result, Err(Error::Truncated(_))));
}
