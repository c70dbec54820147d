//! Property tests for name hashing, the stream cipher and name sanitizing

use comsat_mpq::crypto::{decrypt_bytes, encrypt_bytes, file_key, hash_string, hash_type};
use comsat_mpq::sanitize_member_name;
use proptest::prelude::*;
use std::path::Component;

proptest! {
    #[test]
    fn hash_ignores_case_and_separator(name in "[A-Za-z0-9_./\\\\]{1,40}") {
        let folded = name.to_ascii_lowercase().replace('/', "\\");
        for kind in [hash_type::TABLE_OFFSET, hash_type::NAME_A, hash_type::NAME_B, hash_type::FILE_KEY] {
            prop_assert_eq!(hash_string(&name, kind), hash_string(&folded, kind));
        }
    }

    #[test]
    fn cipher_round_trips(data in proptest::collection::vec(any::<u8>(), 0..256), key in any::<u32>()) {
        let mut buffer = data.clone();
        encrypt_bytes(&mut buffer, key);
        decrypt_bytes(&mut buffer, key);
        prop_assert_eq!(buffer, data);
    }

    #[test]
    fn cipher_leaves_partial_tail(data in proptest::collection::vec(any::<u8>(), 1..64), key in any::<u32>()) {
        let mut buffer = data.clone();
        decrypt_bytes(&mut buffer, key);
        let tail = data.len() / 4 * 4;
        prop_assert_eq!(&buffer[tail..], &data[tail..]);
    }

    #[test]
    fn file_key_uses_basename(dir in "[a-z]{1,8}", base in "[a-z]{1,8}\\.[a-z]{3}") {
        let nested = format!("{dir}\\{base}");
        prop_assert_eq!(file_key(&nested, 0, 0, false), file_key(&base, 0, 0, false));
        prop_assert_eq!(file_key(&nested, 0x200, 77, true), file_key(&base, 0x200, 77, true));
    }

    #[test]
    fn sanitized_paths_stay_relative(name in "\\PC{0,40}") {
        if let Ok(path) = sanitize_member_name(&name) {
            prop_assert!(path.is_relative());
            prop_assert!(path.components().all(|c| matches!(c, Component::Normal(_))));
        }
    }
}

#[test]
fn test_known_keys() {
    assert_eq!(hash_string("(hash table)", hash_type::FILE_KEY), 0xC3AF_3770);
    assert_eq!(hash_string("(block table)", hash_type::FILE_KEY), 0xEC83_B3A3);
    assert_eq!(
        hash_string("(listfile)", hash_type::TABLE_OFFSET),
        0x5F3D_E859
    );
}
