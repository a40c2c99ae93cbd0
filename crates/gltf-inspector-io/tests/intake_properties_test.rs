use gltf_inspector_io::{glb, uri};
use proptest::prelude::*;

proptest! {
    #[test]
    fn glb_split_never_panics(mut data in prop::collection::vec(any::<u8>(), 0..256), patch_header in any::<bool>()) {
        if patch_header && data.len() >= 12 {
            data[0..4].copy_from_slice(b"glTF");
            data[4..8].copy_from_slice(&2u32.to_le_bytes());
        }
        let _ = glb::split(&data);
        let _ = glb::split_with(&data, false);
    }

    #[test]
    fn base64_never_panics(input in "[A-Za-z0-9+/=\\s*]{0,64}") {
        let _ = uri::decode_base64(&input);
    }

    #[test]
    fn percent_decode_keeps_plain_text(input in "[^%]{0,64}") {
        prop_assert_eq!(uri::percent_decode(&input), input.as_bytes().to_vec());
    }

    #[test]
    fn relative_paths_stay_under_root(name in "[a-z]{1,8}\\.bin") {
        let key = uri::resolve_relative("root/", &format!("./{}", name), true).unwrap();
        prop_assert_eq!(key, format!("root/{}", name));
    }
}
