#![no_main]

use libfuzzer_sys::fuzz_target;
use wifiqr_core::parse_payload;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Some(credential) = parse_payload(text) {
        assert!(!credential.ssid().is_empty());
        assert_ne!(credential.secret(), Some(""));
        let _ = credential.summary(false);
    }
});
