#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use wifiqr_core::parse_payload;

#[derive(Arbitrary, Debug)]
struct Field {
    key: u8,
    value: String,
    escape: bool,
}

#[derive(Arbitrary, Debug)]
struct Payload {
    fields: Vec<Field>,
    terminated: bool,
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ';' | ':' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fuzz_target!(|input: Payload| {
    let mut text = String::from("WIFI:");
    let mut expected_ssid = None;

    for field in &input.fields {
        let key = match field.key % 4 {
            0 => "S",
            1 => "T",
            2 => "P",
            _ => "X",
        };
        let value = if field.escape {
            escape(&field.value)
        } else {
            field.value.clone()
        };
        if key == "S" && field.escape && expected_ssid.is_none() {
            expected_ssid = Some(field.value.clone());
        }
        text.push_str(key);
        text.push(':');
        text.push_str(&value);
        text.push(';');
    }
    if input.terminated {
        text.push(';');
    }

    let parsed = parse_payload(&text);

    // Only fully escaped payloads have a predictable outcome
    if input.fields.iter().all(|f| f.escape) {
        match (&parsed, &expected_ssid) {
            (Some(credential), Some(ssid)) => assert_eq!(credential.ssid(), ssid),
            (None, Some(ssid)) => assert!(ssid.is_empty()),
            (Some(_), None) => panic!("credential without an SSID field"),
            (None, None) => {}
        }
    }
});
