//! `WIFI:` QR payload parser
//!
//! Payload = "WIFI:" *(key ":" value ";") ";"
//!
//! Values escape `;`, `:` and `\` with a backslash. A field only counts when
//! its value is terminated by an unescaped `;`, so a missing final `;;` is
//! tolerated but a truncated trailing field is dropped.

use std::str::FromStr;

use crate::{Credential, PayloadError};

/// Literal every WiFi payload starts with
pub const PAYLOAD_PREFIX: &str = "WIFI:";

/// Field keys
const KEY_SSID: &str = "S";
const KEY_SECURITY: &str = "T";
const KEY_SECRET: &str = "P";

/// Parse a scanned payload, returning `None` for anything that is not a
/// usable WiFi credential.
pub fn parse_payload(text: &str) -> Option<Credential> {
    text.parse().ok()
}

impl FromStr for Credential {
    type Err = PayloadError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let body = text
            .strip_prefix(PAYLOAD_PREFIX)
            .ok_or(PayloadError::MissingPrefix)?;

        let mut ssid = None;
        let mut secret = None;
        let mut security_label = None;

        // First occurrence of each key wins
        for (key, value) in Fields::new(body) {
            match key {
                KEY_SSID if ssid.is_none() => ssid = Some(value),
                KEY_SECURITY if security_label.is_none() => security_label = Some(value),
                KEY_SECRET if secret.is_none() => secret = Some(value),
                _ => {}
            }
        }

        let mut credential = Credential::new(ssid.unwrap_or_default())?;
        if let Some(secret) = secret {
            credential = credential.with_secret(secret);
        }
        if let Some(label) = security_label {
            credential = credential.with_security_label(label);
        }
        Ok(credential)
    }
}

/// Iterator over decoded `key:value;` fields
struct Fields<'a> {
    rest: &'a str,
}

impl<'a> Fields<'a> {
    fn new(body: &'a str) -> Self {
        Fields { rest: body }
    }
}

impl<'a> Iterator for Fields<'a> {
    type Item = (&'a str, String);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // Empty field is the closing `;;`
            if self.rest.is_empty() || self.rest.starts_with(';') {
                self.rest = "";
                return None;
            }

            let Some(sep) = self.rest.find(|c: char| c == ':' || c == ';') else {
                self.rest = "";
                return None;
            };

            if self.rest.as_bytes()[sep] == b';' {
                // Field without a key separator
                self.rest = &self.rest[sep + 1..];
                continue;
            }

            let key = &self.rest[..sep];
            let Some((value, consumed)) = decode_value(&self.rest[sep + 1..]) else {
                self.rest = "";
                return None;
            };
            self.rest = &self.rest[sep + 1 + consumed..];
            return Some((key, value));
        }
    }
}

/// Decode one value up to the first unescaped `;`.
///
/// Returns the decoded value and the number of bytes consumed including the
/// terminator, or `None` when the input ends first. Decoding is a single pass;
/// decoded output is never scanned again.
fn decode_value(input: &str) -> Option<(String, usize)> {
    let mut value = String::new();
    let mut chars = input.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            ';' => return Some((value, idx + 1)),
            '\\' => match chars.peek() {
                Some(&(_, escaped @ (';' | ':' | '\\'))) => {
                    value.push(escaped);
                    chars.next();
                }
                // Unknown escape stays verbatim
                _ => value.push('\\'),
            },
            _ => value.push(c),
        }
    }

    None
}
