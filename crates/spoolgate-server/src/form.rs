// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Byte-exact decoding of the `application/x-www-form-urlencoded` print form.
//
// Raw jobs routinely carry bytes >= 0x80 (ESC/POS code pages, binary
// graphics), so `text` is decoded straight to bytes and never goes through
// a UTF-8 string.

use percent_encoding::percent_decode;

/// Fields of a POST /print body.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PrintForm {
    pub printer_name: String,
    pub text: Vec<u8>,
}

/// A body that is not well-formed form data.
#[derive(Debug, PartialEq, Eq)]
pub struct MalformedForm(pub String);

impl PrintForm {
    /// Decode a form body. The first occurrence of each field wins; unknown
    /// fields are ignored but must still be well-formed.
    pub fn parse(body: &[u8]) -> Result<Self, MalformedForm> {
        let mut printer_name = None;
        let mut text = None;

        for pair in body.split(|&b| b == b'&').filter(|pair| !pair.is_empty()) {
            let (key, value) = match pair.iter().position(|&b| b == b'=') {
                Some(eq) => (&pair[..eq], &pair[eq + 1..]),
                None => (pair, &[][..]),
            };
            let key = decode_component(key)?;
            let value = decode_component(value)?;
            match key.as_slice() {
                b"printerName" if printer_name.is_none() => printer_name = Some(value),
                b"text" if text.is_none() => text = Some(value),
                _ => {}
            }
        }

        Ok(Self {
            printer_name: printer_name
                .map(|name| String::from_utf8_lossy(&name).into_owned())
                .unwrap_or_default(),
            text: text.unwrap_or_default(),
        })
    }
}

/// `+` is a space; `%XX` is one byte. A `%` not followed by two hex digits
/// makes the whole body malformed.
fn decode_component(raw: &[u8]) -> Result<Vec<u8>, MalformedForm> {
    let bad_escape = raw.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && !raw
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    });
    if bad_escape {
        return Err(MalformedForm(format!(
            "invalid percent escape in {:?}",
            String::from_utf8_lossy(raw)
        )));
    }

    let spaced: Vec<u8> = raw
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    Ok(percent_decode(&spaced).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_bytes_survive_decoding() {
        let form = PrintForm::parse(b"printerName=Zebra&text=%1B%74%10caf%E9%80").expect("parse");
        assert_eq!(form.printer_name, "Zebra");
        assert_eq!(form.text, [0x1B, 0x74, 0x10, b'c', b'a', b'f', 0xE9, 0x80]);
    }

    #[test]
    fn plus_is_space_but_escaped_plus_is_literal() {
        let form = PrintForm::parse(b"text=a+b%2Bc&printerName=Front+Desk").expect("parse");
        assert_eq!(form.text, b"a b+c");
        assert_eq!(form.printer_name, "Front Desk");
    }

    #[test]
    fn first_value_wins_and_unknown_fields_are_ignored() {
        let form = PrintForm::parse(b"copies=2&text=one&text=two&printerName").expect("parse");
        assert_eq!(form.text, b"one");
        assert_eq!(form.printer_name, "");
    }

    #[test]
    fn missing_fields_are_empty() {
        assert_eq!(PrintForm::parse(b"").expect("parse"), PrintForm::default());
    }

    #[test]
    fn broken_escape_is_malformed() {
        for body in [&b"text=%zz"[..], b"text=abc%4", b"%G1=x", b"text=100%"] {
            assert!(PrintForm::parse(body).is_err(), "body: {:?}", body);
        }
    }
}
