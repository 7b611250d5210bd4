//! Non-finite number literals in JSON-ish text.
//!
//! The audit log is written by a serializer that emits `NaN`, `Infinity`
//! and `-Infinity` as bare tokens. Strict JSON rejects them, so they are
//! rewritten to `null` before decoding. Tokens inside string literals and
//! tokens that are part of a longer identifier are left alone.

use std::borrow::Cow;

const NON_FINITE: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

/// Replace every unquoted non-finite literal with `null`.
///
/// Returns the input unchanged (borrowed) when nothing needed rewriting.
pub fn repair_non_finite(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        if b == b'"' {
            in_string = true;
            i += 1;
            continue;
        }

        if i == 0 || !is_ident_byte(bytes[i - 1]) {
            if let Some(token) = NON_FINITE.iter().find(|t| bytes[i..].starts_with(t.as_bytes())) {
                let end = i + token.len();
                if end == bytes.len() || !is_ident_byte(bytes[end]) {
                    let buf = out.get_or_insert_with(|| String::with_capacity(text.len()));
                    buf.push_str(&text[copied..i]);
                    buf.push_str("null");
                    copied = end;
                    i = end;
                    continue;
                }
            }
        }

        i += 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&text[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(text),
    }
}

// Non-ASCII bytes count as identifier bytes so multi-byte characters are never split.
fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b >= 0x80
}
