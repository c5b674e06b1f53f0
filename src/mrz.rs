//! Transliterates subject names into ICAO 9303 Machine-Readable-Zone form,
//! the `[A-Z0-9<]` alphabet used for `nam.fnt`/`nam.gnt`.
//!
//! Grounded on the `normalize_name` helper used by vaccination-certificate
//! barcode generators in the wild (fixed multi-letter expansion table +
//! NFD-strip-combining-marks), extended here with the full expansion table,
//! apostrophe handling and the 80-character MRZ line cap.

use thiserror::Error;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// MRZ transliteration never actually fails (every input has *some* valid
/// MRZ rendering, even if it ends up empty); this exists so call sites that
/// route through [`crate::Error`] have something to convert from.
#[derive(Error, Debug)]
pub enum MrzError {
    /// Placeholder variant; transliteration is a total function today.
    #[error("MRZ transliteration error: {0}")]
    Unreachable(String),
}

const MAX_MRZ_LEN: usize = 80;

fn expand(c: char) -> Option<&'static str> {
    match c {
        'Å' | 'å' => Some("AA"),
        'Ä' | 'ä' | 'Æ' | 'æ' => Some("AE"),
        'Ö' | 'ö' | 'Ø' | 'ø' => Some("OE"),
        'Ü' | 'ü' => Some("UE"),
        'ß' => Some("SS"),
        'Œ' | 'œ' => Some("OE"),
        'Ð' => Some("D"),
        'Ĳ' | 'ĳ' => Some("IJ"),
        _ => None,
    }
}

/// Transliterates `input` to MRZ form.
///
/// Idempotent: re-running this on an already-transliterated string returns
/// it unchanged (modulo the 80-character cap, which is already enforced).
pub fn transliterate(input: &str) -> String {
    let trimmed = input.trim();

    // Pass 1: apply the fixed expansion table, drop apostrophes, collapse
    // whitespace runs to a single '<'.
    let mut expanded = String::with_capacity(trimmed.len());
    let mut in_whitespace_run = false;
    for c in trimmed.chars() {
        if c == '\'' || c == '\u{2019}' {
            continue;
        }
        if c.is_whitespace() {
            if !in_whitespace_run {
                expanded.push('<');
                in_whitespace_run = true;
            }
            continue;
        }
        in_whitespace_run = false;
        if let Some(replacement) = expand(c) {
            expanded.push_str(replacement);
        } else {
            expanded.push(c);
        }
    }

    // Pass 2: NFD-normalise and drop anything left that isn't ASCII (strips
    // combining marks plus any untabulated script entirely, rather than
    // turning it into '<').
    let ascii_only: String = expanded
        .nfd()
        .filter(|c| !is_combining_mark(*c) && c.is_ascii())
        .collect();

    // Pass 3: uppercase, then replace anything outside [A-Z0-9<] with '<'.
    let mut result: String = ascii_only
        .to_uppercase()
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() || c.is_ascii_digit() || c == '<' {
                c
            } else {
                '<'
            }
        })
        .collect();

    if result.chars().count() > MAX_MRZ_LEN {
        result = result.chars().take(MAX_MRZ_LEN).collect();
        if result.ends_with('<') {
            result.pop();
        }
    }

    result
}
