//! Text normalization for portal markup.
//!
//! The portal emits HTML with entity-escaped umlauts and, on some pages,
//! UTF-8 that was decoded as Latin-1/Windows-1252 once too often. Both are
//! repaired here before any parsing happens.

use html_escape::decode_html_entities;

/// Mis-decoded UTF-8 sequences and the characters they stand for.
///
/// Each German special character appears twice: once as its Windows-1252
/// rendering and once as its Latin-1 rendering (C1 control characters).
const UMLAUT_REPAIRS: &[(&str, &str)] = &[
    ("Ã¤", "ä"),
    ("Ã¶", "ö"),
    ("Ã¼", "ü"),
    ("Ã„", "Ä"),
    ("Ã–", "Ö"),
    ("Ãœ", "Ü"),
    ("ÃŸ", "ß"),
    ("Ã\u{84}", "Ä"),
    ("Ã\u{96}", "Ö"),
    ("Ã\u{9c}", "Ü"),
    ("Ã\u{9f}", "ß"),
];

/// Decode HTML entities, then repair mis-encoded umlauts.
pub fn normalize(raw: &str) -> String {
    let decoded = decode_html_entities(raw);
    repair_umlauts(&decoded)
}

/// Apply the fixed umlaut/ß replacement table.
pub fn repair_umlauts(text: &str) -> String {
    if !text.contains('Ã') {
        return text.to_string();
    }
    UMLAUT_REPAIRS
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// Turn raw response bytes into text without failing.
///
/// Valid UTF-8 runs are kept as-is; every byte that is not part of a valid
/// sequence is passed through as the Latin-1 character with the same value.
pub fn decode_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;

    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                out.push_str(&String::from_utf8_lossy(valid));
                let bad = e.error_len().unwrap_or(after.len());
                out.extend(after[..bad].iter().map(|&b| char::from(b)));
                rest = &after[bad..];
            }
        }
    }
}

/// Remove up to `max` newline sequences (`\n` or `\r\n`) from the very
/// start of `text`. Newlines elsewhere are untouched.
pub fn strip_leading_newlines(text: &str, max: usize) -> &str {
    let mut rest = text;
    for _ in 0..max {
        if let Some(stripped) = rest.strip_prefix("\r\n") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('\n') {
            rest = stripped;
        } else {
            break;
        }
    }
    rest
}

/// Strip quote characters and surrounding whitespace.
pub fn strip_quotes(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\'' | '"'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_decoded() {
        assert_eq!(normalize("Fu&szlig;note"), "Fußnote");
        assert_eq!(normalize("Pr&uuml;fung &amp; Klausur"), "Prüfung & Klausur");
    }

    #[test]
    fn test_umlaut_repair() {
        assert_eq!(normalize("PrÃ¼fungsamt"), "Prüfungsamt");
        assert_eq!(normalize("StraÃŸe"), "Straße");
        assert_eq!(normalize("Ã–ffnungszeiten"), "Öffnungszeiten");
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(normalize("Vorlesung fällt aus"), "Vorlesung fällt aus");
    }

    #[test]
    fn test_decode_bytes_passes_invalid_through() {
        assert_eq!(decode_bytes("Grüße".as_bytes()), "Grüße");
        // Latin-1 encoded "Prüfung"
        assert_eq!(decode_bytes(b"Pr\xfcfung"), "Prüfung");
        assert_eq!(decode_bytes(b"ende\xc3"), "ende\u{c3}");
    }

    #[test]
    fn test_strip_leading_newlines() {
        assert_eq!(strip_leading_newlines("\n\n\nText\n", 4), "Text\n");
        assert_eq!(strip_leading_newlines("\n\n\n\n\n\nText", 4), "\n\nText");
        assert_eq!(strip_leading_newlines("\r\n\nA\n\nB", 4), "A\n\nB");
        assert_eq!(strip_leading_newlines("A\nB", 4), "A\nB");
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("  '08:00:00' "), "08:00:00");
        assert_eq!(strip_quotes("\"Ihre Videokonferenz\"\n"), "Ihre Videokonferenz");
    }
}
