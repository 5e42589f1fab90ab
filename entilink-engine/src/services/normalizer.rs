//! Name normalization
//!
//! [`normalize`] is the only legal producer of `name_normalized`. Every
//! creation and update path routes through it; constructing a comparison
//! key any other way breaks the uniqueness invariant on
//! `(entity_type, name_normalized)`.
//!
//! The pipeline runs in a fixed order: trim + lowercase + NFC, locale
//! transliteration, NFD decomposition with combining marks dropped, then
//! removal of all remaining non-alphanumeric characters. Whitespace is
//! gone after the last step, so "New  York" and "New York" produce the
//! same key without any separate collapsing logic.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Transliteration table selector.
///
/// Locales that share a table get byte-identical treatment; there is one
/// `German` arm for de-DE, de-AT and de-CH rather than three drifting
/// copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    Generic,
    German,
}

impl Locale {
    /// Map a BCP-47-style tag ("de", "de-AT", "de_CH") to its table.
    /// Unknown tags fall back to the generic table.
    pub fn from_tag(tag: &str) -> Self {
        let primary = tag
            .split(['-', '_'])
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        match primary.as_str() {
            "de" => Locale::German,
            _ => Locale::Generic,
        }
    }
}

/// Folds applied before diacritic stripping, so that "ü" becomes "ue"
/// rather than bare "u". Input is already lowercased.
const GERMAN_FOLDS: [(char, &str); 4] = [('ä', "ae"), ('ö', "oe"), ('ü', "ue"), ('ß', "ss")];

/// Leading administrative words that carry no identity ("Stadt
/// Gummersbach" and "Gummersbach" are the same municipality).
const GERMAN_ADMIN_PREFIXES: [&str; 3] = ["stadt ", "gemeinde ", "markt "];

/// Produce the canonical comparison key for a display name.
///
/// Deterministic and idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(name: &str, locale: Locale) -> String {
    // NFC first: a decomposed umlaut ("u" + U+0308) must hit the fold
    // table the same way the precomposed character does.
    let lowered: String = name.trim().to_lowercase().nfc().collect();
    let transliterated = match locale {
        Locale::German => {
            let stripped = strip_admin_prefixes(&lowered);
            fold_german(stripped)
        }
        Locale::Generic => lowered,
    };

    strip_diacritics(&transliterated)
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Derive a deterministic URL-safe slug from a display name.
///
/// Uses the same transliteration path as [`normalize`] but keeps word
/// boundaries as hyphens and does not strip administrative prefixes:
/// the slug represents the display name, not the comparison key.
pub fn slugify(name: &str, locale: Locale) -> String {
    let lowered: String = name.trim().to_lowercase().nfc().collect();
    let transliterated = match locale {
        Locale::German => fold_german(lowered),
        Locale::Generic => lowered,
    };

    let mut slug = String::with_capacity(transliterated.len());
    let mut pending_hyphen = false;
    for c in strip_diacritics(&transliterated).chars() {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

fn strip_admin_prefixes(name: &str) -> String {
    let mut s = name;
    loop {
        let mut stripped = false;
        for prefix in GERMAN_ADMIN_PREFIXES {
            if let Some(rest) = s.strip_prefix(prefix) {
                s = rest.trim_start();
                stripped = true;
            }
        }
        if !stripped {
            break;
        }
    }
    s.to_string()
}

fn fold_german(input: String) -> String {
    if !input.chars().any(|c| GERMAN_FOLDS.iter().any(|(f, _)| *f == c)) {
        return input;
    }
    let mut out = String::with_capacity(input.len() + 4);
    for c in input.chars() {
        match GERMAN_FOLDS.iter().find(|(f, _)| *f == c) {
            Some((_, replacement)) => out.push_str(replacement),
            None => out.push(c),
        }
    }
    out
}

/// NFD decomposition with combining marks dropped ("é" -> "e")
fn strip_diacritics(input: &str) -> String {
    input.nfd().filter(|c| !is_combining_mark(*c)).collect()
}
