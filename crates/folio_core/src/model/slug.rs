//! Slug and image-prefix derivation.
//!
//! # Invariants
//! - `slugify` output only contains `[a-z0-9_-]` and is idempotent.
//! - `img_prefix` always starts with the `YYYY-MM-` of the creation date.

use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s").expect("valid ws regex"));
static DISALLOWED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_-]").expect("valid slug charset regex"));

/// Applied in order, before whitespace replacement.
const DASH_SEQUENCES: &[&str] = &["\u{2014}", "\u{2013}", " - ", " -- "];

const TRANSLITERATIONS: &[(char, char)] = &[
    ('á', 'a'),
    ('à', 'a'),
    ('â', 'a'),
    ('ä', 'a'),
    ('ã', 'a'),
    ('é', 'e'),
    ('è', 'e'),
    ('ê', 'e'),
    ('ë', 'e'),
    ('í', 'i'),
    ('ì', 'i'),
    ('î', 'i'),
    ('ï', 'i'),
    ('ó', 'o'),
    ('ò', 'o'),
    ('ô', 'o'),
    ('ö', 'o'),
    ('õ', 'o'),
    ('ú', 'u'),
    ('ù', 'u'),
    ('û', 'u'),
    ('ü', 'u'),
    ('ñ', 'n'),
    ('ç', 'c'),
];

const IMG_PREFIX_MAX_WORDS: usize = 3;
const IMG_PREFIX_MIN_WORD_LEN: usize = 3;

/// Converts free text into an address-safe slug.
pub fn slugify(value: &str) -> String {
    let mut slug = value.to_lowercase();
    for sequence in DASH_SEQUENCES {
        slug = slug.replace(sequence, "-");
    }
    let slug = WHITESPACE_RE.replace_all(&slug, "-");
    let slug: String = slug.chars().map(transliterate).collect();
    DISALLOWED_RE.replace_all(&slug, "").into_owned()
}

/// Builds the image prefix for a post from its creation date and title.
///
/// Titles of up to three space-separated words are used whole. Longer titles
/// keep the first three words that are longer than three bytes or purely
/// numeric.
pub fn img_prefix(date_created: &DateTime<FixedOffset>, title: &str) -> String {
    let prefix = date_created.format("%Y-%m-").to_string();
    let words: Vec<&str> = title.split(' ').collect();
    if words.len() <= IMG_PREFIX_MAX_WORDS {
        return format!("{prefix}{}", slugify(&words.join("-")));
    }

    let significant: Vec<&str> = words
        .into_iter()
        .filter(|word| word.len() > IMG_PREFIX_MIN_WORD_LEN || is_numeric(word))
        .take(IMG_PREFIX_MAX_WORDS)
        .collect();
    format!("{prefix}{}", slugify(&significant.join("-")))
}

fn transliterate(c: char) -> char {
    TRANSLITERATIONS
        .iter()
        .find(|(accented, _)| *accented == c)
        .map_or(c, |(_, plain)| *plain)
}

fn is_numeric(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| c.is_ascii_digit())
}
