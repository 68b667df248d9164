//! Slug generation
//!
//! Turns a (typically Russian) title into an ASCII, URL-safe slug:
//! Cyrillic is transliterated, everything is lowercased, punctuation is
//! removed and runs of whitespace or hyphens become a single `-`.

use once_cell::sync::Lazy;
use regex::Regex;

static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_\s-]").expect("valid regex"));
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-\s]+").expect("valid regex"));

/// Latin replacement for a lowercase Cyrillic letter
fn transliterate_char(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "j",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        // Ukrainian
        'є' => "ye",
        'і' => "i",
        'ї' => "yi",
        'ґ' => "g",
        _ => return None,
    };
    Some(latin)
}

/// Transliterate Cyrillic letters, leaving every other character in place.
///
/// Output is lowercase.
pub fn transliterate(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars().flat_map(char::to_lowercase) {
        match transliterate_char(c) {
            Some(latin) => out.push_str(latin),
            None => out.push(c),
        }
    }
    out
}

/// Build a slug from `input`.
///
/// ```
/// use newsnotes::slug::slugify;
///
/// assert_eq!(slugify("New Note"), "new-note");
/// assert_eq!(slugify("Моя заметка"), "moya-zametka");
/// ```
pub fn slugify(input: &str) -> String {
    let latin = transliterate(input);
    let cleaned = DISALLOWED.replace_all(&latin, "");
    let joined = SEPARATORS.replace_all(cleaned.trim(), "-");
    joined.trim_matches('-').to_string()
}

/// Slugify and cap the result at `max_len` characters.
///
/// The slug is cut at a character boundary and never ends with `-`.
pub fn slugify_truncated(input: &str, max_len: usize) -> String {
    let slug = slugify(input);
    match slug.char_indices().nth(max_len) {
        Some((idx, _)) => slug[..idx].trim_end_matches('-').to_string(),
        None => slug,
    }
}

/// Whether `slug` only contains ASCII letters, digits, `-` and `_`
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
