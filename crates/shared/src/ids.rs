//! Public identifier and slug generation for churches.
//!
//! Public IDs are the stable lookup key printed on QR codes:
//! 20 random characters from `[0-9a-z]`, grouped 5-5-5-5 with dashes
//! (e.g. `abc12-def34-ghi56-jkl78`). Slugs are derived from the church
//! name with a random suffix to keep them unique without a lookup.

use rand::Rng;

const PUBLIC_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const PUBLIC_ID_CHARS: usize = 20;
const PUBLIC_ID_GROUP: usize = 5;
const SLUG_SUFFIX_CHARS: usize = 6;

/// Generates a new public church identifier in `xxxxx-xxxxx-xxxxx-xxxxx` form.
pub fn generate_public_id() -> String {
    let mut rng = rand::thread_rng();
    let mut out = String::with_capacity(PUBLIC_ID_CHARS + 3);
    for i in 0..PUBLIC_ID_CHARS {
        if i > 0 && i % PUBLIC_ID_GROUP == 0 {
            out.push('-');
        }
        let idx = rng.gen_range(0..PUBLIC_ID_ALPHABET.len());
        out.push(PUBLIC_ID_ALPHABET[idx] as char);
    }
    out
}

/// Checks whether a string has the public-ID shape.
///
/// Used to reject obviously malformed IDs before hitting the database.
pub fn is_valid_public_id(id: &str) -> bool {
    let groups: Vec<&str> = id.split('-').collect();
    groups.len() == 4
        && groups.iter().all(|g| {
            g.len() == PUBLIC_ID_GROUP
                && g.bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        })
}

/// Converts a display name into a URL-safe slug base.
///
/// Lowercases, replaces every run of non-alphanumeric characters with a
/// single hyphen, and trims leading/trailing hyphens.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    out
}

/// Builds a unique slug: the slugified name plus a short random suffix.
///
/// The suffix makes collisions between same-named churches vanishingly
/// unlikely without a uniqueness round-trip to the database.
pub fn generate_unique_slug(name: &str) -> String {
    let base = slugify(name);
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SLUG_SUFFIX_CHARS)
        .map(|_| {
            let idx = rng.gen_range(0..PUBLIC_ID_ALPHABET.len());
            PUBLIC_ID_ALPHABET[idx] as char
        })
        .collect();

    if base.is_empty() {
        suffix
    } else {
        format!("{}-{}", base, suffix)
    }
}
