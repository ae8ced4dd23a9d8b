//! Name sanitizing for level and prefix segments

use crate::error::{PathError, Result};

/// Whether a character may appear in a path segment name
pub fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

/// Strip every character outside `[A-Za-z0-9_-]`.
///
/// This never fails; use [`sanitize_name`] when the result has to be usable
/// as a level name.
pub fn sanitize_key(raw: &str) -> String {
    raw.chars().filter(|ch| is_name_char(*ch)).collect()
}

/// Sanitize a raw name into a level name.
///
/// Rejects names that are empty after sanitizing, and purely numeric names,
/// which a path parser would read back as repeat indices.
pub fn sanitize_name(raw: &str) -> Result<String> {
    let name = sanitize_key(raw);
    if name.is_empty() || is_index_token(&name) {
        return Err(PathError::InvalidName(raw.to_string()));
    }
    Ok(name)
}

/// Whether a segment token is a numeric repeat index
pub fn is_index_token(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}
