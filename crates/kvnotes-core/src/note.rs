//! Note data model and name rules.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::keys;

/// Maximum length of a note name, in characters.
pub const MAX_NAME_LEN: usize = 50;

/// Alphabet for auto-generated note names (ambiguous glyphs excluded).
const RANDOM_NAME_CHARS: &[u8] = b"234579abcdefghjkmnpqrstwxyz";
const RANDOM_NAME_LEN: usize = 5;

/// A stored note record, one KV entry per note name.
///
/// Timestamps are optional on read so that a hand-written or corrupted
/// record still loads; every record written by [`crate::NoteStore`] carries
/// both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Note {
    /// Wrap a raw stored value that failed to parse as a note record.
    pub fn from_raw_content(content: String) -> Self {
        Self {
            content,
            ..Self::default()
        }
    }
}

/// One row of the denormalized notes index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    #[serde(default)]
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Populated only by listings requested with `includeContent`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Validate a note name.
///
/// Rejects empty names, names longer than [`MAX_NAME_LEN`] characters,
/// control characters (0x00-0x1F, 0x7F), path separators, and names that
/// collide with a reserved store key.
pub fn is_valid_note_name(name: &str) -> bool {
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return false;
    }
    if name
        .chars()
        .any(|c| c < '\u{20}' || c == '\u{7F}' || c == '/' || c == '\\')
    {
        return false;
    }
    !keys::is_reserved(name)
}

/// Generate a fresh 5-character note name for writes addressed to `/`.
pub fn random_note_name() -> String {
    let mut rng = rand::rng();
    (0..RANDOM_NAME_LEN)
        .map(|_| char::from(RANDOM_NAME_CHARS[rng.random_range(0..RANDOM_NAME_CHARS.len())]))
        .collect()
}

/// Parse a note name as a numeric id, taking leading ASCII digits.
///
/// `"12"` and `"12abc"` both yield 12; `"abc"` and `""` yield `None`.
/// The prefix rule matches how the original listing sorted mixed names.
pub fn numeric_name(name: &str) -> Option<i64> {
    let digits: &str = name
        .find(|c: char| !c.is_ascii_digit())
        .map_or(name, |end| &name[..end]);
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(is_valid_note_name("1"));
        assert!(is_valid_note_name("groceries"));
        assert!(is_valid_note_name("Meeting Notes 2026"));
        assert!(is_valid_note_name(&"x".repeat(50)));
    }

    #[test]
    fn invalid_names() {
        assert!(!is_valid_note_name(""));
        assert!(!is_valid_note_name(&"x".repeat(51)));
        assert!(!is_valid_note_name("a/b"));
        assert!(!is_valid_note_name("a\\b"));
        assert!(!is_valid_note_name("a\nb"));
        assert!(!is_valid_note_name("a\u{0}b"));
        assert!(!is_valid_note_name("a\u{7F}b"));
    }

    #[test]
    fn reserved_keys_rejected() {
        assert!(!is_valid_note_name("__index__"));
        assert!(!is_valid_note_name("password"));
        assert!(!is_valid_note_name("__session__"));
    }

    #[test]
    fn random_names_are_valid() {
        for _ in 0..100 {
            let name = random_note_name();
            assert_eq!(name.len(), 5);
            assert!(is_valid_note_name(&name));
        }
    }

    #[test]
    fn numeric_name_prefix_parse() {
        assert_eq!(numeric_name("12"), Some(12));
        assert_eq!(numeric_name("12abc"), Some(12));
        assert_eq!(numeric_name("007"), Some(7));
        assert_eq!(numeric_name("abc"), None);
        assert_eq!(numeric_name(""), None);
        assert_eq!(numeric_name("-3"), None);
    }

    #[test]
    fn corrupt_record_falls_back_to_raw_content() {
        let note = Note::from_raw_content("just text".to_string());
        assert_eq!(note.content, "just text");
        assert_eq!(note.title, "");
        assert!(note.created_at.is_none());
    }

    #[test]
    fn note_serializes_without_absent_timestamps() {
        let json = serde_json::to_string(&Note::from_raw_content("c".into())).unwrap();
        assert!(!json.contains("created_at"));
    }
}
