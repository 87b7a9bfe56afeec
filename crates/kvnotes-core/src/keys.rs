//! Reserved store keys.
//!
//! The index, password, and session map share one key namespace with the
//! notes themselves, so note-name validation must reject these values
//! (see [`crate::note::is_valid_note_name`]).

/// Key holding the denormalized notes index (one JSON array).
pub const INDEX_KEY: &str = "__index__";

/// Key holding the single shared password.
pub const PASSWORD_KEY: &str = "password";

/// Key holding the session map (one JSON object).
pub const SESSION_KEY: &str = "__session__";

/// Effective password when none has been stored yet.
pub const DEFAULT_PASSWORD: &str = "admin";

/// All keys that may never be used as a note name.
pub const RESERVED_KEYS: &[&str] = &[INDEX_KEY, PASSWORD_KEY, SESSION_KEY];

/// Check whether a name collides with a reserved store key.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_KEYS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_keys_are_reserved() {
        assert!(is_reserved("__index__"));
        assert!(is_reserved("password"));
        assert!(is_reserved("__session__"));
        assert!(!is_reserved("groceries"));
        assert!(!is_reserved("1"));
    }
}
