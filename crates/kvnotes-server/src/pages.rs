//! HTML page rendering.
//!
//! Pages are static templates with a couple of placeholders; dynamic data
//! is embedded as JSON inside a `<script>` block. Markdown preview is
//! delegated to the `marked` library loaded from a CDN on the editor page.

use kvnotes_core::Note;
use serde_json::json;

const LOGIN_HTML: &str = include_str!("pages/login.html");
const CHANGE_PASSWORD_HTML: &str = include_str!("pages/change_password.html");
const DIRECTORY_HTML: &str = include_str!("pages/directory.html");
const NOTE_HTML: &str = include_str!("pages/note.html");
const ADMIN_HTML: &str = include_str!("pages/admin.html");

/// Inline response for an illegal note name: alert and navigate back.
pub const INVALID_NAME_FRAGMENT: &str =
    r#"<script>alert("Invalid note name");history.back();</script>"#;

/// The login page. `redirect` is the location to return to after login,
/// used when the session gate intercepted a page navigation.
pub fn login_page(redirect: &str) -> String {
    LOGIN_HTML.replace("__REDIRECT__", &js_value(&json!(redirect)))
}

/// The change-password form. Viewable without a session.
pub fn change_password_page() -> &'static str {
    CHANGE_PASSWORD_HTML
}

/// The notes directory page; content is fetched client-side via `/?list=1`.
pub fn directory_page() -> &'static str {
    DIRECTORY_HTML
}

/// The note editor page with the full record embedded.
pub fn note_page(name: &str, note: &Note) -> String {
    let mut record = serde_json::to_value(note).unwrap_or_else(|_| json!({}));
    if let Some(object) = record.as_object_mut() {
        object.insert("name".to_string(), json!(name));
    }
    NOTE_HTML.replace("__RECORD__", &js_value(&record))
}

/// The management page: bulk select, delete, and export.
pub fn admin_page() -> &'static str {
    ADMIN_HTML
}

/// Serialize a value for embedding inside a `<script>` block. `<` is
/// escaped so stored content cannot close the script element.
fn js_value(value: &serde_json::Value) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace('<', "\\u003c")
}
