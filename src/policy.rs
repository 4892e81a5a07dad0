//! Filename rules applied before any name touches the storage directory.

use std::path::{Component, Path, PathBuf};

pub const ALLOWED_EXTENSIONS: [&str; 11] = [
    "txt", "pdf", "png", "jpg", "jpeg", "gif", "zip", "doc", "docx", "mp4", "mp3",
];

/// True when the part after the last `.` is on the allow-list, ignoring case.
pub fn is_extension_allowed(filename: &str) -> bool {
    filename.rsplit_once('.').is_some_and(|(_, ext)| {
        let ext = ext.to_ascii_lowercase();
        ALLOWED_EXTENSIONS.contains(&ext.as_str())
    })
}

/// Reduces a client supplied filename to a flat storage key.
///
/// Directory components are dropped, whitespace runs become `_`, anything
/// outside `[A-Za-z0-9._-]` is removed and leading/trailing `.`, `-`, `_` are
/// trimmed. The result may be empty, in which case the caller must reject it.
pub fn sanitize(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();

    let mut out = String::with_capacity(base.len());
    let mut pending_space = false;
    for c in base.chars() {
        if c.is_whitespace() {
            pending_space = true;
        } else if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            if pending_space && !out.is_empty() {
                out.push('_');
            }
            pending_space = false;
            out.push(c);
        }
    }

    out.trim_matches(['.', '-', '_']).to_string()
}

/// Maps an untrusted name from a request path to a file inside `storage_dir`.
///
/// Only a single plain path component is accepted, so `..`, absolute paths
/// and anything with a separator resolve to `None`.
pub fn resolve(storage_dir: &Path, name: &str) -> Option<PathBuf> {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return None;
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) => Some(storage_dir.join(part)),
        _ => None,
    }
}
