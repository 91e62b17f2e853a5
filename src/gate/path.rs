//! Request path normalization

use std::fmt;

/// A cleaned, relative asset path that cannot climb out of the store root
///
/// Segments are joined with `/`; there are no empty, `.` or `..` segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetPath(String);

impl AssetPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, used for `Content-Type` and `Content-Disposition`
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Individual segments, root first
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lexically clean `raw` relative to the store root
///
/// Repeated slashes and `.` segments are dropped and `..` removes the
/// preceding segment. Returns `None` when nothing names a file: an empty
/// result, a `..` that would leave the root, or an embedded NUL.
pub fn normalize(raw: &str) -> Option<AssetPath> {
    if raw.contains('\0') {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return None;
    }
    Some(AssetPath(segments.join("/")))
}
