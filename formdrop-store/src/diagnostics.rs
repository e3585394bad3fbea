use serde::Serialize;
use std::path::Path;

/// Live filesystem facts about the store path, attached to error responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreDiagnostics {
    pub file_path: String,
    pub is_dir_writable: bool,
    pub file_exists: bool,
    pub file_writable: bool,
}

impl StoreDiagnostics {
    /// Probe `path` right now. Nothing is cached.
    pub fn probe(path: &Path) -> Self {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        Self {
            file_path: path.display().to_string(),
            is_dir_writable: is_writable(dir),
            file_exists: path.exists(),
            file_writable: is_writable(path),
        }
    }
}

/// `access(2)` with `W_OK`; false for anything that does not exist.
#[cfg(unix)]
fn is_writable(path: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    unsafe { libc::access(c_path.as_ptr(), libc::W_OK) == 0 }
}

#[cfg(not(unix))]
fn is_writable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_in_writable_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let diag = StoreDiagnostics::probe(&path);
        assert!(diag.is_dir_writable);
        assert!(!diag.file_exists);
        assert!(!diag.file_writable);
        assert_eq!(diag.file_path, path.display().to_string());
    }

    #[test]
    fn existing_file_is_reported_writable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "[]").unwrap();
        let diag = StoreDiagnostics::probe(&path);
        assert!(diag.file_exists);
        assert!(diag.file_writable);
    }

    #[test]
    fn missing_parent_directory_is_not_writable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone").join("store.json");
        let diag = StoreDiagnostics::probe(&path);
        assert!(!diag.is_dir_writable);
        assert!(!diag.file_exists);
    }

    #[test]
    fn serializes_with_envelope_field_names() {
        let diag = StoreDiagnostics {
            file_path: "/srv/submissions.json".into(),
            is_dir_writable: true,
            file_exists: false,
            file_writable: false,
        };
        let value = serde_json::to_value(&diag).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "file_path": "/srv/submissions.json",
                "is_dir_writable": true,
                "file_exists": false,
                "file_writable": false
            })
        );
    }
}
