//! Reading and writing document files

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value as Yaml;
use tracing::{debug, info};

use crate::error::DocumentError;

fn io_error(path: &Path, source: std::io::Error) -> DocumentError {
    DocumentError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Parse a YAML document from disk
///
/// # Errors
/// Returns error if the file cannot be read or is not valid YAML.
pub fn read_document(path: impl AsRef<Path>) -> Result<Yaml, DocumentError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    debug!(path = %path.display(), bytes = text.len(), "read document");
    Ok(serde_yaml::from_str(&text)?)
}

/// Write a YAML document to disk
///
/// Parent directories are created as needed. The text goes to a sibling
/// temporary file first and replaces `path` in one rename, so an existing
/// document is never left half written.
///
/// # Errors
/// Returns error if the document cannot be rendered or written.
pub fn write_document(path: impl AsRef<Path>, doc: &Yaml) -> Result<(), DocumentError> {
    let path = path.as_ref();
    let text = serde_yaml::to_string(doc)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }

    let staging = staging_path(path);
    fs::write(&staging, &text).map_err(|e| io_error(&staging, e))?;
    if let Err(e) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(io_error(path, e));
    }
    info!(path = %path.display(), bytes = text.len(), "wrote document");
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "document".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/config.yaml");
        let doc: Yaml = serde_yaml::from_str("configuration:\n  port: 5432\n").unwrap();

        write_document(&path, &doc).unwrap();
        assert_eq!(read_document(&path).unwrap(), doc);
        assert!(!dir.path().join("nested/out/.config.yaml.tmp").exists());
    }

    #[test]
    fn overwrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "old: true\n").unwrap();

        let doc: Yaml = serde_yaml::from_str("new: true\n").unwrap();
        write_document(&path, &doc).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new: true\n");
    }

    #[test]
    fn missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        let err = read_document(&path).unwrap_err();
        assert!(matches!(err, DocumentError::Io { .. }));
        assert!(err.to_string().contains("absent.yaml"));
    }

    #[test]
    fn invalid_yaml_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "key: [unclosed\n").unwrap();
        assert!(matches!(read_document(&path), Err(DocumentError::Yaml(_))));
    }
}
