//! Reading and writing the persisted cluster snapshot, and parsing the API
//! schema document.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::cluster::ClusterIdentity;

/// Error type for configuration loading and persistence.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The API schema document could not be parsed.
    #[error("invalid API schema document: {0}")]
    Schema(String),

    /// The persisted snapshot exists but cannot be decoded.
    #[error("malformed cluster snapshot {}: {}", .path.display(), .message)]
    CorruptSnapshot { path: PathBuf, message: String },

    /// Writing the snapshot failed.
    #[error("failed to write cluster snapshot {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encoding the snapshot failed. Indicates a bug.
    #[error("failed to encode cluster snapshot: {0}")]
    Serialize(String),
}

impl ConfigError {
    /// Errors after which the process must not keep running with its
    /// current cluster identity.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConfigError::CorruptSnapshot { .. } | ConfigError::Serialize(_))
    }
}

/// On-disk encoding of the snapshot, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Yaml,
    Toml,
}

impl SnapshotFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => SnapshotFormat::Toml,
            _ => SnapshotFormat::Yaml,
        }
    }
}

/// Persisted document layout. Only the cluster identity is stored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SnapshotDocument {
    cluster: ClusterIdentity,
}

#[derive(Serialize)]
struct SnapshotDocumentRef<'a> {
    cluster: &'a ClusterIdentity,
}

/// Extract `basePath` from a JSON API schema document.
pub fn parse_base_path(schema: &[u8]) -> Result<String, ConfigError> {
    let doc: serde_json::Value =
        serde_json::from_slice(schema).map_err(|e| ConfigError::Schema(e.to_string()))?;
    match doc.get("basePath") {
        Some(serde_json::Value::String(base)) => Ok(base.clone()),
        Some(other) => Err(ConfigError::Schema(format!(
            "basePath must be a string, got {}",
            other
        ))),
        None => Err(ConfigError::Schema("missing basePath".to_string())),
    }
}

/// Outcome of reading the snapshot file.
#[derive(Debug)]
pub enum Snapshot {
    /// No file, or it could not be read: first-run bootstrap.
    Missing,
    /// The file exists but holds no document.
    Empty,
    /// A decoded identity.
    Loaded(ClusterIdentity),
}

/// Read the snapshot at `path`.
///
/// A file that exists but cannot be decoded, including content that is not
/// UTF-8, is a [`ConfigError::CorruptSnapshot`].
pub fn read_snapshot(path: &Path) -> Result<Snapshot, ConfigError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::info!(path = %path.display(), error = %e, "No readable cluster snapshot, using defaults");
            return Ok(Snapshot::Missing);
        }
    };

    let corrupt = |message: String| ConfigError::CorruptSnapshot {
        path: path.to_path_buf(),
        message,
    };

    let content = String::from_utf8(bytes).map_err(|e| corrupt(e.to_string()))?;

    let decoded = match SnapshotFormat::from_path(path) {
        SnapshotFormat::Yaml => {
            // Comment-only or blank YAML is an empty document, not an error.
            match serde_yaml::from_str::<Option<SnapshotDocument>>(&content) {
                Ok(None) => return Ok(Snapshot::Empty),
                Ok(Some(doc)) => Ok(doc),
                Err(e) => Err(e.to_string()),
            }
        }
        SnapshotFormat::Toml => {
            if content.trim().is_empty() {
                return Ok(Snapshot::Empty);
            }
            toml::from_str::<SnapshotDocument>(&content).map_err(|e| e.to_string())
        }
    };

    decoded.map(|doc| Snapshot::Loaded(doc.cluster)).map_err(corrupt)
}

/// Encode `cluster` in the format implied by `path`.
pub fn encode_snapshot(path: &Path, cluster: &ClusterIdentity) -> Result<String, ConfigError> {
    let doc = SnapshotDocumentRef { cluster };
    match SnapshotFormat::from_path(path) {
        SnapshotFormat::Yaml => {
            serde_yaml::to_string(&doc).map_err(|e| ConfigError::Serialize(e.to_string()))
        }
        SnapshotFormat::Toml => {
            toml::to_string(&doc).map_err(|e| ConfigError::Serialize(e.to_string()))
        }
    }
}

/// Write `cluster` to `path`, fully replacing previous contents.
///
/// Writes a uniquely named temp file in the same directory and renames it
/// over the target, so readers never see a half-written snapshot and
/// concurrent writers never share a temp file.
pub fn write_snapshot(path: &Path, cluster: &ClusterIdentity) -> Result<(), ConfigError> {
    let data = encode_snapshot(path, cluster)?;

    let io_err = |source: io::Error| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(data.as_bytes()).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_path() {
        assert_eq!(parse_base_path(br#"{"basePath":"/v2"}"#).unwrap(), "/v2");
    }

    #[test]
    fn test_parse_base_path_errors() {
        assert!(matches!(parse_base_path(b"not json"), Err(ConfigError::Schema(_))));
        assert!(matches!(parse_base_path(b"{}"), Err(ConfigError::Schema(_))));
        assert!(matches!(
            parse_base_path(br#"{"basePath":3}"#),
            Err(ConfigError::Schema(_))
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SnapshotFormat::from_path(Path::new("a.toml")), SnapshotFormat::Toml);
        assert_eq!(SnapshotFormat::from_path(Path::new("a.yaml")), SnapshotFormat::Yaml);
        assert_eq!(SnapshotFormat::from_path(Path::new("dataplane")), SnapshotFormat::Yaml);
    }

    #[test]
    fn test_fatal_classification() {
        let corrupt = ConfigError::CorruptSnapshot {
            path: PathBuf::from("x.yaml"),
            message: "bad".into(),
        };
        assert!(corrupt.is_fatal());
        assert!(ConfigError::Serialize("bug".into()).is_fatal());
        assert!(!ConfigError::Schema("bad".into()).is_fatal());
        let io = ConfigError::Io {
            path: PathBuf::from("x.yaml"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(!io.is_fatal());
        assert!(io.to_string().contains("x.yaml"));
    }

    #[test]
    fn test_yaml_document_layout() {
        let cluster = ClusterIdentity::default();
        cluster.mode.store("single".into());
        let yaml = encode_snapshot(Path::new("d.yaml"), &cluster).unwrap();
        assert!(yaml.starts_with("cluster:"));
        assert!(yaml.contains("  mode: single"));
    }

    #[test]
    fn test_toml_document_layout() {
        let cluster = ClusterIdentity::default();
        cluster.name.store("node-a".into());
        let text = encode_snapshot(Path::new("d.toml"), &cluster).unwrap();
        assert!(text.contains("[cluster]"));
        assert!(text.contains("name = \"node-a\""));
    }

    #[test]
    fn test_non_utf8_snapshot_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.yaml");
        fs::write(&path, b"cluster:\n  name: \xff\xfe\n").unwrap();
        let err = read_snapshot(&path).unwrap_err();
        assert!(matches!(err, ConfigError::CorruptSnapshot { .. }));
    }

    #[test]
    fn test_blank_and_comment_only_snapshots_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in [("a.yaml", ""), ("b.yaml", "# nothing yet\n"), ("c.toml", "\n")] {
            let path = dir.path().join(name);
            fs::write(&path, body).unwrap();
            assert!(matches!(read_snapshot(&path).unwrap(), Snapshot::Empty), "{}", name);
        }
        assert!(matches!(
            read_snapshot(&dir.path().join("absent.yaml")).unwrap(),
            Snapshot::Missing
        ));
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.yaml");
        let cluster = ClusterIdentity::default();
        cluster.name.store("node-a".into());
        write_snapshot(&path, &cluster).unwrap();
        write_snapshot(&path, &cluster).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert!(matches!(read_snapshot(&path).unwrap(), Snapshot::Loaded(c) if c.name.load() == "node-a"));
    }
}
