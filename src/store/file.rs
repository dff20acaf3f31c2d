use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{merge_documents, Document, DocumentStore};
use crate::error::PersistenceError;

/// Stores each document as pretty-printed JSON at `<root>/<key>.json`.
///
/// Keys are `/`-separated paths such as `games/partidaActual`. Writes go to a
/// `.tmp` sibling first and are renamed into place.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        JsonFileStore { root: root.into() }
    }

    /// Resolve a key to its file, rejecting keys that could leave the root.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        let segments: Vec<&str> = key.split('/').collect();
        let valid = segments.iter().all(|segment| {
            !segment.is_empty()
                && *segment != "."
                && *segment != ".."
                && !segment.contains('\\')
        });
        if !valid {
            return Err(PersistenceError::InvalidKey(key.to_string()));
        }

        let mut path = self.root.clone();
        for segment in &segments[..segments.len() - 1] {
            path.push(segment);
        }
        path.push(format!("{}.json", segments[segments.len() - 1]));
        Ok(path)
    }

    async fn read(&self, path: &Path, key: &str) -> Result<Option<Document>, PersistenceError> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| PersistenceError::Decode {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Document>, PersistenceError> {
        let path = self.path_for(key)?;
        self.read(&path, key).await
    }

    async fn put(
        &self,
        key: &str,
        document: Document,
        merge: bool,
    ) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;

        let document = if merge {
            match self.read(&path, key).await {
                Ok(Some(mut existing)) => {
                    merge_documents(&mut existing, document);
                    existing
                }
                Ok(None) => document,
                Err(PersistenceError::Decode { reason, .. }) => {
                    tracing::warn!(
                        "Replacing unreadable document '{}' instead of merging: {}",
                        key,
                        reason
                    );
                    document
                }
                Err(e) => return Err(e),
            }
        } else {
            document
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&document)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json).await?;
        fs::rename(&tmp_path, &path).await?;

        tracing::debug!("Wrote document '{}' to {}", key, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_path_for_nested_key() {
        let store = JsonFileStore::new("/data");
        assert_eq!(
            store.path_for("games/partidaActual").unwrap(),
            PathBuf::from("/data/games/partidaActual.json")
        );
    }

    #[test]
    fn test_path_for_rejects_escaping_keys() {
        let store = JsonFileStore::new("/data");
        for key in ["", "../etc/passwd", "games//x", "games/.", "a\\b", "games/"] {
            assert!(
                matches!(store.path_for(key), Err(PersistenceError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.get("games/none").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_and_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        store
            .put("games/current", doc(json!({"moves": 4, "winner": null})), false)
            .await
            .unwrap();

        assert!(dir.path().join("games/current.json").exists());
        assert!(!dir.path().join("games/current.json.tmp").exists());
        let loaded = store.get("games/current").await.unwrap().unwrap();
        assert_eq!(Value::Object(loaded), json!({"moves": 4, "winner": null}));
    }

    #[tokio::test]
    async fn test_put_with_merge() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        store
            .put("g", doc(json!({"board": {"row_0": [null]}, "moves": 0})), false)
            .await
            .unwrap();
        store
            .put("g", doc(json!({"board": {"row_1": ["🔴"]}, "moves": 1})), true)
            .await
            .unwrap();

        let loaded = store.get("g").await.unwrap().unwrap();
        assert_eq!(
            Value::Object(loaded),
            json!({"board": {"row_0": [null], "row_1": ["🔴"]}, "moves": 1})
        );
    }

    #[tokio::test]
    async fn test_put_without_merge_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        store.put("g", doc(json!({"a": 1, "b": 2})), false).await.unwrap();
        store.put("g", doc(json!({"a": 3})), false).await.unwrap();

        let loaded = store.get("g").await.unwrap().unwrap();
        assert_eq!(Value::Object(loaded), json!({"a": 3}));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        let store = JsonFileStore::new(dir.path());

        let err = store.get("broken").await.unwrap_err();
        assert!(matches!(err, PersistenceError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_put_replaces_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        std::fs::write(dir.path().join("a.json"), "{not json").unwrap();
        store.put("a", doc(json!({"moves": 0})), false).await.unwrap();
        assert_eq!(
            Value::Object(store.get("a").await.unwrap().unwrap()),
            json!({"moves": 0})
        );

        std::fs::write(dir.path().join("b.json"), "{not json").unwrap();
        store.put("b", doc(json!({"moves": 1})), true).await.unwrap();
        assert_eq!(
            Value::Object(store.get("b").await.unwrap().unwrap()),
            json!({"moves": 1})
        );
    }
}
