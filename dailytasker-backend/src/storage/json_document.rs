use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use super::{file_ops, StoreError};

/// A single JSON file holding one document of type `T`.
///
/// No copy is cached in memory: `load` always reads the file, and `update`
/// reads, mutates and rewrites it while holding the writer lock.
pub struct JsonDocument<T> {
    path: PathBuf,
    write_lock: Mutex<()>,
    _doc: PhantomData<fn() -> T>,
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned + Default + Clone + PartialEq,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            _doc: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document. A missing or blank file is the default document.
    pub fn load(&self) -> Result<T, StoreError> {
        let raw = file_ops::read_document(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;

        if raw.trim().is_empty() {
            return Ok(T::default());
        }

        serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Apply `f` to a freshly loaded document and persist the result.
    ///
    /// Nothing is written if `f` fails or leaves the document unchanged.
    pub fn update<R, E>(&self, f: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let _guard = self.write_lock.lock();

        let mut doc = self.load()?;
        let before = doc.clone();
        let result = f(&mut doc)?;

        if doc != before {
            self.save(&doc)?;
        }

        Ok(result)
    }

    fn save(&self, doc: &T) -> Result<(), StoreError> {
        let content = to_indented_json(doc)?;
        file_ops::write_document(&self.path, &content).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Serialize with 4-space indentation.
fn to_indented_json<T: Serialize>(doc: &T) -> Result<String, StoreError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    doc.serialize(&mut ser).map_err(StoreError::Serialize)?;
    String::from_utf8(buf).map_err(|e| {
        StoreError::Serialize(serde::ser::Error::custom(e.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    type Counters = BTreeMap<String, u32>;

    #[test]
    fn test_missing_and_blank_files_load_as_default() {
        let dir = tempdir().unwrap();
        let doc: JsonDocument<Counters> = JsonDocument::new(dir.path().join("missing.json"));
        assert!(doc.load().unwrap().is_empty());

        let blank = dir.path().join("blank.json");
        std::fs::write(&blank, "  \n").unwrap();
        let doc: JsonDocument<Counters> = JsonDocument::new(blank);
        assert!(doc.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.json");
        std::fs::write(&path, "{not json").unwrap();

        let doc: JsonDocument<Counters> = JsonDocument::new(&path);
        assert!(matches!(doc.load(), Err(StoreError::Corrupt { .. })));

        let result: Result<(), StoreError> = doc.update(|c| {
            c.insert("a".to_string(), 1);
            Ok(())
        });
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[test]
    fn test_update_writes_indented_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counters.json");
        let doc: JsonDocument<Counters> = JsonDocument::new(&path);

        doc.update(|c| -> Result<(), StoreError> {
            c.insert("hits".to_string(), 3);
            Ok(())
        })
        .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "{\n    \"hits\": 3\n}");
        assert_eq!(doc.load().unwrap().get("hits"), Some(&3));
    }

    #[test]
    fn test_failed_or_noop_update_does_not_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counters.json");
        let doc: JsonDocument<Counters> = JsonDocument::new(&path);

        let result: Result<(), StoreError> = doc.update(|_| Ok(()));
        assert!(result.is_ok());
        assert!(!path.exists());

        let result: Result<(), StoreError> = doc.update(|c| {
            c.insert("x".to_string(), 1);
            Err(StoreError::Serialize(serde::ser::Error::custom("rejected")))
        });
        assert!(result.is_err());
        assert!(!path.exists());
    }
}
