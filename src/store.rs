use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::Context as _;

use crate::{
    foundation::error::{StudioError, StudioResult},
    model::Project,
};

/// Key the whole project collection is stored under.
pub const STORE_NAMESPACE: &str = "stopmotion-projects";

/// Durable storage for the project collection. Writes always replace the whole collection.
pub trait ProjectStore {
    /// An empty vector means nothing has been stored yet.
    fn load_all(&mut self) -> StudioResult<Vec<Project>>;

    fn save_all(&mut self, projects: &[Project]) -> StudioResult<()>;
}

#[derive(serde::Deserialize)]
struct StoreDocument {
    #[serde(rename = "stopmotion-projects", default)]
    projects: Vec<Project>,
}

#[derive(serde::Serialize)]
struct StoreDocumentRef<'a> {
    #[serde(rename = "stopmotion-projects")]
    projects: &'a [Project],
}

pub fn encode_document(projects: &[Project]) -> StudioResult<String> {
    serde_json::to_string(&StoreDocumentRef { projects })
        .map_err(|e| StudioError::serde(format!("encode project collection: {e}")))
}

pub fn decode_document(json: &str) -> StudioResult<Vec<Project>> {
    let doc: StoreDocument = serde_json::from_str(json)
        .map_err(|e| StudioError::serde(format!("decode project collection: {e}")))?;
    Ok(doc.projects)
}

/// JSON file on disk holding the namespaced collection.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProjectStore for JsonFileStore {
    fn load_all(&mut self) -> StudioResult<Vec<Project>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let json = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read project store '{}'", self.path.display()))?;
        decode_document(&json)
    }

    #[tracing::instrument(skip(self, projects), fields(path = %self.path.display(), count = projects.len()))]
    fn save_all(&mut self, projects: &[Project]) -> StudioResult<()> {
        let json = encode_document(projects)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StudioError::persistence(format!(
                    "create store directory '{}': {e}",
                    parent.display()
                ))
            })?;
        }

        // Readers see either the previous document or the new one, never a partial write.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| {
            StudioError::persistence(format!("write '{}': {e}", tmp.display()))
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            StudioError::persistence(format!("replace '{}': {e}", self.path.display()))
        })?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    json: Option<String>,
    writes: usize,
    fail_writes: bool,
}

/// In-memory store; clones share the same backing document.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryStoreInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a raw stored document (which may be corrupt).
    pub fn with_document(json: impl Into<String>) -> Self {
        let store = Self::default();
        store.inner.borrow_mut().json = Some(json.into());
        store
    }

    pub fn write_count(&self) -> usize {
        self.inner.borrow().writes
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }

    /// Decode what is currently stored.
    pub fn stored_projects(&self) -> StudioResult<Vec<Project>> {
        match self.inner.borrow().json.as_deref() {
            Some(json) => decode_document(json),
            None => Ok(Vec::new()),
        }
    }
}

impl ProjectStore for MemoryStore {
    fn load_all(&mut self) -> StudioResult<Vec<Project>> {
        self.stored_projects()
    }

    fn save_all(&mut self, projects: &[Project]) -> StudioResult<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_writes {
            return Err(StudioError::persistence("memory store rejects writes"));
        }
        inner.json = Some(encode_document(projects)?);
        inner.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Fps;

    #[test]
    fn document_is_keyed_by_namespace() {
        let p = Project::new("one", Fps::DEFAULT).unwrap();
        let json = encode_document(std::slice::from_ref(&p)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[STORE_NAMESPACE][0]["name"], "one");
    }

    #[test]
    fn file_store_roundtrip_replaces_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("nested").join("projects.json"));
        assert!(store.load_all().unwrap().is_empty());

        let a = Project::new("a", Fps::DEFAULT).unwrap();
        let b = Project::new("b", Fps::new(6).unwrap()).unwrap();
        store.save_all(&[a.clone(), b.clone()]).unwrap();
        store.save_all(std::slice::from_ref(&b)).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, b.id);
        assert_eq!(loaded[0].fps.get(), 6);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_document_is_a_serde_error() {
        let mut store = MemoryStore::with_document("{ not json");
        assert!(matches!(store.load_all(), Err(StudioError::Serde(_))));
    }

    #[test]
    fn memory_store_counts_and_fails_writes() {
        let mut store = MemoryStore::new();
        let handle = store.clone();
        store.save_all(&[]).unwrap();
        assert_eq!(handle.write_count(), 1);
        handle.set_fail_writes(true);
        assert!(matches!(
            store.save_all(&[]),
            Err(StudioError::Persistence(_))
        ));
        assert_eq!(handle.write_count(), 1);
    }
}
