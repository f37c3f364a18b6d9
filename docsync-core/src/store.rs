//! Document and specification stores.
//!
//! The sync engine only talks to [`DocumentStore`] and [`SpecificationStore`].
//! Two implementations ship with the crate: [`FileStore`] (YAML on disk) and
//! [`MemoryStore`] (for embedding and tests).
//!
//! # File store layout
//!
//! ```text
//! ~/.docsync/
//!   config.yaml
//!   specs/
//!     <spec_id>.yaml                 (mode 0600)
//!   projects/
//!     <project_id>/                  (mode 0700)
//!       <document_id>.yaml           (mode 0600)
//! ```
//!
//! Every write goes through a `.yaml.tmp` sibling and a rename, so a document's
//! content, `sync_hash` and timestamps are replaced together or not at all.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;
use crate::types::{Document, DocumentId, ProjectId, Specification, SpecificationId};

// ---------------------------------------------------------------------------
// 1. Contracts
// ---------------------------------------------------------------------------

/// Persistence contract for documents.
pub trait DocumentStore: Send + Sync {
    fn get(&self, id: DocumentId) -> Result<Option<Document>, StoreError>;

    fn list_by_project(&self, project: ProjectId) -> Result<Vec<Document>, StoreError>;

    /// Persist the whole document atomically (insert or replace).
    fn update(&self, document: &Document) -> Result<(), StoreError>;
}

/// Read-only specification lookup.
pub trait SpecificationStore: Send + Sync {
    fn get(&self, id: SpecificationId) -> Result<Option<Specification>, StoreError>;
}

// ---------------------------------------------------------------------------
// 2. File store
// ---------------------------------------------------------------------------

/// YAML-backed store rooted at `<home>/.docsync/`.
#[derive(Debug, Clone)]
pub struct FileStore {
    home: PathBuf,
}

impl FileStore {
    /// Store rooted at an explicit home; used in tests with `TempDir`.
    pub fn at(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Store rooted at `dirs::home_dir()`.
    pub fn open() -> Result<Self, StoreError> {
        Ok(Self::at(dirs::home_dir().ok_or(StoreError::HomeNotFound)?))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// `<home>/.docsync`: pure, no I/O.
    pub fn root(&self) -> PathBuf {
        self.home.join(".docsync")
    }

    /// `<home>/.docsync/specs/<id>.yaml`: pure, no I/O.
    pub fn spec_path(&self, id: SpecificationId) -> PathBuf {
        self.root().join("specs").join(format!("{id}.yaml"))
    }

    /// `<home>/.docsync/projects/<project>/`: pure, no I/O.
    pub fn project_dir(&self, project: ProjectId) -> PathBuf {
        self.root().join("projects").join(project.to_string())
    }

    /// `<home>/.docsync/projects/<project>/<id>.yaml`: pure, no I/O.
    pub fn document_path(&self, project: ProjectId, id: DocumentId) -> PathBuf {
        self.project_dir(project).join(format!("{id}.yaml"))
    }

    /// Insert or replace a specification.
    pub fn put_spec(&self, spec: &Specification) -> Result<(), StoreError> {
        let path = self.spec_path(spec.id);
        ensure_dir(path.parent().unwrap_or(&self.root()))?;
        write_yaml_atomic(&path, spec)
    }

    /// All specifications, sorted by id.
    pub fn list_specs(&self) -> Result<Vec<Specification>, StoreError> {
        let mut specs: Vec<Specification> = read_yaml_dir(&self.root().join("specs"))?;
        specs.sort_by_key(|s| s.id);
        Ok(specs)
    }

    /// Ids of every project directory, sorted.
    pub fn list_projects(&self) -> Result<Vec<ProjectId>, StoreError> {
        let dir = self.root().join("projects");
        if !dir.exists() {
            return Ok(vec![]);
        }
        let mut ids: Vec<ProjectId> = std::fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|e| e.file_name().to_string_lossy().parse::<i64>().ok())
            .map(ProjectId)
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn find_document_path(&self, id: DocumentId) -> Result<Option<PathBuf>, StoreError> {
        for project in self.list_projects()? {
            let path = self.document_path(project, id);
            if path.exists() {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }
}

impl DocumentStore for FileStore {
    fn get(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        match self.find_document_path(id)? {
            Some(path) => read_yaml(&path).map(Some),
            None => Ok(None),
        }
    }

    fn list_by_project(&self, project: ProjectId) -> Result<Vec<Document>, StoreError> {
        let mut docs: Vec<Document> = read_yaml_dir(&self.project_dir(project))?;
        docs.sort_by_key(|d| d.id);
        Ok(docs)
    }

    /// A document moved to another project leaves no copy behind.
    fn update(&self, document: &Document) -> Result<(), StoreError> {
        ensure_dir(&self.project_dir(document.project_id))?;
        let path = self.document_path(document.project_id, document.id);
        write_yaml_atomic(&path, document)?;

        for project in self.list_projects()? {
            if project == document.project_id {
                continue;
            }
            let stale = self.document_path(project, document.id);
            if stale.exists() {
                std::fs::remove_file(&stale)?;
            }
        }
        Ok(())
    }
}

impl SpecificationStore for FileStore {
    fn get(&self, id: SpecificationId) -> Result<Option<Specification>, StoreError> {
        let path = self.spec_path(id);
        if !path.exists() {
            return Ok(None);
        }
        read_yaml(&path).map(Some)
    }
}

// ---------------------------------------------------------------------------
// 3. In-memory store
// ---------------------------------------------------------------------------

/// Process-local store. Cheap to construct; never touches the filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<DocumentId, Document>>,
    specs: RwLock<HashMap<SpecificationId, Specification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_spec(&self, spec: Specification) -> Result<(), StoreError> {
        let mut specs = self.specs.write().map_err(|_| StoreError::LockPoisoned)?;
        specs.insert(spec.id, spec);
        Ok(())
    }

    pub fn remove_spec(&self, id: SpecificationId) -> Result<Option<Specification>, StoreError> {
        let mut specs = self.specs.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(specs.remove(&id))
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        let docs = self.documents.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(docs.get(&id).cloned())
    }

    fn list_by_project(&self, project: ProjectId) -> Result<Vec<Document>, StoreError> {
        let docs = self.documents.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut out: Vec<Document> = docs
            .values()
            .filter(|d| d.project_id == project)
            .cloned()
            .collect();
        out.sort_by_key(|d| d.id);
        Ok(out)
    }

    fn update(&self, document: &Document) -> Result<(), StoreError> {
        let mut docs = self.documents.write().map_err(|_| StoreError::LockPoisoned)?;
        docs.insert(document.id, document.clone());
        Ok(())
    }
}

impl SpecificationStore for MemoryStore {
    fn get(&self, id: SpecificationId) -> Result<Option<Specification>, StoreError> {
        let specs = self.specs.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(specs.get(&id).cloned())
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let contents = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Parse every `*.yaml` file directly under `dir`, in file-name order.
fn read_yaml_dir<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, StoreError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());

    let mut out = Vec::new();
    for entry in entries {
        let name = entry.file_name();
        if !name.to_string_lossy().ends_with(".yaml") {
            continue;
        }
        out.push(read_yaml(&entry.path())?);
    }
    Ok(out)
}

/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
/// `.tmp` is always in the same directory as the target (same filesystem).
fn write_yaml_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let yaml = serde_yaml::to_string(value)?;
    let tmp_path = path.with_extension("yaml.tmp");
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        set_dir_permissions(dir)?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn doc(id: i64, project: i64) -> Document {
        Document::new(DocumentId(id), ProjectId(project), "architecture", "# Title\n")
    }

    #[test]
    fn document_path_is_correct() {
        let home = TempDir::new().unwrap();
        let store = FileStore::at(home.path());
        let path = store.document_path(ProjectId(3), DocumentId(14));
        assert!(path.ends_with(".docsync/projects/3/14.yaml"));
    }

    #[test]
    fn update_then_get_roundtrip() {
        let home = TempDir::new().unwrap();
        let store = FileStore::at(home.path());
        let mut d = doc(1, 1);
        d.sync_hash = Some("0123456789abcdef".to_string());
        DocumentStore::update(&store, &d).expect("update");

        let loaded = DocumentStore::get(&store, DocumentId(1)).expect("get").expect("present");
        assert_eq!(loaded, d);
    }

    #[test]
    fn moving_a_document_between_projects_leaves_one_copy() {
        let home = TempDir::new().unwrap();
        let store = FileStore::at(home.path());
        DocumentStore::update(&store, &doc(5, 2)).expect("first write");

        let mut moved = doc(5, 1);
        moved.title = "moved".to_string();
        DocumentStore::update(&store, &moved).expect("move");

        assert!(!store.document_path(ProjectId(2), DocumentId(5)).exists());
        let loaded = DocumentStore::get(&store, DocumentId(5)).expect("get").expect("present");
        assert_eq!(loaded.project_id, ProjectId(1));
        assert_eq!(loaded.title, "moved");
        assert!(store.list_by_project(ProjectId(2)).expect("list").is_empty());
    }

    #[test]
    fn get_missing_document_is_none() {
        let home = TempDir::new().unwrap();
        let store = FileStore::at(home.path());
        assert!(DocumentStore::get(&store, DocumentId(99)).expect("get").is_none());
    }

    #[test]
    fn atomic_write_cleans_up_tmp() {
        let home = TempDir::new().unwrap();
        let store = FileStore::at(home.path());
        DocumentStore::update(&store, &doc(5, 2)).expect("update");
        let tmp = store
            .document_path(ProjectId(2), DocumentId(5))
            .with_extension("yaml.tmp");
        assert!(!tmp.exists(), ".tmp must be gone after successful save");
    }

    #[test]
    fn project_dir_created_with_perms() {
        let home = TempDir::new().unwrap();
        let store = FileStore::at(home.path());
        DocumentStore::update(&store, &doc(1, 7)).expect("update");
        let dir = store.project_dir(ProjectId(7));
        assert!(dir.exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o700);
        }
    }

    #[test]
    fn list_by_project_is_sorted_and_scoped() {
        let home = TempDir::new().unwrap();
        let store = FileStore::at(home.path());
        for (id, project) in [(10, 1), (2, 1), (3, 2)] {
            DocumentStore::update(&store, &doc(id, project)).expect("update");
        }
        let ids: Vec<i64> = store
            .list_by_project(ProjectId(1))
            .expect("list")
            .into_iter()
            .map(|d| d.id.0)
            .collect();
        assert_eq!(ids, vec![2, 10]);
        assert_eq!(store.list_projects().expect("projects"), vec![ProjectId(1), ProjectId(2)]);
    }

    #[test]
    fn specs_roundtrip_and_list_sorted() {
        let home = TempDir::new().unwrap();
        let store = FileStore::at(home.path());
        store.put_spec(&Specification::new(SpecificationId(2), "1.0", "y")).unwrap();
        store.put_spec(&Specification::new(SpecificationId(1), "1.0", "x")).unwrap();

        let one = SpecificationStore::get(&store, SpecificationId(1)).unwrap().unwrap();
        assert_eq!(one.content, "x");
        let ids: Vec<_> = store.list_specs().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![SpecificationId(1), SpecificationId(2)]);
        assert!(SpecificationStore::get(&store, SpecificationId(3)).unwrap().is_none());
    }

    #[test]
    fn memory_store_scopes_by_project() {
        let store = MemoryStore::new();
        store.update(&doc(1, 1)).unwrap();
        store.update(&doc(2, 2)).unwrap();
        assert_eq!(store.list_by_project(ProjectId(1)).unwrap().len(), 1);

        store.put_spec(Specification::new(SpecificationId(4), "2", "z")).unwrap();
        assert!(SpecificationStore::get(&store, SpecificationId(4)).unwrap().is_some());
        store.remove_spec(SpecificationId(4)).unwrap();
        assert!(SpecificationStore::get(&store, SpecificationId(4)).unwrap().is_none());
    }
}
