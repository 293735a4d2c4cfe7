use pinmap_shared::models::DocumentFields;
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// `"<namespace>/<zero-padded sequence>"` -> JSON-encoded [`StoredDocument`].
/// The padded sequence keeps a namespace's documents in creation order.
const DOCUMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");
const BLOBS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("blobs");
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");

const DOCUMENT_SEQ_KEY: &str = "document_seq";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub namespace: String,
    pub fields: DocumentFields,
    pub created_at: String,
}

/// Result of a blob upload. Blobs are write-once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    AlreadyExists,
}

pub struct Storage {
    db: Database,
    path: PathBuf,
}

fn document_prefix(namespace: &str) -> String {
    format!("{}/", namespace)
}

fn document_key(namespace: &str, seq: u64) -> String {
    format!("{}/{:020}", namespace, seq)
}

impl Storage {
    pub fn open(path: &Path) -> Result<Arc<Self>, String> {
        let db = Database::create(path)
            .map_err(|e| format!("Failed to open database at {}: {}", path.display(), e))?;

        // Ensure tables exist so read transactions never see a missing table
        let write_txn = db.begin_write().map_err(|e| e.to_string())?;
        {
            write_txn.open_table(DOCUMENTS_TABLE).map_err(|e| e.to_string())?;
            write_txn.open_table(BLOBS_TABLE).map_err(|e| e.to_string())?;
            write_txn.open_table(META_TABLE).map_err(|e| e.to_string())?;
        }
        write_txn.commit().map_err(|e| e.to_string())?;

        Ok(Arc::new(Storage {
            db,
            path: path.to_path_buf(),
        }))
    }

    /// Persist a new document and assign its id.
    pub fn create_document(
        &self,
        namespace: &str,
        fields: DocumentFields,
    ) -> Result<StoredDocument, String> {
        let doc = StoredDocument {
            id: uuid::Uuid::new_v4().to_string(),
            namespace: namespace.to_string(),
            fields,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_vec(&doc).map_err(|e| e.to_string())?;

        let write_txn = self.db.begin_write().map_err(|e| e.to_string())?;
        {
            let mut meta = write_txn.open_table(META_TABLE).map_err(|e| e.to_string())?;
            let seq = meta
                .get(DOCUMENT_SEQ_KEY)
                .map_err(|e| e.to_string())?
                .map(|v| v.value())
                .unwrap_or(0)
                + 1;
            meta.insert(DOCUMENT_SEQ_KEY, seq)
                .map_err(|e| e.to_string())?;

            let mut table = write_txn
                .open_table(DOCUMENTS_TABLE)
                .map_err(|e| e.to_string())?;
            let key = document_key(namespace, seq);
            table
                .insert(key.as_str(), json.as_slice())
                .map_err(|e| e.to_string())?;
        }
        write_txn.commit().map_err(|e| e.to_string())?;

        tracing::debug!(namespace = %namespace, id = %doc.id, "Created document");
        Ok(doc)
    }

    /// All documents of `namespace` in creation order.
    pub fn list_documents(&self, namespace: &str) -> Result<Vec<StoredDocument>, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn
            .open_table(DOCUMENTS_TABLE)
            .map_err(|e| e.to_string())?;

        // Namespaces never contain '/', and '0' sorts right after it
        let start = document_prefix(namespace);
        let end = format!("{}0", namespace);

        let mut docs = Vec::new();
        for entry in table
            .range::<&str>(start.as_str()..end.as_str())
            .map_err(|e| e.to_string())?
        {
            let (_, value) = entry.map_err(|e| e.to_string())?;
            let doc: StoredDocument =
                serde_json::from_slice(value.value()).map_err(|e| e.to_string())?;
            docs.push(doc);
        }
        Ok(docs)
    }

    pub fn count_documents(&self) -> Result<u64, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn
            .open_table(DOCUMENTS_TABLE)
            .map_err(|e| e.to_string())?;
        table.len().map_err(|e| e.to_string())
    }

    /// Store a blob unless the key is already taken.
    pub fn put_blob(&self, key: &str, bytes: &[u8]) -> Result<PutOutcome, String> {
        let write_txn = self.db.begin_write().map_err(|e| e.to_string())?;
        let outcome = {
            let mut table = write_txn.open_table(BLOBS_TABLE).map_err(|e| e.to_string())?;
            let exists = table.get(key).map_err(|e| e.to_string())?.is_some();
            if exists {
                PutOutcome::AlreadyExists
            } else {
                table.insert(key, bytes).map_err(|e| e.to_string())?;
                PutOutcome::Created
            }
        };
        write_txn.commit().map_err(|e| e.to_string())?;
        Ok(outcome)
    }

    pub fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn.open_table(BLOBS_TABLE).map_err(|e| e.to_string())?;
        let blob = table.get(key).map_err(|e| e.to_string())?;
        Ok(blob.map(|v| v.value().to_vec()))
    }

    pub fn blob_size(&self, key: &str) -> Result<Option<u64>, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn.open_table(BLOBS_TABLE).map_err(|e| e.to_string())?;
        let blob = table.get(key).map_err(|e| e.to_string())?;
        Ok(blob.map(|v| v.value().len() as u64))
    }

    pub fn count_blobs(&self) -> Result<u64, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn.open_table(BLOBS_TABLE).map_err(|e| e.to_string())?;
        table.len().map_err(|e| e.to_string())
    }

    pub fn db_size_bytes(&self) -> Result<u64, String> {
        std::fs::metadata(&self.path)
            .map(|m| m.len())
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> (tempfile::TempDir, Arc<Storage>) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(&dir.path().join("test.redb")).unwrap();
        (dir, storage)
    }

    fn fields(title: &str) -> DocumentFields {
        DocumentFields {
            title: title.to_string(),
            latitude: 55.1,
            longitude: 12.1,
            image_key: "image_1.jpg".to_string(),
        }
    }

    #[test]
    fn test_create_assigns_unique_ids() {
        let (_dir, storage) = temp_storage();
        let a = storage.create_document("Map_Location", fields("a")).unwrap();
        let b = storage.create_document("Map_Location", fields("b")).unwrap();
        assert_ne!(a.id, b.id);
        assert!(uuid::Uuid::parse_str(&a.id).is_ok());
    }

    #[test]
    fn test_list_in_creation_order() {
        let (_dir, storage) = temp_storage();
        for title in ["first", "second", "third"] {
            storage.create_document("Map_Location", fields(title)).unwrap();
        }
        let titles: Vec<String> = storage
            .list_documents("Map_Location")
            .unwrap()
            .into_iter()
            .map(|d| d.fields.title)
            .collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_list_is_scoped_to_namespace() {
        let (_dir, storage) = temp_storage();
        storage.create_document("Map_Location", fields("a")).unwrap();
        storage.create_document("Map_Location0", fields("b")).unwrap();
        storage.create_document("Map", fields("c")).unwrap();

        let docs = storage.list_documents("Map_Location").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].fields.title, "a");
        assert!(storage.list_documents("Other").unwrap().is_empty());
        assert_eq!(storage.count_documents().unwrap(), 3);
    }

    #[test]
    fn test_documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.redb");
        {
            let storage = Storage::open(&path).unwrap();
            storage.create_document("Map_Location", fields("kept")).unwrap();
        }
        let storage = Storage::open(&path).unwrap();
        let docs = storage.list_documents("Map_Location").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].fields.title, "kept");

        // Sequence continues after reopen
        storage.create_document("Map_Location", fields("next")).unwrap();
        let docs = storage.list_documents("Map_Location").unwrap();
        assert_eq!(docs[1].fields.title, "next");
    }

    #[test]
    fn test_blob_is_write_once() {
        let (_dir, storage) = temp_storage();
        assert_eq!(
            storage.put_blob("image_1.jpg", b"first").unwrap(),
            PutOutcome::Created
        );
        assert_eq!(
            storage.put_blob("image_1.jpg", b"second").unwrap(),
            PutOutcome::AlreadyExists
        );
        assert_eq!(storage.get_blob("image_1.jpg").unwrap().unwrap(), b"first");
        assert_eq!(storage.blob_size("image_1.jpg").unwrap(), Some(5));
        assert_eq!(storage.count_blobs().unwrap(), 1);
    }

    #[test]
    fn test_missing_blob() {
        let (_dir, storage) = temp_storage();
        assert!(storage.get_blob("image_404.jpg").unwrap().is_none());
        assert!(storage.blob_size("image_404.jpg").unwrap().is_none());
    }
}
