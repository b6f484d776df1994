//! In-memory data stores.

use crate::cas::CasMap;
use crate::error::StoreResult;
use crate::store::{ClientDataStore, DataStore, ServerDataStore};
use diffsync_protocol::{BackupShadowDocument, ClientDocument, Document, Edit, ShadowDocument};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};

type PairKey = (String, String);

fn pair(document_id: &str, client_id: &str) -> PairKey {
    (document_id.to_string(), client_id.to_string())
}

/// Shadows, backups and pending edits, keyed by `(document, client)`.
#[derive(Debug)]
struct PairTables<C, D> {
    shadows: RwLock<HashMap<PairKey, ShadowDocument<C>>>,
    backups: RwLock<HashMap<PairKey, BackupShadowDocument<C>>>,
    pending: CasMap<PairKey, VecDeque<Edit<D>>>,
}

impl<C, D> Default for PairTables<C, D> {
    fn default() -> Self {
        Self {
            shadows: RwLock::new(HashMap::new()),
            backups: RwLock::new(HashMap::new()),
            pending: CasMap::new(),
        }
    }
}

impl<C: Clone, D: Clone> PairTables<C, D> {
    fn save_shadow(&self, shadow: ShadowDocument<C>) {
        let key = pair(shadow.document_id(), shadow.client_id());
        self.shadows.write().insert(key, shadow);
    }

    fn shadow(&self, document_id: &str, client_id: &str) -> Option<ShadowDocument<C>> {
        self.shadows.read().get(&pair(document_id, client_id)).cloned()
    }

    fn save_backup(&self, backup: BackupShadowDocument<C>) {
        let key = pair(backup.shadow.document_id(), backup.shadow.client_id());
        self.backups.write().insert(key, backup);
    }

    fn backup(&self, document_id: &str, client_id: &str) -> Option<BackupShadowDocument<C>> {
        self.backups.read().get(&pair(document_id, client_id)).cloned()
    }

    fn save_edit(&self, document_id: &str, client_id: &str, edit: Edit<D>) {
        self.pending.update(&pair(document_id, client_id), |current| {
            let mut next = current.cloned().unwrap_or_default();
            next.push_back(edit.clone());
            Some(next)
        });
    }

    fn remove_edit(&self, document_id: &str, client_id: &str, edit: &Edit<D>) {
        self.pending.update(&pair(document_id, client_id), |current| {
            let current = current?;
            let next: VecDeque<Edit<D>> = current
                .iter()
                .filter(|pending| pending.client_version > edit.client_version)
                .cloned()
                .collect();
            (next.len() != current.len()).then_some(next)
        });
    }

    fn edits(&self, document_id: &str, client_id: &str) -> VecDeque<Edit<D>> {
        self.pending
            .get(&pair(document_id, client_id))
            .map(|edits| (*edits).clone())
            .unwrap_or_default()
    }

    fn remove_edits(&self, document_id: &str, client_id: &str) {
        self.pending.remove(&pair(document_id, client_id));
    }
}

/// An in-memory client-side store.
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use diffsync_protocol::{ClientDocument, Edit};
/// use diffsync_store::{ClientDataStore, ClientInMemoryDataStore, DataStore};
///
/// let store: ClientInMemoryDataStore<String, String> = ClientInMemoryDataStore::new();
/// store.save_client_document(ClientDocument::new("d1", "c1", "text".to_string())).unwrap();
/// store.save_edit("d1", "c1", Edit::new(0, 0, String::new(), "diff".to_string())).unwrap();
/// assert_eq!(store.edits("d1", "c1").unwrap().len(), 1);
/// ```
#[derive(Debug)]
pub struct ClientInMemoryDataStore<C, D> {
    documents: RwLock<HashMap<PairKey, ClientDocument<C>>>,
    pairs: PairTables<C, D>,
}

impl<C, D> Default for ClientInMemoryDataStore<C, D> {
    fn default() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            pairs: PairTables::default(),
        }
    }
}

impl<C, D> ClientInMemoryDataStore<C, D> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C, D> DataStore<C, D> for ClientInMemoryDataStore<C, D>
where
    C: Clone + Send + Sync,
    D: Clone + Send + Sync,
{
    fn save_shadow(&self, shadow: ShadowDocument<C>) -> StoreResult<()> {
        self.pairs.save_shadow(shadow);
        Ok(())
    }

    fn shadow(&self, document_id: &str, client_id: &str) -> StoreResult<Option<ShadowDocument<C>>> {
        Ok(self.pairs.shadow(document_id, client_id))
    }

    fn save_backup(&self, backup: BackupShadowDocument<C>) -> StoreResult<()> {
        self.pairs.save_backup(backup);
        Ok(())
    }

    fn backup(
        &self,
        document_id: &str,
        client_id: &str,
    ) -> StoreResult<Option<BackupShadowDocument<C>>> {
        Ok(self.pairs.backup(document_id, client_id))
    }

    fn save_edit(&self, document_id: &str, client_id: &str, edit: Edit<D>) -> StoreResult<()> {
        self.pairs.save_edit(document_id, client_id, edit);
        Ok(())
    }

    fn remove_edit(&self, document_id: &str, client_id: &str, edit: &Edit<D>) -> StoreResult<()> {
        self.pairs.remove_edit(document_id, client_id, edit);
        Ok(())
    }

    fn edits(&self, document_id: &str, client_id: &str) -> StoreResult<VecDeque<Edit<D>>> {
        Ok(self.pairs.edits(document_id, client_id))
    }

    fn remove_edits(&self, document_id: &str, client_id: &str) -> StoreResult<()> {
        self.pairs.remove_edits(document_id, client_id);
        Ok(())
    }
}

impl<C, D> ClientDataStore<C, D> for ClientInMemoryDataStore<C, D>
where
    C: Clone + Send + Sync,
    D: Clone + Send + Sync,
{
    fn save_client_document(&self, document: ClientDocument<C>) -> StoreResult<()> {
        let key = pair(&document.id, &document.client_id);
        self.documents.write().insert(key, document);
        Ok(())
    }

    fn client_document(
        &self,
        document_id: &str,
        client_id: &str,
    ) -> StoreResult<Option<ClientDocument<C>>> {
        Ok(self.documents.read().get(&pair(document_id, client_id)).cloned())
    }
}

/// An in-memory server-side store.
///
/// Document creation goes through [`CasMap::insert_if_absent`], so of two
/// clients racing to create the same document exactly one wins.
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
#[derive(Debug)]
pub struct ServerInMemoryDataStore<C, D> {
    documents: CasMap<String, Document<C>>,
    pairs: PairTables<C, D>,
}

impl<C, D> Default for ServerInMemoryDataStore<C, D> {
    fn default() -> Self {
        Self {
            documents: CasMap::new(),
            pairs: PairTables::default(),
        }
    }
}

impl<C, D> ServerInMemoryDataStore<C, D> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents held.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

impl<C, D> DataStore<C, D> for ServerInMemoryDataStore<C, D>
where
    C: Clone + Send + Sync,
    D: Clone + Send + Sync,
{
    fn save_shadow(&self, shadow: ShadowDocument<C>) -> StoreResult<()> {
        self.pairs.save_shadow(shadow);
        Ok(())
    }

    fn shadow(&self, document_id: &str, client_id: &str) -> StoreResult<Option<ShadowDocument<C>>> {
        Ok(self.pairs.shadow(document_id, client_id))
    }

    fn save_backup(&self, backup: BackupShadowDocument<C>) -> StoreResult<()> {
        self.pairs.save_backup(backup);
        Ok(())
    }

    fn backup(
        &self,
        document_id: &str,
        client_id: &str,
    ) -> StoreResult<Option<BackupShadowDocument<C>>> {
        Ok(self.pairs.backup(document_id, client_id))
    }

    fn save_edit(&self, document_id: &str, client_id: &str, edit: Edit<D>) -> StoreResult<()> {
        self.pairs.save_edit(document_id, client_id, edit);
        Ok(())
    }

    fn remove_edit(&self, document_id: &str, client_id: &str, edit: &Edit<D>) -> StoreResult<()> {
        self.pairs.remove_edit(document_id, client_id, edit);
        Ok(())
    }

    fn edits(&self, document_id: &str, client_id: &str) -> StoreResult<VecDeque<Edit<D>>> {
        Ok(self.pairs.edits(document_id, client_id))
    }

    fn remove_edits(&self, document_id: &str, client_id: &str) -> StoreResult<()> {
        self.pairs.remove_edits(document_id, client_id);
        Ok(())
    }
}

impl<C, D> ServerDataStore<C, D> for ServerInMemoryDataStore<C, D>
where
    C: Clone + Send + Sync,
    D: Clone + Send + Sync,
{
    fn save_document(&self, document: Document<C>) -> StoreResult<bool> {
        let id = document.id.clone();
        Ok(self.documents.insert_if_absent(id, document).is_ok())
    }

    fn update_document(&self, document: Document<C>) -> StoreResult<()> {
        let id = document.id.clone();
        self.documents.insert(id, document);
        Ok(())
    }

    fn document(&self, document_id: &str) -> StoreResult<Option<Document<C>>> {
        Ok(self
            .documents
            .get(&document_id.to_string())
            .map(|document| (*document).clone()))
    }
}
