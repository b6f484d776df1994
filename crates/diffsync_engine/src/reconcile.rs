//! Version reconciliation.

use crate::error::{SyncError, SyncResult};
use crate::role::Role;
use diffsync_protocol::{Edit, PatchMessage, ShadowDocument, Synchronizer};
use diffsync_store::DataStore;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Outcome of reconciling one message against a shadow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation<C> {
    /// The live shadow after all edits were processed.
    pub shadow: ShadowDocument<C>,
    /// Edits whose diff was folded into the shadow.
    pub applied: usize,
    /// Edits that triggered a restore from the backup shadow.
    pub restored: usize,
    /// Edits dropped as already incorporated.
    pub discarded: usize,
    /// Edits left in the message because their predecessors are missing.
    pub held: usize,
}

impl<C> Reconciliation<C> {
    fn new(shadow: ShadowDocument<C>) -> Self {
        Self {
            shadow,
            applied: 0,
            restored: 0,
            discarded: 0,
            held: 0,
        }
    }

    /// Returns true if the shadow differs from the one reconciliation
    /// started with.
    pub fn changed(&self) -> bool {
        self.applied > 0 || self.restored > 0
    }
}

/// Cumulative reconciliation statistics of an engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Patch messages reconciled.
    pub messages: u64,
    /// Local diffs taken.
    pub diffs: u64,
    /// Edits applied.
    pub applied: u64,
    /// Backup restores.
    pub restored: u64,
    /// Edits discarded as duplicates.
    pub discarded: u64,
    /// Edits held back.
    pub held: u64,
}

impl SyncStats {
    /// Adds the counts of one reconciliation.
    pub fn record<C>(&mut self, outcome: &Reconciliation<C>) {
        self.messages += 1;
        self.applied += outcome.applied as u64;
        self.restored += outcome.restored as u64;
        self.discarded += outcome.discarded as u64;
        self.held += outcome.held as u64;
    }
}

enum Disposition {
    Keep,
    Discard,
}

/// Store writes collected while a message is reconciled.
///
/// Nothing reaches the store until every edit has been processed, so a
/// message that fails part way leaves shadow and pending queue as they were.
struct Staged<D> {
    clear_pending: bool,
    acknowledged: Vec<Edit<D>>,
}

impl<D> Staged<D> {
    fn new() -> Self {
        Self {
            clear_pending: false,
            acknowledged: Vec::new(),
        }
    }
}

/// Folds incoming edits into the shadow of one `(document, client)` pair.
///
/// For each edit, in message order:
/// 1. If the edit claims an older peer version than the shadow holds, it
///    was already applied: it is removed from the message and acknowledged
///    pending edits are dropped from the store
/// 2. If the edit claims an older own version, the peer missed our last
///    message: the shadow is rebuilt from the backup, whose version must
///    equal the edit's claim, and the pending queue is cleared before the
///    edit is evaluated against the rebuilt shadow
/// 3. If both versions match, or the edit is a seed on the client, its diff
///    is applied and the peer counter advances (a seed instead resets the
///    client counter to 0)
/// 4. Otherwise the edit is held
///
/// The document catch-up and the backup checkpoint are left to the engine,
/// which owns the working document.
pub struct Reconciler<'a, S, St: ?Sized> {
    role: Role,
    synchronizer: &'a S,
    store: &'a St,
}

impl<'a, S, St> Reconciler<'a, S, St>
where
    S: Synchronizer,
    St: DataStore<S::Content, S::Diff> + ?Sized,
{
    /// Creates a reconciler for `role`.
    pub fn new(role: Role, synchronizer: &'a S, store: &'a St) -> Self {
        Self {
            role,
            synchronizer,
            store,
        }
    }

    /// Reconciles `message` against the stored shadow.
    ///
    /// Discarded edits are removed from `message`; applied and held edits
    /// stay in it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingShadow`] if the pair is unknown, and
    /// [`SyncError::MissingBackup`] or [`SyncError::BackupVersionMismatch`]
    /// if a gap cannot be recovered. On any error nothing is written and
    /// `message` is left as it was passed in.
    pub fn reconcile(
        &self,
        message: &mut PatchMessage<S::Diff>,
    ) -> SyncResult<Reconciliation<S::Content>> {
        let document_id = message.document_id.clone();
        let client_id = message.client_id.clone();
        let shadow = self
            .store
            .shadow(&document_id, &client_id)?
            .ok_or_else(|| SyncError::missing_shadow(&document_id, &client_id))?;

        let mut outcome = Reconciliation::new(shadow);
        let mut staged = Staged::new();
        let mut retained = VecDeque::with_capacity(message.edits.len());

        for edit in &message.edits {
            let step = self.step(&document_id, &client_id, &mut outcome, &mut staged, edit);
            match step? {
                Disposition::Keep => retained.push_back(edit.clone()),
                Disposition::Discard => {}
            }
        }

        self.commit(&document_id, &client_id, &outcome, staged)?;
        message.edits = retained;

        debug!(
            role = ?self.role,
            document_id = %document_id,
            client_id = %client_id,
            applied = outcome.applied,
            restored = outcome.restored,
            discarded = outcome.discarded,
            held = outcome.held,
            "reconciled patch message"
        );
        Ok(outcome)
    }

    fn commit(
        &self,
        document_id: &str,
        client_id: &str,
        outcome: &Reconciliation<S::Content>,
        staged: Staged<S::Diff>,
    ) -> SyncResult<()> {
        if staged.clear_pending {
            self.store.remove_edits(document_id, client_id)?;
        }
        for edit in &staged.acknowledged {
            self.store.remove_edit(document_id, client_id, edit)?;
        }
        if outcome.changed() {
            self.store.save_shadow(outcome.shadow.clone())?;
        }
        Ok(())
    }

    fn step(
        &self,
        document_id: &str,
        client_id: &str,
        outcome: &mut Reconciliation<S::Content>,
        staged: &mut Staged<S::Diff>,
        edit: &Edit<S::Diff>,
    ) -> SyncResult<Disposition> {
        let role = self.role;
        let seed = edit.is_seed() && role.accepts_seed();
        let own = Some(role.own_version(&outcome.shadow));
        let peer = Some(role.peer_version(&outcome.shadow));
        let edit_own = role.edit_own_version(edit);
        let edit_peer = role.edit_peer_version(edit);

        if edit_peer < peer {
            staged.acknowledged.push(edit.clone());
            outcome.discarded += 1;
            debug!(document_id, client_id, ?edit_peer, ?peer, "discarded stale edit");
            return Ok(Disposition::Discard);
        }

        if !seed && edit_own < own {
            return self.restore(document_id, client_id, outcome, staged, edit);
        }

        if seed || (edit_own == own && edit_peer == peer) {
            let patched = self.synchronizer.patch_shadow(edit, &outcome.shadow)?;
            let next = if seed {
                let server_version = patched.server_version;
                info!(document_id, client_id, "seeded shadow");
                patched.with_versions(server_version, 0)
            } else {
                role.advance_peer(patched)
            };
            staged.acknowledged.push(edit.clone());
            outcome.shadow = next;
            outcome.applied += 1;
            return Ok(Disposition::Keep);
        }

        outcome.held += 1;
        debug!(document_id, client_id, ?edit_own, ?edit_peer, "holding edit");
        Ok(Disposition::Keep)
    }

    /// Rebuilds the shadow from the backup for an edit whose peer version is
    /// current but whose own version is behind.
    fn restore(
        &self,
        document_id: &str,
        client_id: &str,
        outcome: &mut Reconciliation<S::Content>,
        staged: &mut Staged<S::Diff>,
        edit: &Edit<S::Diff>,
    ) -> SyncResult<Disposition> {
        let role = self.role;
        let peer = role.peer_version(&outcome.shadow);
        let edit_version = role.edit_own_version(edit);

        let backup = match self.store.backup(document_id, client_id)? {
            Some(backup) if edit_version == Some(backup.version) => backup,
            None => {
                return Err(SyncError::MissingBackup {
                    document_id: document_id.to_string(),
                    client_id: client_id.to_string(),
                })
            }
            Some(backup) => {
                warn!(
                    document_id,
                    client_id,
                    backup_version = backup.version,
                    ?edit_version,
                    "edit does not match backup shadow"
                );
                return Err(SyncError::BackupVersionMismatch {
                    document_id: document_id.to_string(),
                    client_id: client_id.to_string(),
                    backup_version: backup.version,
                    edit_version,
                });
            }
        };

        let restored = role.with_versions(backup.shadow, backup.version, peer);

        let (shadow, disposition) = if role.edit_peer_version(edit) == Some(peer) {
            let patched = self.synchronizer.patch_shadow(edit, &restored)?;
            outcome.applied += 1;
            (role.advance_peer(patched), Disposition::Keep)
        } else {
            outcome.held += 1;
            (restored, Disposition::Keep)
        };

        staged.clear_pending = true;
        staged.acknowledged.clear();
        outcome.shadow = shadow;
        outcome.restored += 1;
        info!(
            document_id,
            client_id,
            version = backup.version,
            "restored shadow from backup"
        );
        Ok(disposition)
    }
}
