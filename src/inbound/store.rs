//! Inbound record storage.
//!
//! `ConfigStore` is the narrow interface the gateway and the engine
//! controller depend on. `MemoryStore` keeps records in a `DashMap` and,
//! when a path is configured, persists a JSON snapshot before a write is
//! made visible, so a successful write is a durable one.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inbound::model::{InboundConfig, InboundId, InboundPatch, NewInbound, OwnerId};

/// Errors reported by a config store. Passed to callers verbatim.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("inbound {0} not found")]
    NotFound(InboundId),

    #[error("port {0} is already used by another inbound")]
    PortInUse(u16),

    #[error("failed to persist inbounds: {0}")]
    Persist(#[from] std::io::Error),

    #[error("failed to encode inbounds: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable storage for inbound records.
///
/// Implementations must be safe to call from many request handlers at once
/// and must either apply a write completely or not at all.
pub trait ConfigStore: Send + Sync {
    fn list_for_owner(&self, owner: OwnerId) -> Result<Vec<InboundConfig>, StoreError>;

    fn get(&self, id: InboundId) -> Result<Option<InboundConfig>, StoreError>;

    /// Every enabled inbound regardless of owner, ordered by id.
    fn list_enabled(&self) -> Result<Vec<InboundConfig>, StoreError>;

    fn insert(&self, inbound: NewInbound) -> Result<InboundId, StoreError>;

    /// Insert all entries or none of them.
    fn insert_batch(&self, inbounds: Vec<NewInbound>) -> Result<(), StoreError>;

    fn delete_by_id(&self, id: InboundId) -> Result<(), StoreError>;

    fn update_by_id(&self, id: InboundId, patch: &InboundPatch) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    next_id: InboundId,
    inbounds: Vec<InboundConfig>,
}

enum Change {
    Upsert(Vec<InboundConfig>),
    Remove(InboundId),
}

/// In-memory store with optional JSON snapshot persistence.
pub struct MemoryStore {
    records: DashMap<InboundId, InboundConfig>,
    next_id: AtomicI64,
    /// Serializes writers so conflict checks and commits are atomic.
    write_lock: Mutex<()>,
    persistence_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Create an empty, purely in-memory store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicI64::new(1),
            write_lock: Mutex::new(()),
            persistence_path: None,
        }
    }

    /// Open a store backed by `path`, loading the snapshot if it exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let mut store = Self::new();
        store.persistence_path = Some(path.to_path_buf());

        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let snapshot: Snapshot = serde_json::from_reader(reader)?;
            let max_id = snapshot.inbounds.iter().map(|i| i.id).max().unwrap_or(0);
            store
                .next_id
                .store(snapshot.next_id.max(max_id + 1), Ordering::SeqCst);
            for inbound in snapshot.inbounds {
                store.records.insert(inbound.id, inbound);
            }
            tracing::info!(
                path = %path.display(),
                count = store.records.len(),
                "Loaded inbounds from store file"
            );
        }

        Ok(store)
    }

    /// Number of stored inbounds.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        // The guarded value is `()`, so a poisoned lock carries no broken state.
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn port_owner(&self, port: u16, except: Option<InboundId>) -> Option<InboundId> {
        self.records
            .iter()
            .find(|r| r.value().settings.port == port && Some(*r.key()) != except)
            .map(|r| *r.key())
    }

    fn sorted<F>(&self, keep: F) -> Vec<InboundConfig>
    where
        F: Fn(&InboundConfig) -> bool,
    {
        let mut out: Vec<_> = self
            .records
            .iter()
            .filter(|r| keep(r.value()))
            .map(|r| r.value().clone())
            .collect();
        out.sort_by_key(|i| i.id);
        out
    }

    /// Persist the post-change snapshot, then make the change visible.
    /// Callers must hold the write lock.
    fn commit(&self, change: Change, next_id: InboundId) -> Result<(), StoreError> {
        if let Some(path) = &self.persistence_path {
            let mut snapshot: BTreeMap<InboundId, InboundConfig> = self
                .records
                .iter()
                .map(|r| (*r.key(), r.value().clone()))
                .collect();
            match &change {
                Change::Upsert(inbounds) => {
                    for inbound in inbounds {
                        snapshot.insert(inbound.id, inbound.clone());
                    }
                }
                Change::Remove(id) => {
                    snapshot.remove(id);
                }
            }
            write_snapshot(
                path,
                &Snapshot {
                    next_id,
                    inbounds: snapshot.into_values().collect(),
                },
            )?;
        }

        match change {
            Change::Upsert(inbounds) => {
                for inbound in inbounds {
                    self.records.insert(inbound.id, inbound);
                }
            }
            Change::Remove(id) => {
                self.records.remove(&id);
            }
        }
        self.next_id.store(next_id, Ordering::SeqCst);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for MemoryStore {
    fn list_for_owner(&self, owner: OwnerId) -> Result<Vec<InboundConfig>, StoreError> {
        Ok(self.sorted(|i| i.user_id == owner))
    }

    fn get(&self, id: InboundId) -> Result<Option<InboundConfig>, StoreError> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    fn list_enabled(&self) -> Result<Vec<InboundConfig>, StoreError> {
        Ok(self.sorted(|i| i.enable))
    }

    fn insert(&self, inbound: NewInbound) -> Result<InboundId, StoreError> {
        let _guard = self.lock_writes();

        if self.port_owner(inbound.settings.port, None).is_some() {
            return Err(StoreError::PortInUse(inbound.settings.port));
        }

        let id = self.next_id.load(Ordering::SeqCst);
        self.commit(Change::Upsert(vec![inbound.with_id(id)]), id + 1)?;
        Ok(id)
    }

    fn insert_batch(&self, inbounds: Vec<NewInbound>) -> Result<(), StoreError> {
        let _guard = self.lock_writes();

        let mut ports = std::collections::HashSet::new();
        for inbound in &inbounds {
            let port = inbound.settings.port;
            if !ports.insert(port) || self.port_owner(port, None).is_some() {
                return Err(StoreError::PortInUse(port));
            }
        }

        let mut next_id = self.next_id.load(Ordering::SeqCst);
        let records = inbounds
            .into_iter()
            .map(|inbound| {
                let record = inbound.with_id(next_id);
                next_id += 1;
                record
            })
            .collect();

        self.commit(Change::Upsert(records), next_id)
    }

    fn delete_by_id(&self, id: InboundId) -> Result<(), StoreError> {
        let _guard = self.lock_writes();

        if !self.records.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        let next_id = self.next_id.load(Ordering::SeqCst);
        self.commit(Change::Remove(id), next_id)
    }

    fn update_by_id(&self, id: InboundId, patch: &InboundPatch) -> Result<(), StoreError> {
        let _guard = self.lock_writes();

        let mut record = self
            .records
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or(StoreError::NotFound(id))?;
        patch.apply_to(&mut record);

        if self.port_owner(record.settings.port, Some(id)).is_some() {
            return Err(StoreError::PortInUse(record.settings.port));
        }

        let next_id = self.next_id.load(Ordering::SeqCst);
        self.commit(Change::Upsert(vec![record]), next_id)
    }
}

/// Write to a sibling temp file, sync it and rename it over the target.
/// The temp file is removed if any step fails.
fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    let result = write_synced(&tmp, snapshot)
        .and_then(|()| fs::rename(&tmp, path).map_err(StoreError::from));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_synced(tmp: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    let mut writer = BufWriter::new(File::create(tmp)?);
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}
