//! Mutation gateway.
//!
//! Every administrative write goes through [`MutationGateway`]. Each
//! operation validates its input before touching the store and calls
//! [`RestartFlag::mark_dirty`] if and only if the store reported success.

use std::sync::Arc;

use thiserror::Error;

use crate::inbound::model::{
    inbound_tag, InboundConfig, InboundId, InboundPatch, InboundSettings, NewInbound, OwnerId,
};
use crate::inbound::store::{ConfigStore, StoreError};
use crate::restart::RestartFlag;

/// Largest number of inbounds accepted by one batch add.
pub const MAX_BATCH_SIZE: usize = 100;

/// Input rejected before any store access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid inbound id {0:?}: expected a positive integer")]
    InvalidId(String),

    #[error("inbound list must not be empty")]
    EmptyBatch,

    #[error("at most {max} inbounds per batch, got {len}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("port must be between 1 and 65535")]
    InvalidPort,

    #[error("inbound #{index} has no port")]
    MissingPort { index: usize },

    #[error("malformed request: {0}")]
    Malformed(String),
}

/// Failure of a gateway mutation.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Parse a client-supplied path id.
pub fn parse_inbound_id(raw: &str) -> Result<InboundId, ValidationError> {
    match raw.trim().parse::<InboundId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ValidationError::InvalidId(raw.to_string())),
    }
}

/// Validates and applies inbound mutations, arming the restart flag on success.
#[derive(Clone)]
pub struct MutationGateway {
    store: Arc<dyn ConfigStore>,
    flag: Arc<RestartFlag>,
}

impl MutationGateway {
    pub fn new(store: Arc<dyn ConfigStore>, flag: Arc<RestartFlag>) -> Self {
        Self { store, flag }
    }

    /// Inbounds owned by `owner`. Never marks the flag.
    pub fn list(&self, owner: OwnerId) -> Result<Vec<InboundConfig>, StoreError> {
        self.store.list_for_owner(owner)
    }

    /// Add one inbound owned by `owner`.
    ///
    /// Post-condition: the restart flag is set iff the insert succeeded.
    pub fn add(
        &self,
        owner: OwnerId,
        settings: InboundSettings,
    ) -> Result<InboundId, MutationError> {
        if settings.port == 0 {
            return Err(ValidationError::InvalidPort.into());
        }

        let id = self.store.insert(NewInbound::stamp(owner, settings))?;
        self.flag.mark_dirty();
        tracing::info!(owner, id, "Inbound added");
        Ok(id)
    }

    /// Add 1..=[`MAX_BATCH_SIZE`] inbounds as a single store write.
    ///
    /// The whole batch is validated first; nothing is written if any entry
    /// is rejected. Post-condition: the restart flag is set iff the batch
    /// insert succeeded.
    pub fn add_batch(
        &self,
        owner: OwnerId,
        batch: Vec<InboundSettings>,
    ) -> Result<(), MutationError> {
        if batch.is_empty() {
            return Err(ValidationError::EmptyBatch.into());
        }
        if batch.len() > MAX_BATCH_SIZE {
            return Err(ValidationError::BatchTooLarge {
                len: batch.len(),
                max: MAX_BATCH_SIZE,
            }
            .into());
        }
        if let Some(index) = batch.iter().position(|s| s.port == 0) {
            return Err(ValidationError::MissingPort { index }.into());
        }

        let count = batch.len();
        let stamped = batch
            .into_iter()
            .map(|settings| NewInbound::stamp(owner, settings))
            .collect();

        self.store.insert_batch(stamped)?;
        self.flag.mark_dirty();
        tracing::info!(owner, count, "Inbound batch added");
        Ok(())
    }

    /// Delete the caller's inbound `raw_id`.
    ///
    /// Post-condition: the restart flag is set iff the delete succeeded.
    pub fn delete(&self, owner: OwnerId, raw_id: &str) -> Result<(), MutationError> {
        let id = parse_inbound_id(raw_id)?;
        self.ensure_owned(owner, id)?;

        self.store.delete_by_id(id)?;
        self.flag.mark_dirty();
        tracing::info!(owner, id, "Inbound deleted");
        Ok(())
    }

    /// Bind `patch` onto the caller's inbound `raw_id`.
    ///
    /// A port change re-derives the tag. Post-condition: the restart flag is
    /// set iff the update succeeded.
    pub fn update(
        &self,
        owner: OwnerId,
        raw_id: &str,
        mut patch: InboundPatch,
    ) -> Result<(), MutationError> {
        let id = parse_inbound_id(raw_id)?;
        if patch.port == Some(0) {
            return Err(ValidationError::InvalidPort.into());
        }
        self.ensure_owned(owner, id)?;

        patch.tag = patch.port.map(inbound_tag);
        self.store.update_by_id(id, &patch)?;
        self.flag.mark_dirty();
        tracing::info!(owner, id, "Inbound updated");
        Ok(())
    }

    /// Records of other owners are reported as missing.
    fn ensure_owned(&self, owner: OwnerId, id: InboundId) -> Result<(), StoreError> {
        match self.store.get(id)? {
            Some(inbound) if inbound.user_id == owner => Ok(()),
            _ => Err(StoreError::NotFound(id)),
        }
    }
}
