//! Core engine: ledger, wager placement, settlement, purse, catalogue and
//! reports.
//!
//! [`WagerEngine`] owns one critical section. Placement, settlement, deposits
//! and withdrawals all run inside it, so no two of them ever interleave on
//! the same engine: a placement can never read a balance another placement
//! is about to debit, and can never land on a selection that is being
//! settled.

pub mod catalogue;
pub mod ledger;
pub mod placement;
pub mod purse;
pub mod report;
pub mod settlement;

use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::storage::{StorageError, Store};

/// System failure. Business rejections travel in [`crate::types::Verdict`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Event not found for selection: {0}")]
    EventNotFound(Uuid),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// The wager ledger and settlement service.
pub struct WagerEngine<S> {
    store: Arc<S>,
    // Held for the whole of every balance-moving operation.
    critical: Mutex<()>,
}

impl<S: Store> WagerEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            critical: Mutex::new(()),
        }
    }

    /// The storage collaborator this engine writes through.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}
