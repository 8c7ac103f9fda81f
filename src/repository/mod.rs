//! Storage seam for channels, clients and transactions.
//!
//! The mediator depends only on these operations, never on how records
//! are stored. `memory.rs` provides the implementation used by the binary
//! and the tests: a config-seeded registry plus a concurrent transaction
//! map.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Channel, Client, ClientCredential, PrimaryOutcome, RouteOutcome, Transaction};

pub use memory::{InMemoryRepository, Registry};

/// An ordered, immutable snapshot of the configured channels.
pub type ChannelSnapshot = Arc<Vec<Arc<Channel>>>;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("transaction {0} not found")]
    TransactionNotFound(Uuid),

    #[error("transaction {0} already has a primary outcome")]
    PrimaryAlreadyRecorded(Uuid),

    #[error("storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Channels in their stable configuration order.
    async fn find_channels_ordered(&self) -> Result<ChannelSnapshot, RepositoryError>;

    async fn find_client_by_credential(
        &self,
        credential: ClientCredential,
    ) -> Result<Option<Client>, RepositoryError>;

    async fn create_transaction(&self, transaction: Transaction) -> Result<Uuid, RepositoryError>;

    /// Set the primary outcome; fails if one is already recorded.
    async fn update_transaction_primary(
        &self,
        id: Uuid,
        outcome: PrimaryOutcome,
    ) -> Result<(), RepositoryError>;

    /// Append one secondary route outcome. Safe under concurrent calls.
    async fn append_transaction_route(
        &self,
        id: Uuid,
        outcome: RouteOutcome,
    ) -> Result<(), RepositoryError>;

    async fn find_transaction(&self, id: Uuid) -> Result<Option<Transaction>, RepositoryError>;
}
