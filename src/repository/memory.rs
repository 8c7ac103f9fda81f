//! In-memory repository.
//!
//! # Responsibilities
//! - Serve channel/client lookups from a registry built from configuration
//! - Swap the whole registry atomically on reload
//! - Hold transactions in a concurrent map, bounded by a retention limit
//!
//! # Design Decisions
//! - Registry lives behind `ArcSwap`: a request holds the snapshot it
//!   loaded, so a reload can never tear it
//! - Transaction mutation happens under the DashMap shard lock, which
//!   serializes concurrent appends to the same transaction
//! - Past the retention limit the oldest settled transaction is evicted;
//!   an in-flight one goes only when nothing older has settled

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::model::{
    Channel, Client, ClientCredential, PrimaryOutcome, RouteOutcome, Transaction, TransactionStatus,
};
use crate::repository::{ChannelSnapshot, Repository, RepositoryError};

/// Channels and clients, indexed for lookup.
#[derive(Debug, Default)]
pub struct Registry {
    channels: ChannelSnapshot,
    clients_by_id: HashMap<String, Client>,
    /// fingerprint -> client id
    fingerprints: HashMap<String, String>,
}

impl Registry {
    pub fn new(channels: Vec<Channel>, clients: Vec<Client>) -> Self {
        let channels = Arc::new(channels.into_iter().map(Arc::new).collect());

        let mut clients_by_id = HashMap::with_capacity(clients.len());
        let mut fingerprints = HashMap::new();
        for client in clients {
            if let Some(fp) = &client.cert_fingerprint {
                fingerprints.insert(fp.clone(), client.client_id.clone());
            }
            clients_by_id.insert(client.client_id.clone(), client);
        }

        Self {
            channels,
            clients_by_id,
            fingerprints,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn client_count(&self) -> usize {
        self.clients_by_id.len()
    }

    fn find_client(&self, credential: &ClientCredential) -> Option<Client> {
        let client_id = match credential {
            ClientCredential::ClientId(id) => id,
            ClientCredential::CertificateFingerprint(fp) => self.fingerprints.get(fp)?,
        };
        self.clients_by_id.get(client_id).cloned()
    }
}

pub const DEFAULT_MAX_RETAINED_TRANSACTIONS: usize = 10_000;

pub struct InMemoryRepository {
    registry: ArcSwap<Registry>,
    transactions: DashMap<Uuid, Transaction>,
    /// Transaction ids, oldest first.
    retained: Mutex<VecDeque<Uuid>>,
    max_retained: usize,
}

impl InMemoryRepository {
    pub fn new(registry: Registry) -> Self {
        Self::with_retention(registry, DEFAULT_MAX_RETAINED_TRANSACTIONS)
    }

    /// Keep at most `max_retained` transactions (minimum one).
    pub fn with_retention(registry: Registry, max_retained: usize) -> Self {
        Self {
            registry: ArcSwap::from_pointee(registry),
            transactions: DashMap::new(),
            retained: Mutex::new(VecDeque::new()),
            max_retained: max_retained.max(1),
        }
    }

    /// Atomically replace channels and clients.
    pub fn replace_registry(&self, registry: Registry) {
        tracing::info!(
            channels = registry.channel_count(),
            clients = registry.client_count(),
            "Registry replaced"
        );
        self.registry.store(Arc::new(registry));
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    fn is_settled(&self, id: &Uuid) -> bool {
        self.transactions
            .get(id)
            .map_or(true, |tx| tx.status != TransactionStatus::Processing)
    }

    fn retain(&self, id: Uuid) {
        let mut retained = self.retained.lock().unwrap_or_else(PoisonError::into_inner);
        retained.push_back(id);

        while retained.len() > self.max_retained {
            let index = retained.iter().position(|id| self.is_settled(id)).unwrap_or(0);
            if let Some(evicted) = retained.remove(index) {
                self.transactions.remove(&evicted);
                tracing::debug!(transaction_id = %evicted, "Evicted transaction");
            }
        }
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_channels_ordered(&self) -> Result<ChannelSnapshot, RepositoryError> {
        Ok(self.registry.load().channels.clone())
    }

    async fn find_client_by_credential(
        &self,
        credential: ClientCredential,
    ) -> Result<Option<Client>, RepositoryError> {
        Ok(self.registry.load().find_client(&credential))
    }

    async fn create_transaction(&self, transaction: Transaction) -> Result<Uuid, RepositoryError> {
        let id = transaction.id;
        self.transactions.insert(id, transaction);
        self.retain(id);
        Ok(id)
    }

    async fn update_transaction_primary(
        &self,
        id: Uuid,
        outcome: PrimaryOutcome,
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .transactions
            .get_mut(&id)
            .ok_or(RepositoryError::TransactionNotFound(id))?;
        if tx.record_primary(outcome) {
            Ok(())
        } else {
            Err(RepositoryError::PrimaryAlreadyRecorded(id))
        }
    }

    async fn append_transaction_route(
        &self,
        id: Uuid,
        outcome: RouteOutcome,
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .transactions
            .get_mut(&id)
            .ok_or(RepositoryError::TransactionNotFound(id))?;
        tx.push_route(outcome);
        Ok(())
    }

    async fn find_transaction(&self, id: Uuid) -> Result<Option<Transaction>, RepositoryError> {
        Ok(self.transactions.get(&id).map(|r| r.value().clone()))
    }
}
