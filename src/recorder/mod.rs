//! Transaction recorder.
//!
//! # Responsibilities
//! - Create the transaction before any backend call starts
//! - Record the primary outcome exactly once
//! - Append one entry per secondary route outcome, from any task
//!
//! # Design Decisions
//! - The recorder is the only writer of transactions
//! - There is no "all done" signal here; completion of secondary routes is
//!   observed through the multiplexer's `SecondaryDispatch` or by polling
//!   the stored transaction

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::model::{Channel, Client, PrimaryOutcome, RecordedRequest, RouteOutcome, RouteResult, Transaction};
use crate::repository::{Repository, RepositoryError};

#[derive(Clone)]
pub struct TransactionRecorder {
    repository: Arc<dyn Repository>,
}

impl TransactionRecorder {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    pub async fn begin(
        &self,
        request: RecordedRequest,
        client: &Client,
        channel: &Channel,
    ) -> Result<Uuid, RepositoryError> {
        let transaction = Transaction::new(&client.client_id, &channel.name, request);
        let id = self.repository.create_transaction(transaction).await?;
        tracing::debug!(transaction_id = %id, channel = %channel.name, client = %client.client_id, "Transaction started");
        Ok(id)
    }

    pub async fn record_primary(&self, id: Uuid, outcome: PrimaryOutcome) -> Result<(), RepositoryError> {
        self.repository.update_transaction_primary(id, outcome).await
    }

    pub async fn append_secondary(
        &self,
        id: Uuid,
        route_name: &str,
        request: RecordedRequest,
        result: RouteResult,
    ) -> Result<(), RepositoryError> {
        let outcome = RouteOutcome {
            name: route_name.to_string(),
            request,
            result,
            recorded_at: Utc::now(),
        };
        self.repository.append_transaction_route(id, outcome).await?;
        tracing::debug!(transaction_id = %id, route = %route_name, "Secondary route outcome recorded");
        Ok(())
    }
}
