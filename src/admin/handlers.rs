use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::admin::AdminState;
use crate::model::{Channel, Transaction};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct RouteSummary {
    pub name: String,
    pub target: String,
    pub primary: bool,
    pub enabled: bool,
}

#[derive(Serialize)]
pub struct ChannelSummary {
    pub name: String,
    pub url_pattern: String,
    pub enabled: bool,
    pub allow: Vec<String>,
    /// `None` means every method is allowed.
    pub methods: Option<String>,
    pub routes: Vec<RouteSummary>,
}

impl From<&Channel> for ChannelSummary {
    fn from(channel: &Channel) -> Self {
        Self {
            name: channel.name.clone(),
            url_pattern: channel.url_pattern.as_str().to_string(),
            enabled: channel.enabled,
            allow: channel.allow.iter().map(str::to_string).collect(),
            methods: channel.methods.as_ref().map(|m| m.to_string()),
            routes: channel
                .routes
                .iter()
                .map(|r| RouteSummary {
                    name: r.name.clone(),
                    target: r.authority(),
                    primary: r.primary,
                    enabled: r.enabled,
                })
                .collect(),
        }
    }
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_channels(State(state): State<AdminState>) -> Result<Json<Vec<ChannelSummary>>, StatusCode> {
    let channels = state.repository.find_channels_ordered().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to list channels");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(channels.iter().map(|c| ChannelSummary::from(c.as_ref())).collect()))
}

pub async fn get_transaction(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transaction>, StatusCode> {
    match state.repository.find_transaction(id).await {
        Ok(Some(transaction)) => Ok(Json(transaction)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!(transaction_id = %id, error = %e, "Failed to load transaction");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
