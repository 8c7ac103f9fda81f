//! Read-only admin API.
//!
//! Served on its own listener (`[admin]`), never on the mediation port, so
//! admin paths cannot collide with channel patterns.
//!
//! | Route | Returns |
//! |---|---|
//! | `GET /admin/status` | version and liveness |
//! | `GET /admin/channels` | channel registry summary, in matching order |
//! | `GET /admin/transactions/{id}` | one recorded transaction |

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::repository::Repository;

#[derive(Clone)]
pub struct AdminState {
    pub repository: Arc<dyn Repository>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(repository: Arc<dyn Repository>, api_key: &str) -> Self {
        Self {
            repository,
            api_key: Arc::from(api_key),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/channels", get(get_channels))
        .route("/admin/transactions/{id}", get(get_transaction))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
