//! Application state management
//!
//! This module provides the shared application state that is passed
//! to all request handlers via Axum's state extraction.
//!
//! Signing keys and store handles are built once at startup; every field is
//! either `Arc`-backed or `Copy`, so cloning per request is cheap.

use crate::config::AppConfig;
use crate::repositories::{
    InMemoryRefreshTokenStore, InMemoryUserStore, PgRefreshTokenRepository, PgUserRepository,
    RefreshTokenStore, UserStore,
};
use crate::services::{AuthService, UserService};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    auth: AuthService,
    users: UserService,
    config: Arc<AppConfig>,
    /// Present only when a Prometheus recorder was installed
    metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create state backed by Postgres
    pub fn new(db: PgPool, config: AppConfig) -> Self {
        Self::with_stores(
            Arc::new(PgUserRepository::new(db.clone())),
            Arc::new(PgRefreshTokenRepository::new(db)),
            config,
        )
    }

    /// Create state backed by in-process stores
    ///
    /// Data is lost on restart. Used by tests and local experiments.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::with_stores(
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemoryRefreshTokenStore::new()),
            config,
        )
    }

    pub fn with_stores(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        config: AppConfig,
    ) -> Self {
        let auth = AuthService::from_config(users.clone(), refresh_tokens, &config);

        Self {
            auth,
            users: UserService::new(users),
            config: Arc::new(config),
            metrics: None,
        }
    }

    /// Attach a Prometheus handle so `/metrics` can render it
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    #[inline]
    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    #[inline]
    pub fn users(&self) -> &UserService {
        &self.users
    }

    /// Get a reference to the configuration
    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[inline]
    pub fn metrics(&self) -> Option<&PrometheusHandle> {
        self.metrics.as_ref()
    }
}
