//! CLI command handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use quill_core::api::BlogApi;
use quill_core::config::{Config, paths};
use quill_core::context::ClientContext;
use quill_core::http::ApiClient;
use quill_core::session::SessionStore;
use quill_core::storage::{FileStorage, Storage};

use crate::views::TimeMode;

pub mod auth;
pub mod config;
pub mod posts;

/// Everything a session-aware command needs, built once per process.
pub struct App {
    pub api: BlogApi,
    pub store: SessionStore,
    pub page_size: u32,
    pub time: TimeMode,
}

impl App {
    pub fn new(config: &Config, force_utc: bool) -> Result<Self> {
        let context = ClientContext::from_config(config).context("resolve API address")?;
        tracing::debug!(
            environment = %context.environment,
            base_url = context.base_url(),
            "client context"
        );

        let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(paths::state_dir()));
        Ok(Self {
            api: BlogApi::new(ApiClient::new(&context).context("create API client")?),
            store: SessionStore::bootstrap(storage),
            page_size: config.effective_page_size(),
            time: TimeMode::new(force_utc, config.time_display),
        })
    }
}
