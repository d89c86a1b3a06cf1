use crate::catalog::load_catalog_file;
use crate::config::Config;
use crate::discovery::Toolset;
use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Application state shared across all request handlers.
pub struct AppState {
    pub toolset: Arc<Toolset>,
    /// Set once the search index for the working set has been built.
    pub ready: AtomicBool,
    pub config: Arc<Config>,
}

impl AppState {
    /// Load the catalog named by `config`, apply the action filter and warm
    /// up the search index.
    pub fn new(config: Config) -> Result<Self> {
        let catalog = load_catalog_file(&config.catalog_path)?;
        Self::from_catalog(catalog, config)
    }

    /// Build state over an already loaded catalog.
    pub fn from_catalog(catalog: crate::catalog::Catalog, config: Config) -> Result<Self> {
        let mut toolset = Toolset::new(catalog)
            .with_settings(config.search_settings())
            .with_feedback_url(config.feedback_url.clone())
            .with_filter(&config.action_filter)?
            .with_providers(&config.providers)?
            .with_accounts(config.linked_accounts.clone())?;
        if let Some(account) = &config.account_id {
            toolset = toolset.with_account(account.clone());
        }

        Self::from_toolset(toolset, config)
    }

    pub fn from_toolset(toolset: Toolset, config: Config) -> Result<Self> {
        let state = Self {
            toolset: Arc::new(toolset),
            ready: AtomicBool::new(false),
            config: Arc::new(config),
        };

        state.warmup();
        state.ready.store(true, Ordering::SeqCst);

        Ok(state)
    }

    /// Build the lexical index up front so the first real query does not
    /// pay for it. Done even with a semantic ranker, which falls back to it.
    fn warmup(&self) {
        tracing::info!(
            actions = self.toolset.action_names().len(),
            "Building search index..."
        );
        let documents = self.toolset.warm_index();
        tracing::info!(documents, "Search index warmup completed");
    }

    /// Check if the service is ready to handle requests.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
