use crate::discovery::{LinkedAccount, SearchSettings, DEFAULT_FEEDBACK_URL};
use crate::search::{ScoringWeights, Synonyms};
use std::env;
use std::path::PathBuf;

pub struct Config {
    pub host: String,
    pub port: u16,
    /// JSON file holding the action catalog.
    pub catalog_path: PathBuf,
    /// Glob patterns selecting the working set. `!` prefixes exclude.
    pub action_filter: Vec<String>,
    /// Connector names the working set is limited to (case-insensitive).
    pub providers: Vec<String>,
    /// Account used to fill the account header when a caller gives none.
    pub account_id: Option<String>,
    /// Linked accounts and the connectors each reaches.
    pub linked_accounts: Vec<LinkedAccount>,
    /// Endpoint of the feedback meta-tool.
    pub feedback_url: String,
    pub shutdown_timeout_secs: u64,
    /// Results returned by /search when the request does not say.
    pub default_top_k: usize,
    /// Upper bound on `top_k` per request.
    pub max_top_k: usize,
    pub min_score: f64,
    pub bm25_k1: f64,
    pub bm25_b: f64,
    /// Share of BM25 in the hybrid score; the rest is TF-IDF cosine.
    pub bm25_weight: f64,
    /// Times an action's name tokens are repeated in its search document.
    pub name_weight: usize,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            catalog_path: PathBuf::from(
                env::var("CATALOG_PATH").unwrap_or_else(|_| "./catalog.json".to_string()),
            ),
            action_filter: parse_patterns(&env::var("ACTION_FILTER").unwrap_or_default()),
            providers: parse_patterns(&env::var("PROVIDER_FILTER").unwrap_or_default()),
            account_id: env::var("ACCOUNT_ID").ok().filter(|s| !s.trim().is_empty()),
            linked_accounts: parse_linked_accounts(
                &env::var("LINKED_ACCOUNTS").unwrap_or_default(),
            ),
            feedback_url: env::var("FEEDBACK_URL")
                .unwrap_or_else(|_| DEFAULT_FEEDBACK_URL.to_string()),
            shutdown_timeout_secs: env::var("SHUTDOWN_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            default_top_k: env::var("DEFAULT_TOP_K")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
            max_top_k: env::var("MAX_TOP_K")
                .unwrap_or_else(|_| "50".to_string())
                .parse()?,
            min_score: env::var("MIN_SCORE")
                .unwrap_or_else(|_| "0.0".to_string())
                .parse()?,
            bm25_k1: env::var("BM25_K1")
                .unwrap_or_else(|_| "1.5".to_string())
                .parse()?,
            bm25_b: env::var("BM25_B")
                .unwrap_or_else(|_| "0.75".to_string())
                .parse()?,
            bm25_weight: env::var("BM25_WEIGHT")
                .unwrap_or_else(|_| "0.2".to_string())
                .parse()?,
            name_weight: env::var("NAME_WEIGHT")
                .unwrap_or_else(|_| "3".to_string())
                .parse()?,
        };

        if !(0.0..=1.0).contains(&config.bm25_weight) {
            anyhow::bail!("BM25_WEIGHT must be between 0 and 1, got {}", config.bm25_weight);
        }
        if config.default_top_k > config.max_top_k {
            anyhow::bail!(
                "DEFAULT_TOP_K ({}) exceeds MAX_TOP_K ({})",
                config.default_top_k,
                config.max_top_k
            );
        }

        Ok(config)
    }

    /// Index settings derived from the BM25 and name-weight variables.
    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            name_weight: self.name_weight,
            weights: ScoringWeights {
                k1: self.bm25_k1,
                b: self.bm25_b,
                bm25_weight: self.bm25_weight,
            },
            synonyms: Synonyms::builtin(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let weights = ScoringWeights::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            catalog_path: PathBuf::from("./catalog.json"),
            action_filter: Vec::new(),
            providers: Vec::new(),
            account_id: None,
            linked_accounts: Vec::new(),
            feedback_url: DEFAULT_FEEDBACK_URL.to_string(),
            shutdown_timeout_secs: 30,
            default_top_k: 5,
            max_top_k: 50,
            min_score: 0.0,
            bm25_k1: weights.k1,
            bm25_b: weights.b,
            bm25_weight: weights.bm25_weight,
            name_weight: crate::search::DEFAULT_NAME_WEIGHT,
        }
    }
}

/// Split a comma-separated pattern list, dropping blanks.
pub fn parse_patterns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `acct-1:hris|ats,acct-2` into linked accounts. An account without
/// a connector list reaches every connector.
pub fn parse_linked_accounts(raw: &str) -> Vec<LinkedAccount> {
    parse_patterns(raw)
        .into_iter()
        .filter_map(|entry| {
            let (id, connectors) = match entry.split_once(':') {
                Some((id, connectors)) => (id.trim(), connectors),
                None => (entry.as_str(), ""),
            };
            (!id.is_empty())
                .then(|| LinkedAccount::new(id).with_connectors(connectors.split('|')))
        })
        .collect()
}
