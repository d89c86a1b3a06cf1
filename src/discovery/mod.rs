//! Meta-discovery: find the right action for an intent, then run it by name.
//!
//! [`Toolset`] composes the glob filter, the lexical index and an optional
//! semantic ranker. Discovery never fails hard: if the semantic ranker is
//! missing or errors, the lexical ranking is returned instead.
//!
//! # Scope
//! The working set is the full catalog narrowed by glob patterns, by
//! provider (connector) names and by the connectors of the linked accounts.
//! All three apply together.
//!
//! # Concurrency
//! The working set and the index are immutable snapshots behind `Arc`s.
//! Changing the scope swaps in a new working set; the index for it is built
//! lazily on the next discovery and swapped in as a whole.

pub mod feedback;
pub mod meta_tools;

pub use feedback::{feedback_action, DEFAULT_FEEDBACK_URL, TOOL_FEEDBACK};
pub use meta_tools::{meta_tool_definitions, ToolDefinition, TOOL_EXECUTE, TOOL_SEARCH};

use crate::catalog::{connector_of, ActionDescriptor, Catalog};
use crate::dispatch::{build_request, ResolvedRequest};
use crate::error::{AppError, CatalogError, DispatchError};
use crate::filter::FilterSet;
use crate::search::{index_catalog, ScoringWeights, Synonyms, DEFAULT_NAME_WEIGHT};
use crate::snapshot::{snapshot_key, CachedIndex, IndexCache, SnapshotKey};
use crate::transport::{RankedAction, SemanticRanker, Transport};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, OnceLock, RwLock};

/// Index construction settings, fixed for every index this toolset builds.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub name_weight: usize,
    pub weights: ScoringWeights,
    pub synonyms: Synonyms,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            name_weight: DEFAULT_NAME_WEIGHT,
            weights: ScoringWeights::default(),
            synonyms: Synonyms::builtin(),
        }
    }
}

/// Options for [`Toolset::discover_with`].
#[derive(Debug, Clone)]
pub struct DiscoverOptions {
    pub limit: usize,
    /// Results scoring below this are dropped.
    pub min_score: f64,
    /// Restrict to one connector (case-insensitive name prefix).
    pub connector: Option<String>,
    /// Restrict to the connectors of these linked accounts. Ids that are not
    /// linked contribute no connectors.
    pub account_ids: Option<Vec<String>>,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            min_score: 0.0,
            connector: None,
            account_ids: None,
        }
    }
}

impl DiscoverOptions {
    pub fn limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
}

/// An account the toolset acts for and the connectors linked to it.
///
/// An empty connector set means the account reaches every connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedAccount {
    pub id: String,
    pub connectors: BTreeSet<String>,
}

impl LinkedAccount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            connectors: BTreeSet::new(),
        }
    }

    /// Connector names are compared lowercase.
    pub fn with_connectors<I, S>(mut self, connectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.connectors.extend(
            connectors
                .into_iter()
                .map(|c| c.as_ref().trim().to_lowercase())
                .filter(|c| !c.is_empty()),
        );
        self
    }

    pub fn serves(&self, connector: &str) -> bool {
        self.connectors.is_empty() || self.connectors.contains(connector)
    }
}

/// One working-set action bound to the account it runs under.
#[derive(Debug, Clone)]
pub struct BoundAction {
    pub account_id: Option<String>,
    pub action: Arc<ActionDescriptor>,
}

/// A resolved request and the account it was resolved for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountRequest {
    pub account_id: Option<String>,
    pub request: ResolvedRequest,
}

#[derive(Debug, Clone, Default)]
struct Scope {
    patterns: Vec<String>,
    /// Lowercase connector names; empty keeps every connector.
    providers: Vec<String>,
    accounts: Vec<LinkedAccount>,
}

impl Scope {
    fn is_unrestricted(&self) -> bool {
        self.patterns.is_empty() && self.providers.is_empty() && self.accounts.is_empty()
    }

    fn allows_connector(&self, connector: &str) -> bool {
        let provider_ok =
            self.providers.is_empty() || self.providers.iter().any(|p| p == connector);
        let account_ok =
            self.accounts.is_empty() || self.accounts.iter().any(|a| a.serves(connector));
        provider_ok && account_ok
    }
}

struct WorkingSet {
    scope: Scope,
    catalog: Catalog,
    key: SnapshotKey,
}

impl WorkingSet {
    fn new(full: &Catalog, scope: Scope) -> Result<Self, CatalogError> {
        let filter = FilterSet::new(&scope.patterns)?;
        let catalog = if scope.is_unrestricted() {
            full.clone()
        } else {
            full.retain(|action| {
                filter.matches(&action.name) && scope.allows_connector(&action.connector())
            })
        };
        let key = snapshot_key(&catalog);
        Ok(Self {
            scope,
            catalog,
            key,
        })
    }
}

/// Remove repeated ids, keeping the first occurrence of each.
fn dedupe_ids<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(|id| id.as_ref().trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

/// A filtered view over a shared catalog with search and dispatch.
pub struct Toolset {
    catalog: Arc<Catalog>,
    working: RwLock<Arc<WorkingSet>>,
    index: IndexCache,
    ranker: Option<Arc<dyn SemanticRanker>>,
    account_id: Option<String>,
    settings: SearchSettings,
    feedback_url: String,
}

impl Toolset {
    /// A toolset exposing the whole catalog.
    pub fn new(catalog: impl Into<Arc<Catalog>>) -> Self {
        let catalog = catalog.into();
        let working = WorkingSet {
            scope: Scope::default(),
            catalog: (*catalog).clone(),
            key: snapshot_key(&catalog),
        };
        Self {
            catalog,
            working: RwLock::new(Arc::new(working)),
            index: IndexCache::new(),
            ranker: None,
            account_id: None,
            settings: SearchSettings::default(),
            feedback_url: DEFAULT_FEEDBACK_URL.to_string(),
        }
    }

    pub fn with_filter<S: AsRef<str>>(self, patterns: &[S]) -> Result<Self, CatalogError> {
        self.set_filter(patterns)?;
        Ok(self)
    }

    pub fn with_providers<S: AsRef<str>>(self, providers: &[S]) -> Result<Self, CatalogError> {
        self.set_providers(providers)?;
        Ok(self)
    }

    pub fn with_accounts(self, accounts: Vec<LinkedAccount>) -> Result<Self, CatalogError> {
        self.set_accounts(accounts)?;
        Ok(self)
    }

    /// Default account used when no linked account applies.
    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Endpoint that `meta_collect_tool_feedback` posts to.
    pub fn with_feedback_url(mut self, url: impl Into<String>) -> Self {
        self.feedback_url = url.into();
        self
    }

    pub fn with_ranker(mut self, ranker: Arc<dyn SemanticRanker>) -> Self {
        self.ranker = Some(ranker);
        self
    }

    pub fn with_settings(mut self, settings: SearchSettings) -> Self {
        self.settings = settings;
        self.index.invalidate();
        self
    }

    /// Replace the include/exclude patterns. The index follows lazily.
    pub fn set_filter<S: AsRef<str>>(&self, patterns: &[S]) -> Result<(), CatalogError> {
        let patterns: Vec<String> = patterns.iter().map(|p| p.as_ref().to_string()).collect();
        self.rescope(|scope| scope.patterns = patterns)
    }

    /// Keep only actions of these connectors (case-insensitive). An empty
    /// list lifts the restriction.
    pub fn set_providers<S: AsRef<str>>(&self, providers: &[S]) -> Result<(), CatalogError> {
        let providers = dedupe_ids(providers.iter().map(|p| p.as_ref().to_lowercase()));
        self.rescope(|scope| scope.providers = providers)
    }

    /// Replace the linked accounts. Repeated ids keep their first entry.
    /// The working set shrinks to the connectors the accounts reach.
    pub fn set_accounts(&self, accounts: Vec<LinkedAccount>) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        let accounts: Vec<LinkedAccount> = accounts
            .into_iter()
            .filter(|a| !a.id.trim().is_empty() && seen.insert(a.id.clone()))
            .collect();
        self.rescope(|scope| scope.accounts = accounts)
    }

    fn rescope<F>(&self, change: F) -> Result<(), CatalogError>
    where
        F: FnOnce(&mut Scope),
    {
        let mut slot = self.working.write().unwrap_or_else(|e| e.into_inner());
        let mut scope = slot.scope.clone();
        change(&mut scope);
        let working = Arc::new(WorkingSet::new(&self.catalog, scope)?);

        tracing::info!(
            patterns = ?working.scope.patterns,
            providers = ?working.scope.providers,
            accounts = working.scope.accounts.len(),
            selected = working.catalog.len(),
            total = self.catalog.len(),
            "Working set updated"
        );

        *slot = working;
        Ok(())
    }

    /// Patterns that define the current working set.
    pub fn patterns(&self) -> Vec<String> {
        self.working().scope.patterns.clone()
    }

    pub fn providers(&self) -> Vec<String> {
        self.working().scope.providers.clone()
    }

    pub fn accounts(&self) -> Vec<LinkedAccount> {
        self.working().scope.accounts.clone()
    }

    /// Accounts a call should fan out to: `explicit` when given and
    /// non-empty, else the linked accounts, else the default account.
    pub fn effective_accounts(&self, explicit: Option<&[String]>) -> Vec<String> {
        if let Some(ids) = explicit.filter(|ids| !ids.is_empty()) {
            return dedupe_ids(ids);
        }
        let linked = self.accounts();
        if !linked.is_empty() {
            return linked.into_iter().map(|a| a.id).collect();
        }
        self.account_id.iter().cloned().collect()
    }

    fn working(&self) -> Arc<WorkingSet> {
        let slot = self.working.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&slot)
    }

    /// The full, unfiltered catalog.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    pub fn feedback_url(&self) -> &str {
        &self.feedback_url
    }

    /// Names in the current working set, catalog order.
    pub fn action_names(&self) -> Vec<String> {
        self.working()
            .catalog
            .names()
            .map(str::to_string)
            .collect()
    }

    /// Look up an action in the current working set.
    pub fn get(&self, name: &str) -> Option<Arc<ActionDescriptor>> {
        self.working().catalog.get(name).cloned()
    }

    /// The working set fanned out per account: one entry for every linked
    /// account that reaches the action's connector, or a single entry under
    /// the default account when none are linked.
    pub fn bound_actions(&self) -> Vec<BoundAction> {
        let working = self.working();
        let accounts = &working.scope.accounts;

        let bound: Vec<BoundAction> = working
            .catalog
            .iter()
            .flat_map(|action| {
                let connector = action.connector();
                let ids: Vec<Option<String>> = if accounts.is_empty() {
                    vec![self.account_id.clone()]
                } else {
                    accounts
                        .iter()
                        .filter(|a| a.serves(&connector))
                        .map(|a| Some(a.id.clone()))
                        .collect()
                };
                ids.into_iter().map(move |account_id| BoundAction {
                    account_id,
                    action: Arc::clone(action),
                })
            })
            .collect();
        bound
    }

    /// Build the lexical index for the current working set now, so the
    /// first lexical query does not pay for it. Returns the document count.
    pub fn warm_index(&self) -> usize {
        let working = self.working();
        self.lexical_index(&working).index.len()
    }

    /// True when the lexical index matches the current working set.
    pub fn index_is_current(&self) -> bool {
        self.index.get(&self.working().key).is_some()
    }

    fn lexical_index(&self, working: &WorkingSet) -> Arc<CachedIndex> {
        self.index.get_or_build(working.key, || {
            index_catalog(
                &working.catalog,
                self.settings.name_weight,
                self.settings.weights,
                self.settings.synonyms.clone(),
            )
        })
    }

    /// Rank actions for a natural-language query.
    pub fn discover(&self, query: &str, limit: usize) -> Vec<RankedAction> {
        self.discover_with(query, &DiscoverOptions::limit(limit))
    }

    pub fn discover_with(&self, query: &str, options: &DiscoverOptions) -> Vec<RankedAction> {
        metrics::counter!("discover_requests_total").increment(1);

        let working = self.working();
        if working.catalog.is_empty() || options.limit == 0 {
            return Vec::new();
        }

        let connector = options.connector.as_deref().map(str::to_lowercase);
        let accounts: Option<Vec<&LinkedAccount>> = options.account_ids.as_ref().map(|ids| {
            working
                .scope
                .accounts
                .iter()
                .filter(|a| ids.contains(&a.id))
                .collect()
        });
        let in_scope = |name: &str| {
            if !working.catalog.contains(name) {
                return false;
            }
            let action_connector = connector_of(name);
            connector.as_deref().map_or(true, |c| action_connector == c)
                && accounts
                    .as_ref()
                    .map_or(true, |a| a.iter().any(|acct| acct.serves(&action_connector)))
        };

        if let Some(ranker) = &self.ranker {
            let candidates: Vec<String> = working
                .catalog
                .names()
                .filter(|n| in_scope(*n))
                .map(str::to_string)
                .collect();

            match ranker.rank(query, &candidates, options.limit) {
                Ok(ranked) => {
                    return postprocess_semantic(ranked, &in_scope, options);
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Semantic ranking failed, falling back to local BM25+TF-IDF search"
                    );
                    metrics::counter!("semantic_fallback_total").increment(1);
                }
            }
        }

        let cached = self.lexical_index(&working);

        // A connector or account restriction can discard top hits, so rank
        // everything first.
        let fetch = if connector.is_some() || accounts.is_some() {
            cached.index.len()
        } else {
            options.limit
        };

        cached
            .index
            .query(query, fetch)
            .into_iter()
            .filter(|hit| in_scope(hit.id.as_str()) && hit.score >= options.min_score)
            .take(options.limit)
            .map(|hit| RankedAction::new(hit.id, hit.score))
            .collect()
    }

    /// Resolve the request for `name` using the first linked account that
    /// reaches its connector, or the default account.
    pub fn execute_by_name(
        &self,
        name: &str,
        args: &Map<String, Value>,
    ) -> Result<ResolvedRequest, DispatchError> {
        let account = self.account_for(name);
        self.execute_for_account(name, account.as_deref(), args)
    }

    fn account_for(&self, name: &str) -> Option<String> {
        let accounts = self.accounts();
        if accounts.is_empty() {
            return self.account_id.clone();
        }
        let connector = connector_of(name);
        accounts
            .into_iter()
            .find(|a| a.serves(&connector))
            .map(|a| a.id)
            .or_else(|| self.account_id.clone())
    }

    /// Resolve one request per account.
    ///
    /// Explicit ids are used as given. Otherwise the call fans out to every
    /// linked account that reaches the action's connector, falling back to
    /// the default account. With no account at all a single request is
    /// resolved without account context.
    pub fn execute_for_accounts(
        &self,
        name: &str,
        account_ids: Option<&[String]>,
        args: &Map<String, Value>,
    ) -> Result<Vec<AccountRequest>, DispatchError> {
        let explicit = account_ids.filter(|ids| !ids.is_empty());
        let targets: Vec<String> = match explicit {
            Some(ids) => dedupe_ids(ids),
            None => {
                let connector = connector_of(name);
                let linked: Vec<String> = self
                    .accounts()
                    .into_iter()
                    .filter(|a| a.serves(&connector))
                    .map(|a| a.id)
                    .collect();
                if linked.is_empty() {
                    self.account_id.iter().cloned().collect()
                } else {
                    linked
                }
            }
        };

        if targets.is_empty() {
            let request = self.execute_for_account(name, None, args)?;
            return Ok(vec![AccountRequest {
                account_id: None,
                request,
            }]);
        }

        let mut requests = Vec::with_capacity(targets.len());
        for account in targets {
            let request = self.execute_for_account(name, Some(&account), args)?;
            requests.push(AccountRequest {
                account_id: Some(account),
                request,
            });
        }
        Ok(requests)
    }

    /// Resolve the request for `name` with an explicit account context.
    pub fn execute_for_account(
        &self,
        name: &str,
        account_id: Option<&str>,
        args: &Map<String, Value>,
    ) -> Result<ResolvedRequest, DispatchError> {
        let descriptor = self
            .get(name)
            .ok_or_else(|| DispatchError::UnknownAction(name.to_string()))?;

        match build_request(&descriptor, account_id, args) {
            Ok(request) => {
                metrics::counter!("dispatch_requests_total").increment(1);
                tracing::debug!(action = name, method = %request.method, url = %request.url, "Request resolved");
                Ok(request)
            }
            Err(e) => {
                metrics::counter!("dispatch_errors_total").increment(1);
                if !e.is_caller_error() {
                    tracing::error!(action = name, error = %e, "Malformed action descriptor");
                }
                Err(e)
            }
        }
    }

    /// Resolve and send through `transport`.
    pub fn call(
        &self,
        name: &str,
        args: &Map<String, Value>,
        transport: &dyn Transport,
    ) -> Result<Value, AppError> {
        let request = self.execute_by_name(name, args)?;
        transport
            .send(&request)
            .map_err(|e| AppError::TransportError(e.to_string()))
    }
}

/// Strip version decoration from names returned by semantic search:
/// `calendly_1.0.0_calendly_create_scheduling_link_global` becomes
/// `calendly_create_scheduling_link`.
pub fn normalize_action_name(name: &str) -> &str {
    static VERSIONED: OnceLock<Regex> = OnceLock::new();
    let re = VERSIONED.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9]*_\d+(?:\.\d+)+_(.+)_global$").expect("valid regex")
    });
    re.captures(name)
        .and_then(|c| c.get(1))
        .map_or(name, |m| m.as_str())
}

fn postprocess_semantic<F>(
    ranked: Vec<RankedAction>,
    in_scope: &F,
    options: &DiscoverOptions,
) -> Vec<RankedAction>
where
    F: Fn(&str) -> bool,
{
    let mut seen = HashSet::new();
    let mut results = Vec::with_capacity(options.limit);

    for hit in ranked {
        let name = normalize_action_name(&hit.name).to_string();
        if hit.score < options.min_score || !in_scope(&name) || !seen.insert(name.clone()) {
            continue;
        }
        results.push(RankedAction::new(name, hit.score));
        if results.len() == options.limit {
            break;
        }
    }

    results
}
