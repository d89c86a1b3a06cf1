//! Glob-based include/exclude selection over action names.
//!
//! Patterns prefixed with `!` exclude, everything else includes. The two sets
//! are evaluated together: a name survives if it matches any include pattern
//! (or there are none) and matches no exclude pattern. Pattern order never
//! matters, so exclusion always wins over inclusion.

use crate::catalog::Catalog;
use crate::error::CatalogError;
use regex::Regex;
use std::collections::BTreeSet;

/// One compiled glob. `*` matches any run of characters, `?` exactly one;
/// everything else is literal. Matching is anchored and case-sensitive.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    pub fn new(glob: &str) -> Result<Self, CatalogError> {
        let mut expr = String::with_capacity(glob.len() + 8);
        expr.push_str("(?s)^");
        let mut buf = [0u8; 4];
        for ch in glob.chars() {
            match ch {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(other.encode_utf8(&mut buf))),
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| CatalogError::InvalidPattern {
            pattern: glob.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            source: glob.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

/// A compiled set of include and exclude patterns.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    include: Vec<GlobPattern>,
    exclude: Vec<GlobPattern>,
}

impl FilterSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, CatalogError> {
        let mut include = Vec::new();
        let mut exclude = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            match pattern.strip_prefix('!') {
                Some(negated) => exclude.push(GlobPattern::new(negated)?),
                None => include.push(GlobPattern::new(pattern)?),
            }
        }

        Ok(Self { include, exclude })
    }

    /// True when the set selects everything.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn matches(&self, name: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|p| p.matches(name));
        included && !self.exclude.iter().any(|p| p.matches(name))
    }

    /// Filter a catalog down to the selected actions, keeping catalog order.
    pub fn apply(&self, catalog: &Catalog) -> Catalog {
        if self.is_empty() {
            return catalog.clone();
        }
        catalog.retain(|action| self.matches(&action.name))
    }
}

/// Select the names that survive `patterns`.
pub fn select<'a, I, S>(names: I, patterns: &[S]) -> Result<BTreeSet<String>, CatalogError>
where
    I: IntoIterator<Item = &'a str>,
    S: AsRef<str>,
{
    let filter = FilterSet::new(patterns)?;
    Ok(names
        .into_iter()
        .filter(|name| filter.matches(name))
        .map(str::to_string)
        .collect())
}

/// Narrow a catalog with `patterns`.
pub fn filter<S: AsRef<str>>(catalog: &Catalog, patterns: &[S]) -> Result<Catalog, CatalogError> {
    let filter = FilterSet::new(patterns)?;
    let selected = filter.apply(catalog);
    tracing::debug!(
        total = catalog.len(),
        selected = selected.len(),
        patterns = patterns.len(),
        "Catalog filtered"
    );
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: &[&str] = &[
        "hris_list_employees",
        "hris_get_employee",
        "hris_delete_employee",
        "hris_delete_list",
        "ats_list_jobs",
        "crm_list_contacts",
    ];

    fn run(patterns: &[&str]) -> Vec<String> {
        select(NAMES.iter().copied(), patterns)
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_empty_patterns_select_everything() {
        assert_eq!(run(&[]).len(), NAMES.len());
    }

    #[test]
    fn test_star_and_question_mark() {
        assert_eq!(run(&["ats_*"]), vec!["ats_list_jobs"]);
        assert_eq!(run(&["???_list_*"]), vec!["ats_list_jobs", "crm_list_contacts"]);
    }

    #[test]
    fn test_match_is_anchored() {
        assert!(run(&["list"]).is_empty());
        assert_eq!(run(&["*list*"]).len(), 4);
    }

    #[test]
    fn test_match_is_case_sensitive() {
        assert!(run(&["HRIS_*"]).is_empty());
    }

    #[test]
    fn test_only_excludes_start_from_everything() {
        let result = run(&["!hris_*"]);
        assert_eq!(result, vec!["ats_list_jobs", "crm_list_contacts"]);
    }

    #[test]
    fn test_exclusion_wins_regardless_of_order() {
        let forward = run(&["hris_*", "!hris_delete_*"]);
        let reversed = run(&["!hris_delete_*", "hris_*"]);
        assert_eq!(forward, reversed);
        assert_eq!(forward, vec!["hris_get_employee", "hris_list_employees"]);
    }

    #[test]
    fn test_exact_exclude_beats_broad_include() {
        let result = run(&["hris_*", "!hris_delete_list"]);
        assert!(!result.contains(&"hris_delete_list".to_string()));
        assert!(result.contains(&"hris_delete_employee".to_string()));
    }

    #[test]
    fn test_includes_union() {
        let result = run(&["ats_*", "crm_*"]);
        assert_eq!(result, vec!["ats_list_jobs", "crm_list_contacts"]);
    }

    #[test]
    fn test_zero_match_is_not_error() {
        assert!(run(&["zendesk_*"]).is_empty());
    }

    #[test]
    fn test_idempotent() {
        let patterns = ["*_list_*", "!crm_*"];
        let once = select(NAMES.iter().copied(), &patterns).unwrap();
        let twice = select(once.iter().map(String::as_str), &patterns).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let names = ["bamboohr_1.0.0_list_global", "bamboohr_1x0x0_list_global"];
        let result = select(names.iter().copied(), &["bamboohr_1.0.0_*"]).unwrap();
        assert_eq!(result.len(), 1);
        assert!(result.contains("bamboohr_1.0.0_list_global"));
    }

    #[test]
    fn test_filter_catalog_keeps_order_and_shares_descriptors() {
        use crate::catalog::{ActionDescriptor, ExecuteTemplate, HttpMethod};
        use std::sync::Arc;

        let catalog = Catalog::new(
            NAMES
                .iter()
                .map(|name| {
                    ActionDescriptor::new(
                        *name,
                        ExecuteTemplate::new(HttpMethod::Get, "https://api.example.com"),
                    )
                })
                .collect(),
        )
        .unwrap();

        let narrowed = filter(&catalog, &["hris_*", "!hris_delete_*"]).unwrap();
        let names: Vec<&str> = narrowed.names().collect();
        assert_eq!(names, vec!["hris_list_employees", "hris_get_employee"]);
        assert!(Arc::ptr_eq(
            narrowed.get("hris_get_employee").unwrap(),
            catalog.get("hris_get_employee").unwrap()
        ));

        assert_eq!(filter::<&str>(&catalog, &[]).unwrap().len(), NAMES.len());
        assert!(filter(&catalog, &["zendesk_*"]).unwrap().is_empty());
    }
}
