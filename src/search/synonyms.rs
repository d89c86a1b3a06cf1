//! Query-side expansion with near-synonyms.
//!
//! Agents describe intent in everyday words ("fire someone") while action
//! catalogs use API vocabulary ("terminate employee"). Each query token is
//! expanded with the other members of its group at a reduced weight, so an
//! exact match still outranks a synonym match.

use std::collections::HashMap;

/// Weight of an expanded term relative to a literal query term.
pub const SYNONYM_WEIGHT: f64 = 0.5;

const GROUPS: &[&[&str]] = &[
    &["terminate", "fire", "dismiss", "offboard", "termination"],
    &["hire", "onboard", "recruit"],
    &["create", "add", "new", "insert", "make"],
    &["get", "fetch", "retrieve", "lookup", "view", "read"],
    &["list", "all", "browse", "enumerate"],
    &["update", "edit", "modify", "change", "patch"],
    &["delete", "remove", "erase", "destroy"],
    &["search", "find", "query", "filter"],
    &["send", "post", "message", "notify"],
    &["download", "grab", "export"],
    &["upload", "attach", "import"],
    &["employee", "employees", "someone", "staff", "worker", "workers", "person", "people"],
    &["candidate", "candidates", "applicant", "applicants"],
    &["job", "jobs", "position", "positions", "opening", "vacancy"],
    &["file", "files", "document", "documents", "spreadsheet"],
    &["timeoff", "pto", "vacation", "leave", "absence", "holiday"],
    &["contact", "contacts", "lead", "leads", "customer", "customers"],
    &["meeting", "meetings", "event", "events", "appointment"],
];

/// Lookup table from a term to the other members of its groups.
#[derive(Debug, Clone, Default)]
pub struct Synonyms {
    table: HashMap<String, Vec<String>>,
}

impl Synonyms {
    /// The built-in table.
    pub fn builtin() -> Self {
        Self::from_groups(GROUPS.iter().map(|g| g.iter().copied()))
    }

    /// An empty table (no expansion).
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_groups<G, I, S>(groups: G) -> Self
    where
        G: IntoIterator<Item = I>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table: HashMap<String, Vec<String>> = HashMap::new();
        for group in groups {
            let members: Vec<String> = group.into_iter().map(Into::into).collect();
            for member in &members {
                let entry = table.entry(member.clone()).or_default();
                for other in &members {
                    if other != member && !entry.contains(other) {
                        entry.push(other.clone());
                    }
                }
            }
        }
        Self { table }
    }

    pub fn expand(&self, term: &str) -> &[String] {
        self.table.get(term).map(Vec::as_slice).unwrap_or(&[])
    }
}
