//! Snapshot of the tools a connected agent advertises, and keyword-based
//! capability resolution against it.
//!
//! Resolution is substring containment: the first advertised tool (in
//! discovery order) whose name contains any of the capability's keywords
//! wins. No match is a normal outcome and yields `None`.

use crate::tooling::types::ToolDescriptor;
use std::collections::{HashMap, HashSet};

/// An abstract capability and the keywords that identify tools implementing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

impl Capability {
    pub const COMMITS: Capability = Capability {
        name: "commits",
        keywords: &["list_commits", "get_commits", "recent_commits"],
    };

    pub const LOGS: Capability = Capability {
        name: "logs",
        keywords: &["fetch_logs", "get_logs", "search_logs", "query_logs"],
    };

    pub const TICKETS: Capability = Capability {
        name: "tickets",
        keywords: &["search_issues", "find_issues", "jira_search"],
    };

    pub const ROLLBACK: Capability = Capability {
        name: "rollback",
        keywords: &["rollback", "revert_deployment"],
    };

    pub const SCALE: Capability = Capability {
        name: "scale",
        keywords: &["scale", "resize_deployment"],
    };

    /// Every capability resolved eagerly when a registry is built.
    pub const ALL: [Capability; 5] = [
        Capability::COMMITS,
        Capability::LOGS,
        Capability::TICKETS,
        Capability::ROLLBACK,
        Capability::SCALE,
    ];
}

/// Return the first name (in iteration order) containing any keyword.
pub fn resolve_tool<'a, I>(names: I, keywords: &[&str]) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .find(|name| keywords.iter().any(|keyword| name.contains(keyword)))
}

/// Immutable per-session view of the advertised tools.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    tools: Vec<ToolDescriptor>,
    resolved: HashMap<&'static str, Option<String>>,
}

impl Registry {
    /// Build a registry from discovery output. Duplicate names keep their
    /// first occurrence.
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(tools.len());
        for tool in tools {
            if seen.insert(tool.name.clone()) {
                unique.push(tool);
            } else {
                tracing::warn!(tool = %tool.name, "Duplicate tool name advertised, keeping first");
            }
        }

        let resolved = Capability::ALL
            .iter()
            .map(|capability| {
                let name = resolve_tool(unique.iter().map(|t| t.name.as_str()), capability.keywords)
                    .map(str::to_string);
                (capability.name, name)
            })
            .collect();

        Self {
            tools: unique,
            resolved,
        }
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Resolve an ad-hoc keyword list against this snapshot.
    pub fn resolve(&self, keywords: &[&str]) -> Option<&str> {
        resolve_tool(self.names(), keywords)
    }

    /// Resolve a known capability, using the table computed at construction.
    pub fn lookup(&self, capability: &Capability) -> Option<&str> {
        match self.resolved.get(capability.name) {
            Some(name) => name.as_deref(),
            None => self.resolve(capability.keywords),
        }
    }

    /// Capability name to resolved tool, for logging and diagnostics.
    pub fn capability_table(&self) -> Vec<(&'static str, Option<&str>)> {
        Capability::ALL
            .iter()
            .map(|capability| (capability.name, self.lookup(capability)))
            .collect()
    }
}
