use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Name → sorted set of terms or file paths.
pub type TermMap = BTreeMap<String, BTreeSet<String>>;

/// Pattern hits for a single Swift file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FileAnalysis {
    pub path: String,
    pub imports: BTreeSet<String>,
    /// Category (e.g. `ui_state`, `rcp_entity_creation`) → matched terms.
    pub matches: TermMap,
}

impl FileAnalysis {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn add_match(&mut self, category: &str, term: impl Into<String>) {
        self.matches
            .entry(category.to_string())
            .or_default()
            .insert(term.into());
    }

    pub fn term_count(&self) -> usize {
        self.matches.values().map(BTreeSet::len).sum()
    }

    pub fn terms(&self) -> impl Iterator<Item = (&str, &str)> {
        self.matches
            .iter()
            .flat_map(|(category, terms)| terms.iter().map(move |t| (category.as_str(), t.as_str())))
    }
}

/// Aggregate output of a component analysis run over a samples directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ComponentReport {
    pub components: TermMap,
    pub imports: TermMap,
    /// Relationship name → files in which it was observed.
    pub relationships: TermMap,
}

impl ComponentReport {
    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.imports.is_empty() && self.relationships.is_empty()
    }
}

/// Files in which a pattern type was detected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PatternCensus {
    pub count: usize,
    pub files: Vec<String>,
    /// Representative matching source lines.
    #[serde(default)]
    pub examples: Vec<String>,
}

/// Pattern type → census.
pub type Census = BTreeMap<String, PatternCensus>;
